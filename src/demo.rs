//! Ready-made inputs for the command-line tool, the benchmarks and the tests.

/// `((c1 / x1) + c0) * x0 - x0` as command rows, with duplicated sub-expressions.
///
/// Load with [`Program::from_command_array`](crate::Program::from_command_array).
pub const SMOKE_COMMANDS: [[i64; 3]; 12] = [
    [0, 0, 0],
    [0, 1, 0],
    [1, 0, 0],
    [1, 1, 0],
    [5, 3, 1],
    [5, 3, 1],
    [2, 4, 2],
    [2, 4, 2],
    [4, 6, 0],
    [4, 5, 6],
    [3, 7, 6],
    [3, 8, 0],
];

/// Three rows of three columns; the program reads only the first two.
pub const SMOKE_TABLE: [[f64; 3]; 3] = [[1.0, 4.0, 7.0], [2.0, 5.0, 8.0], [3.0, 6.0, 9.0]];

pub const SMOKE_CONSTANTS: [f64; 2] = [3.14, 10.0];
