//! Shared test inputs: the three-row smoke scenario.

use crate::demo::{SMOKE_COMMANDS, SMOKE_CONSTANTS, SMOKE_TABLE};
use crate::program::Program;

pub(crate) fn example_program() -> Program {
    Program::from_command_array(&SMOKE_COMMANDS).unwrap()
}

pub(crate) fn example_table() -> Vec<Vec<f64>> {
    SMOKE_TABLE.iter().map(|row| row.to_vec()).collect()
}

pub(crate) fn example_constants() -> Vec<f64> {
    SMOKE_CONSTANTS.to_vec()
}
