//! The stack evaluator.
//!
//! A [`StackEvaluator`] runs a [`Program`] over every row of an input table.
//! For each row it computes the result of every instruction in order, storing it
//! in a memo slot indexed by instruction position, so an instruction referenced
//! many times is computed once per row.
//!
//! Derivatives are computed in forward mode, in the same traversal as the
//! values: next to each memo slot the evaluator keeps a tangent vector holding
//! the derivative of that instruction's result with respect to every input
//! column (or every constant). Loads seed unit vectors, and every other
//! instruction combines its operands' tangents with the local partials from the
//! operator table:
//!
//! ```text
//! t_i = (∂r/∂a) t_a + (∂r/∂b) t_b
//! ```
//!
//! Rows are independent. Large tables are split into chunks evaluated on the
//! rayon thread pool; each chunk owns its memo buffers, outputs are written in
//! row order, and the error reported is always the one from the lowest failing
//! row.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::backends::matrix::InputTable;
use crate::backends::vector::Vector;
use crate::config::{DomainPolicy, EvaluatorConfig};
use crate::errors::EvalError;
use crate::operators::{DomainResult, Rule};
use crate::program::Program;
use crate::types::{DerivativeTable, DerivativeTarget};

/// Evaluates programs over input tables.
///
/// # Example
///
/// ```
/// use agraph_eval::prelude::*;
///
/// // x0 * c0 + x1
/// let program = Program::from_raw(vec![
///     (0, vec![0]),
///     (1, vec![0]),
///     (4, vec![0, 1]),
///     (0, vec![1]),
///     (2, vec![2, 3]),
/// ])
/// .unwrap();
/// let table = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
///
/// let evaluator = StackEvaluator::default();
/// let (values, derivatives) = evaluator
///     .evaluate_with_derivative(&program, &table, &[10.0])
///     .unwrap();
/// assert_eq!(values, vec![12.0, 34.0]);
/// assert_eq!(derivatives.row(0), &[10.0, 1.0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StackEvaluator {
    config: EvaluatorConfig,
}

impl StackEvaluator {
    /// Creates an evaluator with the given configuration.
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration of this evaluator.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluates `program` for every row of `table`.
    ///
    /// # Arguments
    /// * `program` - The program to run; its last instruction is the output
    /// * `table` - Input table, one row per sample
    /// * `constants` - Values loaded by constant instructions
    ///
    /// # Returns
    /// The output column, one value per row
    ///
    /// # Errors
    /// - `EvalError::Table` if the table is not rectangular
    /// - `EvalError::InvalidOperand` if an instruction loads a missing column or constant
    /// - `EvalError::ArithmeticDomain` for an undefined operation under [`DomainPolicy::Error`]
    pub fn evaluate<T, K>(
        &self,
        program: &Program,
        table: &T,
        constants: &K,
    ) -> Result<Vec<f64>, EvalError>
    where
        T: InputTable + Sync + ?Sized,
        K: Vector + ?Sized,
    {
        let constants = constants.values();
        let program = self.prepare(program, table, &constants)?;
        let rows = RowEvaluator::new(&program, table, &constants, self.config.domain_policy);

        let mut output = vec![0.0; table.n_rows()];
        self.run_chunks(&mut output, |start, out| {
            let mut values = vec![0.0; rows.program.len()];
            for (offset, slot) in out.iter_mut().enumerate() {
                *slot = rows.forward(start + offset, &mut values)?;
            }
            Ok(Vec::new())
        })?;
        Ok(output)
    }

    /// Evaluates `program` and its derivative with respect to every input column.
    ///
    /// # Returns
    /// A tuple containing:
    /// - The output column, identical to [`evaluate`](Self::evaluate)
    /// - An R × C table of partial derivatives of the output
    ///
    /// # Errors
    /// The errors of [`evaluate`](Self::evaluate), plus
    /// `EvalError::NonDifferentiableOperation` for an operator without a
    /// derivative rule.
    pub fn evaluate_with_derivative<T, K>(
        &self,
        program: &Program,
        table: &T,
        constants: &K,
    ) -> Result<(Vec<f64>, DerivativeTable), EvalError>
    where
        T: InputTable + Sync + ?Sized,
        K: Vector + ?Sized,
    {
        self.evaluate_with_derivative_target(program, table, constants, DerivativeTarget::Columns)
    }

    /// Evaluates `program` and its derivative with respect to every constant.
    ///
    /// # Returns
    /// The output column and an R × K table of partial derivatives
    pub fn evaluate_with_constant_derivative<T, K>(
        &self,
        program: &Program,
        table: &T,
        constants: &K,
    ) -> Result<(Vec<f64>, DerivativeTable), EvalError>
    where
        T: InputTable + Sync + ?Sized,
        K: Vector + ?Sized,
    {
        self.evaluate_with_derivative_target(program, table, constants, DerivativeTarget::Constants)
    }

    /// Evaluates `program` with derivatives with respect to `target`.
    pub fn evaluate_with_derivative_target<T, K>(
        &self,
        program: &Program,
        table: &T,
        constants: &K,
        target: DerivativeTarget,
    ) -> Result<(Vec<f64>, DerivativeTable), EvalError>
    where
        T: InputTable + Sync + ?Sized,
        K: Vector + ?Sized,
    {
        let constants = constants.values();
        let program = self.prepare(program, table, &constants)?;
        let rows = RowEvaluator::new(&program, table, &constants, self.config.domain_policy);
        let dim = match target {
            DerivativeTarget::Columns => table.n_cols(),
            DerivativeTarget::Constants => constants.len(),
        };

        let mut output = vec![0.0; table.n_rows()];
        let derivatives = self.run_chunks(&mut output, |start, out| {
            let mut values = vec![0.0; rows.program.len()];
            let mut tangents = vec![0.0; rows.program.len() * dim];
            let mut block = Vec::with_capacity(out.len() * dim);
            for (offset, slot) in out.iter_mut().enumerate() {
                *slot = rows.forward_with_tangents(
                    start + offset,
                    target,
                    dim,
                    &mut values,
                    &mut tangents,
                )?;
                let root = rows.program.output();
                block.extend_from_slice(&tangents[root * dim..(root + 1) * dim]);
            }
            Ok(block)
        })?;

        let n_rows = output.len();
        Ok((
            output,
            DerivativeTable::from_row_major(n_rows, dim, derivatives),
        ))
    }

    /// Validates the inputs and returns the program to run.
    fn prepare<'p, T>(
        &self,
        program: &'p Program,
        table: &T,
        constants: &[f64],
    ) -> Result<Cow<'p, Program>, EvalError>
    where
        T: InputTable + ?Sized,
    {
        table.validate()?;
        program.check_operands(table.n_cols(), constants.len())?;
        debug!(
            rows = table.n_rows(),
            columns = table.n_cols(),
            constants = constants.len(),
            instructions = program.len(),
            "evaluating program"
        );
        if self.config.optimize {
            Ok(Cow::Owned(program.optimized()))
        } else {
            Ok(Cow::Borrowed(program))
        }
    }

    fn chunk_size(&self, n_rows: usize) -> usize {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        (n_rows / (num_threads * 4))
            .max(self.config.min_rows_per_chunk)
            .max(1)
    }

    /// Runs `kernel(first_row, output_chunk)` over the output in chunks and
    /// concatenates the blocks the kernel returns, in row order.
    fn run_chunks<F>(&self, output: &mut [f64], kernel: F) -> Result<Vec<f64>, EvalError>
    where
        F: Fn(usize, &mut [f64]) -> Result<Vec<f64>, EvalError> + Sync,
    {
        let n_rows = output.len();
        let chunk_size = self.chunk_size(n_rows);
        let run_chunk = |(index, out): (usize, &mut [f64])| {
            let start = index * chunk_size;
            trace!(start, rows = out.len(), "evaluating chunk");
            kernel(start, out)
        };

        let blocks: Vec<Result<Vec<f64>, EvalError>> =
            if self.config.parallel && n_rows > chunk_size {
                debug!(n_rows, chunk_size, "splitting rows across threads");
                output
                    .par_chunks_mut(chunk_size)
                    .enumerate()
                    .map(run_chunk)
                    .collect()
            } else {
                output
                    .chunks_mut(chunk_size)
                    .enumerate()
                    .map(run_chunk)
                    .collect()
            };

        let mut result = Vec::new();
        for block in blocks {
            result.extend(block?);
        }
        Ok(result)
    }
}

/// Per-call state shared by every row.
struct RowEvaluator<'a, T: ?Sized> {
    program: &'a Program,
    table: &'a T,
    constants: &'a [f64],
    policy: DomainPolicy,
    propagated: AtomicBool,
}

impl<'a, T: InputTable + ?Sized> RowEvaluator<'a, T> {
    fn new(program: &'a Program, table: &'a T, constants: &'a [f64], policy: DomainPolicy) -> Self {
        Self {
            program,
            table,
            constants,
            policy,
            propagated: AtomicBool::new(false),
        }
    }

    /// Computes every instruction of one row; returns the output value.
    fn forward(&self, row: usize, values: &mut [f64]) -> Result<f64, EvalError> {
        for (position, instruction) in self.program.iter().enumerate() {
            let (a, b) = (instruction.lhs(), instruction.rhs());
            values[position] = match instruction.operator().definition().rule {
                Rule::LoadColumn => self.table.value(row, a),
                Rule::LoadConstant => self.constants[a],
                Rule::Unary { forward, .. } => self
                    .resolve(forward(values[a]), position, row)?
                    .unwrap_or(f64::NAN),
                Rule::Binary { forward, .. } => self
                    .resolve(forward(values[a], values[b]), position, row)?
                    .unwrap_or(f64::NAN),
            };
        }
        Ok(values[self.program.output()])
    }

    /// Computes every instruction of one row together with its tangent vector.
    ///
    /// `tangents` holds `dim` entries per instruction.
    fn forward_with_tangents(
        &self,
        row: usize,
        target: DerivativeTarget,
        dim: usize,
        values: &mut [f64],
        tangents: &mut [f64],
    ) -> Result<f64, EvalError> {
        for (position, instruction) in self.program.iter().enumerate() {
            let (a, b) = (instruction.lhs(), instruction.rhs());
            let (done, rest) = tangents.split_at_mut(position * dim);
            let done: &[f64] = done;
            let tangent = &mut rest[..dim];
            let operand = move |p: usize| &done[p * dim..(p + 1) * dim];

            values[position] = match instruction.operator().definition().rule {
                Rule::LoadColumn => {
                    seed(tangent, a, target == DerivativeTarget::Columns);
                    self.table.value(row, a)
                }
                Rule::LoadConstant => {
                    seed(tangent, a, target == DerivativeTarget::Constants);
                    self.constants[a]
                }
                Rule::Unary { forward, partial } => {
                    let partial = partial.ok_or_else(|| self.non_differentiable(position))?;
                    match self.resolve(forward(values[a]), position, row)? {
                        Some(r) => {
                            let p = partial(values[a], r);
                            for (t, &ta) in tangent.iter_mut().zip(operand(a)) {
                                *t = chain(p, ta);
                            }
                            r
                        }
                        None => {
                            tangent.fill(f64::NAN);
                            f64::NAN
                        }
                    }
                }
                Rule::Binary { forward, partials } => {
                    let partials = partials.ok_or_else(|| self.non_differentiable(position))?;
                    match self.resolve(forward(values[a], values[b]), position, row)? {
                        Some(r) => {
                            let (pa, pb) = partials(values[a], values[b], r);
                            for ((t, &ta), &tb) in
                                tangent.iter_mut().zip(operand(a)).zip(operand(b))
                            {
                                *t = chain(pa, ta) + chain(pb, tb);
                            }
                            r
                        }
                        None => {
                            tangent.fill(f64::NAN);
                            f64::NAN
                        }
                    }
                }
            };
        }
        Ok(values[self.program.output()])
    }

    /// Applies the domain policy to a forward result.
    ///
    /// Returns `Ok(None)` when an undefined result is propagated as NaN.
    fn resolve(
        &self,
        result: DomainResult,
        position: usize,
        row: usize,
    ) -> Result<Option<f64>, EvalError> {
        let reason = match result {
            Ok(value) => return Ok(Some(value)),
            Err(reason) => reason,
        };
        let operator = self.program.instructions()[position].operator();
        let position = self.program.origin(position);
        match self.policy {
            DomainPolicy::Error => Err(EvalError::ArithmeticDomain {
                position,
                row,
                operator,
                reason,
            }),
            DomainPolicy::Propagate => {
                if !self.propagated.swap(true, Ordering::Relaxed) {
                    debug!(position, row, %operator, reason, "propagating NaN");
                }
                Ok(None)
            }
        }
    }

    fn non_differentiable(&self, position: usize) -> EvalError {
        EvalError::NonDifferentiableOperation {
            position: self.program.origin(position),
            operator: self.program.instructions()[position].operator(),
        }
    }
}

/// Writes the unit vector for `index` into `tangent`, or zeros when `active`
/// is false.
/// One chain-rule term `partial * tangent`.
///
/// A zero tangent component contributes exactly zero, so a NaN or infinite
/// partial at a kink stays on the components the operand depends on.
fn chain(partial: f64, tangent: f64) -> f64 {
    if tangent == 0.0 {
        0.0
    } else {
        partial * tangent
    }
}

fn seed(tangent: &mut [f64], index: usize, active: bool) {
    tangent.fill(0.0);
    if active {
        tangent[index] = 1.0;
    }
}

/// Evaluates `program` with the default evaluator.
///
/// # Example
///
/// ```
/// use agraph_eval::{evaluate, Program};
///
/// // x0 / c0
/// let program = Program::from_raw(vec![(0, vec![0]), (1, vec![0]), (5, vec![0, 1])]).unwrap();
/// let output = evaluate(&program, &[[1.0], [3.0]], &[2.0]).unwrap();
/// assert_eq!(output, vec![0.5, 1.5]);
/// ```
pub fn evaluate<T, K>(program: &Program, table: &T, constants: &K) -> Result<Vec<f64>, EvalError>
where
    T: InputTable + Sync + ?Sized,
    K: Vector + ?Sized,
{
    StackEvaluator::default().evaluate(program, table, constants)
}

/// Evaluates `program` and its derivative with respect to every input column
/// with the default evaluator.
pub fn evaluate_with_derivative<T, K>(
    program: &Program,
    table: &T,
    constants: &K,
) -> Result<(Vec<f64>, DerivativeTable), EvalError>
where
    T: InputTable + Sync + ?Sized,
    K: Vector + ?Sized,
{
    StackEvaluator::default().evaluate_with_derivative(program, table, constants)
}

/// Evaluates `program` and its derivative with respect to every constant with
/// the default evaluator.
pub fn evaluate_with_constant_derivative<T, K>(
    program: &Program,
    table: &T,
    constants: &K,
) -> Result<(Vec<f64>, DerivativeTable), EvalError>
where
    T: InputTable + Sync + ?Sized,
    K: Vector + ?Sized,
{
    StackEvaluator::default().evaluate_with_constant_derivative(program, table, constants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::matrix::DataTable;
    use crate::errors::TableError;
    use crate::fixtures::{example_constants, example_program, example_table};
    use crate::operators::Operator;
    use crate::program::Instruction;
    use approx::assert_relative_eq;

    fn sequential() -> StackEvaluator {
        StackEvaluator::new(EvaluatorConfig::default().with_parallel(false))
    }

    /// Exercises every operator away from its kinks and domain boundaries.
    fn all_operators_program() -> Program {
        Program::from_raw(vec![
            (0, vec![0]),      // 0: x0
            (0, vec![1]),      // 1: x1
            (1, vec![0]),      // 2: c0
            (6, vec![0]),      // 3: sin x0
            (4, vec![1, 2]),   // 4: x1 c0
            (8, vec![4]),      // 5: exp(x1 c0)
            (2, vec![3, 5]),   // 6
            (9, vec![6]),      // 7: log
            (10, vec![1, 2]),  // 8: x1 ^ c0
            (12, vec![0]),     // 9: sqrt|x0|
            (13, vec![3, 1]),  // 10: |sin x0| ^ x1
            (11, vec![8]),     // 11
            (14, vec![9]),     // 12
            (7, vec![1]),      // 13: cos x1
            (5, vec![7, 11]),  // 14
            (3, vec![14, 12]), // 15
            (4, vec![15, 13]), // 16
            (2, vec![16, 10]), // 17
        ])
        .unwrap()
    }

    fn smooth_table() -> Vec<Vec<f64>> {
        vec![
            vec![0.3, 0.8],
            vec![1.1, 1.5],
            vec![2.0, 2.2],
            vec![-0.7, 3.1],
        ]
    }

    #[test]
    fn test_example_values() {
        let output = evaluate(&example_program(), &example_table(), &example_constants()).unwrap();
        let expected = [4.64, 8.28, 11.42];
        assert_eq!(output.len(), 3);
        for (value, expected) in output.iter().zip(expected) {
            assert_relative_eq!(*value, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_example_derivatives() {
        let (output, derivatives) =
            evaluate_with_derivative(&example_program(), &example_table(), &example_constants())
                .unwrap();
        assert_eq!(derivatives.dims(), (3, 3));

        let expected_x0 = [4.64, 4.14, 10.0 / 6.0 + 2.14];
        let expected_x1 = [-0.625, -0.8, -30.0 / 36.0];
        for row in 0..3 {
            assert_relative_eq!(derivatives[(row, 0)], expected_x0[row], epsilon = 1e-12);
            assert_relative_eq!(derivatives[(row, 1)], expected_x1[row], epsilon = 1e-12);
            assert_eq!(derivatives[(row, 2)], 0.0);
        }
        assert_relative_eq!(derivatives[(2, 0)], 3.806667, epsilon = 1e-6);

        // derivative mode runs the same forward functions
        let plain = evaluate(&example_program(), &example_table(), &example_constants()).unwrap();
        assert_eq!(output, plain);
    }

    #[test]
    fn test_example_constant_derivatives() {
        let (_, derivatives) = evaluate_with_constant_derivative(
            &example_program(),
            &example_table(),
            &example_constants(),
        )
        .unwrap();
        assert_eq!(derivatives.dims(), (3, 2));
        // d/dc0 = x0, d/dc1 = x0 / x1
        assert_eq!(derivatives.column(0), vec![1.0, 2.0, 3.0]);
        let expected = [0.25, 0.4, 0.5];
        for (value, expected) in derivatives.column(1).iter().zip(expected) {
            assert_relative_eq!(*value, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_deterministic() {
        let program = all_operators_program();
        let first = evaluate(&program, &smooth_table(), &[0.5]).unwrap();
        let second = evaluate(&program, &smooth_table(), &[0.5]).unwrap();
        assert_eq!(first, second);
        assert!(first.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_finite_difference_columns() {
        let program = all_operators_program();
        let table = smooth_table();
        let constants = [0.5];
        let (output, derivatives) = evaluate_with_derivative(&program, &table, &constants).unwrap();
        assert_eq!(output, evaluate(&program, &table, &constants).unwrap());

        let eps = 1e-6;
        for row in 0..table.len() {
            for col in 0..2 {
                let mut plus = table.clone();
                let mut minus = table.clone();
                plus[row][col] += eps;
                minus[row][col] -= eps;
                let f_plus = evaluate(&program, &plus, &constants).unwrap()[row];
                let f_minus = evaluate(&program, &minus, &constants).unwrap()[row];
                let approx = (f_plus - f_minus) / (2.0 * eps);
                assert_relative_eq!(
                    derivatives[(row, col)],
                    approx,
                    epsilon = 1e-6,
                    max_relative = 1e-6
                );
            }
        }
    }

    #[test]
    fn test_finite_difference_constants() {
        let program = all_operators_program();
        let table = smooth_table();
        let (_, derivatives) =
            evaluate_with_constant_derivative(&program, &table, &[0.5]).unwrap();

        let eps = 1e-6;
        let f_plus = evaluate(&program, &table, &[0.5 + eps]).unwrap();
        let f_minus = evaluate(&program, &table, &[0.5 - eps]).unwrap();
        for row in 0..table.len() {
            let approx = (f_plus[row] - f_minus[row]) / (2.0 * eps);
            assert_relative_eq!(
                derivatives[(row, 0)],
                approx,
                epsilon = 1e-6,
                max_relative = 1e-6
            );
        }
    }

    #[test]
    fn test_duplicated_instructions_agree() {
        // (c1 / x1) - (c1 / x1), written out twice
        let program = Program::from_raw(vec![
            (0, vec![1]),
            (1, vec![1]),
            (5, vec![1, 0]),
            (5, vec![1, 0]),
            (3, vec![2, 3]),
        ])
        .unwrap();
        for optimize in [true, false] {
            let evaluator = StackEvaluator::new(EvaluatorConfig::default().with_optimize(optimize));
            let output = evaluator
                .evaluate(&program, &example_table(), &example_constants())
                .unwrap();
            assert_eq!(output, vec![0.0; 3]);
        }
    }

    #[test]
    fn test_optimize_is_bit_identical() {
        let program = example_program();
        let table = DataTable::from_fn(500, 3, |row, col| 1.0 + (row * 3 + col) as f64 * 0.01);
        let on = StackEvaluator::new(EvaluatorConfig::default().with_optimize(true));
        let off = StackEvaluator::new(EvaluatorConfig::default().with_optimize(false));
        let constants = example_constants();
        assert_eq!(
            on.evaluate_with_derivative(&program, &table, &constants).unwrap(),
            off.evaluate_with_derivative(&program, &table, &constants).unwrap()
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let program = all_operators_program();
        let table = DataTable::from_fn(5000, 2, |row, col| {
            0.1 + ((row * 7 + col * 13) % 97) as f64 * 0.03
        });
        let parallel = StackEvaluator::new(EvaluatorConfig::default().with_min_rows_per_chunk(64));
        assert_eq!(
            parallel.evaluate(&program, &table, &[0.5]).unwrap(),
            sequential().evaluate(&program, &table, &[0.5]).unwrap()
        );
        assert_eq!(
            parallel
                .evaluate_with_derivative(&program, &table, &[0.5])
                .unwrap(),
            sequential()
                .evaluate_with_derivative(&program, &table, &[0.5])
                .unwrap()
        );
    }

    #[test]
    fn test_lowest_failing_row_reported() {
        let program = Program::new(vec![
            Instruction::variable(0),
            Instruction::variable(1),
            Instruction::binary(Operator::Divide, 0, 1),
        ])
        .unwrap();
        let table = DataTable::from_fn(4000, 2, |row, col| match (row, col) {
            (1000 | 3000, 1) => 0.0,
            _ => 1.0,
        });
        let parallel = StackEvaluator::new(EvaluatorConfig::default().with_min_rows_per_chunk(16));
        for evaluator in [parallel, sequential()] {
            let err = evaluator.evaluate(&program, &table, &[0.0; 0]).unwrap_err();
            assert_eq!(
                err,
                EvalError::ArithmeticDomain {
                    position: 2,
                    row: 1000,
                    operator: Operator::Divide,
                    reason: "division by zero",
                }
            );
        }
    }

    #[test]
    fn test_domain_error() {
        let program = example_program();
        let table = vec![vec![1.0, 4.0, 0.0], vec![2.0, 0.0, 0.0]];
        let err = evaluate(&program, &table, &example_constants()).unwrap_err();
        assert_eq!(
            err,
            EvalError::ArithmeticDomain {
                position: 4,
                row: 1,
                operator: Operator::Divide,
                reason: "division by zero",
            }
        );
        // same failure in derivative mode
        assert_eq!(
            evaluate_with_derivative(&program, &table, &example_constants()).unwrap_err(),
            err
        );
    }

    #[test]
    fn test_domain_propagate() {
        let program = example_program();
        let table = vec![vec![1.0, 4.0, 0.0], vec![2.0, 0.0, 0.0]];
        let evaluator = StackEvaluator::new(
            EvaluatorConfig::default().with_domain_policy(DomainPolicy::Propagate),
        );
        let (output, derivatives) = evaluator
            .evaluate_with_derivative(&program, &table, &example_constants())
            .unwrap();
        assert_relative_eq!(output[0], 4.64, epsilon = 1e-12);
        assert!(output[1].is_nan());
        assert!(derivatives.row(0).iter().all(|d| d.is_finite()));
        assert!(derivatives.row(1).iter().all(|d| d.is_nan()));
    }

    #[test]
    fn test_error_reports_original_position() {
        // the optimiser merges 2 into 0 and drops 3
        let program = Program::new(vec![
            Instruction::variable(0),
            Instruction::variable(1),
            Instruction::variable(0),
            Instruction::unary(Operator::Exp, 0),
            Instruction::binary(Operator::Divide, 2, 1),
        ])
        .unwrap();
        let err = evaluate(&program, &[[1.0, 0.0]], &[0.0; 0]).unwrap_err();
        assert_eq!(err.position(), Some(4));
    }

    #[test]
    fn test_unused_instruction_domain_error() {
        let program = Program::new(vec![
            Instruction::variable(0),
            Instruction::unary(Operator::Log, 0),
            Instruction::unary(Operator::Exp, 0),
        ])
        .unwrap();
        let table = [[0.0]];
        let optimized = evaluate(&program, &table, &[0.0; 0]).unwrap();
        assert_eq!(optimized, vec![1.0]);

        let evaluator = StackEvaluator::new(EvaluatorConfig::default().with_optimize(false));
        let err = evaluator.evaluate(&program, &table, &[0.0; 0]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::ArithmeticDomain {
                position: 1,
                operator: Operator::Log,
                ..
            }
        ));
    }

    #[test]
    fn test_operand_out_of_range() {
        let program = example_program();
        let err = evaluate(&program, &[[1.0]], &example_constants()).unwrap_err();
        assert!(matches!(
            err,
            EvalError::InvalidOperand {
                position: 1,
                operand: 1,
                ..
            }
        ));

        let err = evaluate(&program, &example_table(), &[3.14]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::InvalidOperand {
                position: 3,
                operand: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_ragged_table() {
        let table = vec![vec![1.0, 2.0], vec![3.0]];
        let err = evaluate(&example_program(), &table, &example_constants()).unwrap_err();
        assert_eq!(
            err,
            EvalError::Table(TableError::Ragged {
                row: 1,
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_empty_table() {
        let table: Vec<[f64; 3]> = Vec::new();
        let (output, derivatives) =
            evaluate_with_derivative(&example_program(), &table, &example_constants()).unwrap();
        assert!(output.is_empty());
        assert_eq!(derivatives.dims(), (0, 3));
    }

    #[test]
    fn test_constants_only_program() {
        let program = Program::from_raw(vec![(1, vec![0]), (14, vec![0])]).unwrap();
        let (output, derivatives) =
            evaluate_with_derivative(&program, &example_table(), &[2.0]).unwrap();
        assert_eq!(output, vec![-2.0; 3]);
        assert!(derivatives.as_slice().iter().all(|&d| d == 0.0));

        let (_, derivatives) =
            evaluate_with_constant_derivative(&program, &example_table(), &[2.0]).unwrap();
        assert_eq!(derivatives.column(0), vec![-1.0; 3]);
    }

    #[test]
    fn test_kinks_are_not_errors() {
        // |x0| + sqrt|x0| + x1 at x0 = 0
        let program = Program::from_raw(vec![
            (0, vec![0]),
            (11, vec![0]),
            (12, vec![0]),
            (2, vec![1, 2]),
            (0, vec![1]),
            (2, vec![3, 4]),
        ])
        .unwrap();
        let (output, derivatives) =
            evaluate_with_derivative(&program, &[[0.0, 2.0]], &[0.0; 0]).unwrap();
        assert_eq!(output, vec![2.0]);
        assert!(derivatives[(0, 0)].is_nan());
        assert_eq!(derivatives[(0, 1)], 1.0);
    }

    #[test]
    fn test_kink_stays_on_its_column() {
        // sqrt|x0| + x1
        let program =
            Program::from_raw(vec![(0, vec![0]), (0, vec![1]), (12, vec![0]), (2, vec![2, 1])])
                .unwrap();
        let table = [[0.0, 2.0]];
        let (_, derivatives) = evaluate_with_derivative(&program, &table, &[0.0; 0]).unwrap();
        assert!(derivatives[(0, 0)].is_nan());
        assert_eq!(derivatives[(0, 1)], 1.0);

        let eps = 1e-6;
        let f_plus = evaluate(&program, &[[0.0, 2.0 + eps]], &[0.0; 0]).unwrap()[0];
        let f_minus = evaluate(&program, &[[0.0, 2.0 - eps]], &[0.0; 0]).unwrap()[0];
        assert_relative_eq!(
            derivatives[(0, 1)],
            (f_plus - f_minus) / (2.0 * eps),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_kink_stays_off_constants() {
        // sqrt|x0| + c0
        let program =
            Program::from_raw(vec![(0, vec![0]), (12, vec![0]), (1, vec![0]), (2, vec![1, 2])])
                .unwrap();
        let (_, derivatives) =
            evaluate_with_constant_derivative(&program, &[[0.0], [4.0]], &[3.0]).unwrap();
        assert_eq!(derivatives.column(0), vec![1.0, 1.0]);

        let (_, derivatives) = evaluate_with_derivative(&program, &[[0.0], [4.0]], &[3.0]).unwrap();
        assert!(derivatives[(0, 0)].is_nan());
        assert_relative_eq!(derivatives[(1, 0)], 0.25);
    }

    #[test]
    fn test_power_at_zero_base() {
        // x0^c0 + x1 with c0 = 0.5
        let program = Program::from_raw(vec![
            (0, vec![0]),
            (1, vec![0]),
            (10, vec![0, 1]),
            (0, vec![1]),
            (2, vec![2, 3]),
        ])
        .unwrap();
        let table = [[0.0, 2.0]];
        let constants = [0.5];

        let (output, derivatives) = evaluate_with_derivative(&program, &table, &constants).unwrap();
        assert_eq!(output, vec![2.0]);
        assert_eq!(derivatives[(0, 0)], f64::INFINITY);
        assert_eq!(derivatives[(0, 1)], 1.0);

        let (_, derivatives) =
            evaluate_with_constant_derivative(&program, &table, &constants).unwrap();
        assert_eq!(derivatives[(0, 0)], 0.0);
    }
}
