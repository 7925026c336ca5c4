//! Programs: flat arenas of instructions forming an acyclic graph.
//!
//! A program is an ordered sequence of [`Instruction`]s. Terminal instructions
//! load a column of the input table or an entry of the constants vector; every
//! other instruction refers to the results of earlier instructions by position.
//! The result of the last instruction is the program's output.
//!
//! Integer positions are the only reference mechanism. Because every
//! non-terminal operand must point strictly backward, which is enforced when the
//! program is built, a program can never contain a cycle.
//!
//! # Example
//!
//! ```
//! use agraph_eval::prelude::*;
//!
//! // (x0 + c0) * x0
//! let program = Program::new(vec![
//!     Instruction::variable(0),
//!     Instruction::constant(0),
//!     Instruction::binary(Operator::Add, 0, 1),
//!     Instruction::binary(Operator::Multiply, 2, 0),
//! ])
//! .unwrap();
//! assert_eq!(program.len(), 4);
//! assert_eq!(program.complexity(), 4);
//! ```

use std::fmt;

use itertools::Itertools;

use crate::errors::EvalError;
use crate::format::{render, Format};
use crate::operators::{Arity, Operator};

/// A single operation code together with its operand indices.
///
/// Terminal instructions carry a column or constant index; unary and binary
/// instructions carry positions of earlier instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    operator: Operator,
    operands: [usize; 2],
    len: u8,
}

impl Instruction {
    /// Loads column `column` of the input table.
    pub fn variable(column: usize) -> Self {
        Self::from_parts(Operator::Variable, &[column])
    }

    /// Loads entry `index` of the constants vector.
    pub fn constant(index: usize) -> Self {
        Self::from_parts(Operator::Constant, &[index])
    }

    /// Applies a unary operator to the result at position `operand`.
    pub fn unary(operator: Operator, operand: usize) -> Self {
        Self::from_parts(operator, &[operand])
    }

    /// Applies a binary operator to the results at positions `lhs` and `rhs`.
    pub fn binary(operator: Operator, lhs: usize, rhs: usize) -> Self {
        Self::from_parts(operator, &[lhs, rhs])
    }

    /// Builds an instruction from at most two operands. The unused slot mirrors
    /// the first one.
    fn from_parts(operator: Operator, operands: &[usize]) -> Self {
        debug_assert!(!operands.is_empty() && operands.len() <= 2);
        let first = operands[0];
        let second = operands.get(1).copied().unwrap_or(first);
        Self {
            operator,
            operands: [first, second],
            len: operands.len() as u8,
        }
    }

    /// Returns the operator of this instruction.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the operands of this instruction.
    pub fn operands(&self) -> &[usize] {
        &self.operands[..self.len as usize]
    }

    /// Returns the first operand.
    pub fn lhs(&self) -> usize {
        self.operands[0]
    }

    /// Returns the second operand, or the first one for single-operand instructions.
    pub fn rhs(&self) -> usize {
        self.operands[1]
    }

    /// Returns true if this instruction loads from the table or the constants.
    pub fn is_terminal(&self) -> bool {
        self.operator.is_terminal()
    }

    /// Returns a copy of this instruction with its instruction references rewritten.
    pub(crate) fn remap(&self, map: impl Fn(usize) -> usize) -> Self {
        if self.is_terminal() {
            return *self;
        }
        let mapped: Vec<usize> = self.operands().iter().map(|&p| map(p)).collect();
        Self::from_parts(self.operator, &mapped)
    }
}

/// An immutable, validated sequence of instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    instructions: Vec<Instruction>,
    /// Position each instruction had in the program the caller built
    origins: Vec<usize>,
}

impl Program {
    /// Builds a program from typed instructions.
    ///
    /// # Errors
    /// - `EvalError::EmptyProgram` if `instructions` is empty
    /// - `EvalError::InvalidOperand` if an instruction has the wrong number of
    ///   operands or refers to itself or a later instruction
    pub fn new(instructions: Vec<Instruction>) -> Result<Self, EvalError> {
        let origins = (0..instructions.len()).collect();
        Self::with_origins(instructions, origins)
    }

    /// Builds a program from `(operation code, operands)` pairs.
    ///
    /// # Example
    /// ```
    /// use agraph_eval::Program;
    ///
    /// let program = Program::from_raw(vec![
    ///     (0, vec![0]),    // x0
    ///     (1, vec![0]),    // c0
    ///     (4, vec![0, 1]), // x0 * c0
    /// ])
    /// .unwrap();
    /// assert_eq!(program.len(), 3);
    ///
    /// assert!(Program::from_raw(vec![(0, vec![0]), (2, vec![0, 2])]).is_err());
    /// ```
    ///
    /// # Errors
    /// - `EvalError::UnknownOperation` for a code outside the operator enumeration
    /// - the errors of [`Program::new`]
    pub fn from_raw<I, O>(raw: I) -> Result<Self, EvalError>
    where
        I: IntoIterator<Item = (i32, O)>,
        O: AsRef<[usize]>,
    {
        let instructions = raw
            .into_iter()
            .enumerate()
            .map(|(position, (code, operands))| {
                let operator = Operator::from_code(code)
                    .ok_or(EvalError::UnknownOperation {
                        position,
                        code: code.into(),
                    })?;
                let operands = operands.as_ref();
                check_operand_count(position, operator, operands.len())?;
                Ok(Instruction::from_parts(operator, operands))
            })
            .collect::<Result<Vec<_>, EvalError>>()?;
        Self::new(instructions)
    }

    /// Builds a program from three-column command rows `[code, param1, param2]`.
    ///
    /// The second parameter is ignored for terminal and unary operators.
    ///
    /// # Errors
    /// - `EvalError::InvalidOperand` for a negative parameter
    /// - the errors of [`Program::from_raw`]
    pub fn from_command_array(rows: &[[i64; 3]]) -> Result<Self, EvalError> {
        let raw = rows
            .iter()
            .enumerate()
            .map(|(position, row)| {
                let code = i32::try_from(row[0]).map_err(|_| EvalError::UnknownOperation {
                    position,
                    code: row[0],
                })?;
                let count = Operator::from_code(code)
                    .map(|op| op.arity().operand_count())
                    .unwrap_or(0);
                let operands = row[1..=count]
                    .iter()
                    .enumerate()
                    .map(|(slot, &param)| {
                        usize::try_from(param).map_err(|_| {
                            EvalError::invalid_operand(
                                position,
                                slot,
                                0,
                                format!("negative parameter {param}"),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((code, operands))
            })
            .collect::<Result<Vec<_>, EvalError>>()?;
        Self::from_raw(raw)
    }

    /// Builds a program whose instructions stem from the given original positions.
    pub(crate) fn with_origins(
        instructions: Vec<Instruction>,
        origins: Vec<usize>,
    ) -> Result<Self, EvalError> {
        if instructions.is_empty() {
            return Err(EvalError::EmptyProgram);
        }
        debug_assert_eq!(instructions.len(), origins.len());
        for (position, instruction) in instructions.iter().enumerate() {
            validate_instruction(position, instruction)?;
        }
        Ok(Self {
            instructions,
            origins,
        })
    }

    /// Returns the number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Always false: a program holds at least one instruction.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the instructions in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns an iterator over the instructions.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Returns the position of the output instruction.
    pub fn output(&self) -> usize {
        self.instructions.len() - 1
    }

    /// Returns the position `position` had in the program the caller built.
    pub fn origin(&self, position: usize) -> usize {
        self.origins[position]
    }

    /// Marks the instructions the output transitively depends on.
    pub fn utilized_commands(&self) -> Vec<bool> {
        self.utilized_from(self.output())
    }

    /// Marks the instructions `root` transitively depends on, `root` included.
    pub(crate) fn utilized_from(&self, root: usize) -> Vec<bool> {
        let mut used = vec![false; self.len()];
        used[root] = true;
        for position in (0..=root).rev() {
            let instruction = &self.instructions[position];
            if used[position] && !instruction.is_terminal() {
                for &operand in instruction.operands() {
                    used[operand] = true;
                }
            }
        }
        used
    }

    /// Returns the number of instructions the output depends on.
    pub fn complexity(&self) -> usize {
        self.utilized_commands().iter().filter(|&&used| used).count()
    }

    /// Returns the largest column index loaded by any instruction.
    pub fn max_column(&self) -> Option<usize> {
        self.terminal_operands(Operator::Variable).max()
    }

    /// Returns the largest constant index loaded by any instruction.
    pub fn max_constant(&self) -> Option<usize> {
        self.terminal_operands(Operator::Constant).max()
    }

    fn terminal_operands(&self, operator: Operator) -> impl Iterator<Item = usize> + '_ {
        self.instructions
            .iter()
            .filter(move |instruction| instruction.operator() == operator)
            .map(Instruction::lhs)
    }

    /// Checks every terminal operand against a table with `n_columns` columns and
    /// a constants vector of length `n_constants`.
    ///
    /// Instructions the output does not depend on are checked too.
    pub fn check_operands(&self, n_columns: usize, n_constants: usize) -> Result<(), EvalError> {
        for (position, instruction) in self.instructions.iter().enumerate() {
            let (bound, what) = match instruction.operator() {
                Operator::Variable => (n_columns, "column"),
                Operator::Constant => (n_constants, "constant"),
                _ => continue,
            };
            if instruction.lhs() >= bound {
                return Err(EvalError::invalid_operand(
                    self.origin(position),
                    0,
                    instruction.lhs(),
                    format!("{what} out of range (have {bound})"),
                ));
            }
        }
        Ok(())
    }

    /// Drops the instructions the output does not depend on.
    pub fn reduced(&self) -> Program {
        crate::opt::reduce(self, self.output())
    }

    /// Collapses instructions that repeat an earlier `(operator, operands)` pair.
    pub fn deduplicated(&self) -> Program {
        crate::opt::deduplicate(self).0
    }

    /// Deduplicates, then drops the instructions the output does not depend on.
    pub fn optimized(&self) -> Program {
        crate::opt::optimize(self)
    }

    /// Renders the expression in the given format.
    ///
    /// Constants are printed by value when `constants` holds them, otherwise
    /// as `C_i`.
    pub fn render(&self, format: Format, constants: Option<&[f64]>) -> String {
        render(self, format, constants)
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

/// Formats the program as one `position <= operation` line per instruction.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Format::Stack, None))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, ({}))",
            self.operator.code(),
            self.operands().iter().join(", ")
        )
    }
}

fn check_operand_count(position: usize, operator: Operator, got: usize) -> Result<(), EvalError> {
    let expected = operator.arity().operand_count();
    if got != expected {
        // first slot that is missing, or the first one past the expected count
        let slot = got.min(expected);
        return Err(EvalError::invalid_operand(
            position,
            slot,
            got,
            format!("{operator} takes {expected} operand(s), got {got}"),
        ));
    }
    Ok(())
}

fn validate_instruction(position: usize, instruction: &Instruction) -> Result<(), EvalError> {
    let operator = instruction.operator();
    check_operand_count(position, operator, instruction.operands().len())?;
    if operator.arity() == Arity::Terminal {
        return Ok(());
    }
    for (slot, &operand) in instruction.operands().iter().enumerate() {
        if operand >= position {
            return Err(EvalError::invalid_operand(
                position,
                slot,
                operand,
                "reference must point to an earlier instruction",
            ));
        }
    }
    Ok(())
}
