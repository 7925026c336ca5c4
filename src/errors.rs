//! Error types for the agraph-eval crate.
//!
//! This module defines the failure modes of program construction and evaluation.
//! The main error types are:
//!
//! - `EvalError`: Errors raised while building or evaluating a program
//! - `TableError`: Errors describing a malformed input table
//!
//! Every error that originates at an instruction carries the position of that
//! instruction in the program the caller built, even when the evaluator ran an
//! optimised copy of it.

use thiserror::Error;

use crate::operators::Operator;

/// Errors describing an input table that is not rectangular.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    /// A row has a different number of columns than the first row
    #[error("ragged input table: row {row} has {got} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        got: usize,
    },
    /// Flat data whose length is not `rows * cols`
    #[error("table data has {len} values, expected {rows} x {cols}")]
    Shape { rows: usize, cols: usize, len: usize },
}

/// Errors that can occur when building or evaluating a program.
///
/// All errors abort the whole call: partial outputs are never returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Error when a program contains no instructions
    #[error("program contains no instructions")]
    EmptyProgram,
    /// Error when an operand refers to a missing column, constant or instruction,
    /// or when an instruction has the wrong number of operands
    ///
    /// For a wrong operand count, `slot` is the first missing or surplus slot and
    /// `operand` is the number of operands given.
    #[error("invalid operand {operand} in slot {slot} of instruction {position}: {reason}")]
    InvalidOperand {
        position: usize,
        slot: usize,
        operand: usize,
        reason: String,
    },
    /// Error when an operation code lies outside the operator enumeration
    #[error("unknown operation code {code} at instruction {position}")]
    UnknownOperation { position: usize, code: i64 },
    /// Error when an operation is mathematically undefined at the evaluated operands
    #[error("{operator} is undefined at instruction {position}, row {row}: {reason}")]
    ArithmeticDomain {
        position: usize,
        row: usize,
        operator: Operator,
        reason: &'static str,
    },
    /// Error when the operator table lacks a derivative rule for an operator
    #[error("no derivative rule for {operator} at instruction {position}")]
    NonDifferentiableOperation { position: usize, operator: Operator },
    /// Error when the input table is malformed
    #[error("invalid input table: {0}")]
    Table(#[from] TableError),
}

impl EvalError {
    /// Returns the program position the error points at, if it has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            EvalError::InvalidOperand { position, .. }
            | EvalError::UnknownOperation { position, .. }
            | EvalError::ArithmeticDomain { position, .. }
            | EvalError::NonDifferentiableOperation { position, .. } => Some(*position),
            EvalError::EmptyProgram | EvalError::Table(_) => None,
        }
    }

    /// Builds an `InvalidOperand` error.
    pub(crate) fn invalid_operand(
        position: usize,
        slot: usize,
        operand: usize,
        reason: impl Into<String>,
    ) -> Self {
        EvalError::InvalidOperand {
            position,
            slot,
            operand,
            reason: reason.into(),
        }
    }
}
