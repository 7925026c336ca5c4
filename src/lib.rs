//! Stack-based evaluation of acyclic-graph expressions with forward-mode differentiation.
//!
//! This crate evaluates programs: flat sequences of instructions in which every
//! instruction either loads a column of an input table or a constant, or applies
//! an operator to the results of earlier instructions. The last instruction is
//! the program's output. Programs are evaluated row by row over a 2-D table, and
//! the derivative of the output with respect to every input column (or every
//! constant) can be computed in the same pass.
//!
//! # Features
//!
//! - Closed operator set with a dispatch table of forward and derivative rules
//! - Validation of programs at construction, so cycles cannot exist
//! - Forward-mode differentiation with respect to input columns or constants
//! - Deduplication and dead-instruction removal before evaluation
//! - Parallel evaluation of large tables with rayon
//! - Support for `Vec`, fixed-size arrays, ndarray and nalgebra inputs
//!
//! # Example
//!
//! ```rust
//! use agraph_eval::{evaluate, evaluate_with_derivative, Program};
//!
//! // ((c1 / x1) + c0) * x0 - x0
//! let program = Program::from_raw(vec![
//!     (0, vec![0]),
//!     (0, vec![1]),
//!     (1, vec![0]),
//!     (1, vec![1]),
//!     (5, vec![3, 1]),
//!     (2, vec![4, 2]),
//!     (4, vec![5, 0]),
//!     (3, vec![6, 0]),
//! ])
//! .unwrap();
//! let table = vec![vec![1.0, 4.0], vec![2.0, 5.0]];
//! let constants = vec![3.14, 10.0];
//!
//! let output = evaluate(&program, &table, &constants).unwrap();
//! assert!((output[0] - 4.64).abs() < 1e-12);
//!
//! // derivatives with respect to x0 and x1, one row per sample
//! let (_, derivatives) = evaluate_with_derivative(&program, &table, &constants).unwrap();
//! assert!((derivatives[(0, 1)] + 0.625).abs() < 1e-12);
//! ```

pub use config::{DomainPolicy, EvaluatorConfig};
pub use errors::{EvalError, TableError};
pub use evaluator::{
    evaluate, evaluate_with_constant_derivative, evaluate_with_derivative, StackEvaluator,
};
pub use format::Format;
pub use operators::Operator;
pub use program::{Instruction, Program};
pub use types::{DerivativeTable, DerivativeTarget};

pub mod prelude {
    pub use crate::backends::matrix::{DataTable, InputTable};
    pub use crate::backends::vector::Vector;
    pub use crate::config::{DomainPolicy, EvaluatorConfig};
    pub use crate::errors::{EvalError, TableError};
    pub use crate::evaluator::{
        evaluate, evaluate_with_constant_derivative, evaluate_with_derivative, StackEvaluator,
    };
    pub use crate::format::Format;
    pub use crate::operators::Operator;
    pub use crate::program::{Instruction, Program};
    pub use crate::types::{DerivativeTable, DerivativeTarget};
}

/// Input tables and constant vectors
pub mod backends {
    pub mod matrix;
    pub mod vector;
}
/// Evaluator configuration
pub mod config;
/// Sample program and inputs
pub mod demo;
/// Error types for the various failure modes
pub mod errors;
/// Row-wise evaluation and forward-mode differentiation
pub mod evaluator;
/// String rendering of programs
pub mod format;
/// Operator enumeration and dispatch table
pub mod operators;
/// Deduplication and reduction of programs
pub mod opt;
/// Instructions and programs
pub mod program;
/// Derivative tables and targets
pub mod types;

#[cfg(test)]
mod fixtures;
