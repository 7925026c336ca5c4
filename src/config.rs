//! Evaluator configuration.
//!
//! An [`EvaluatorConfig`] is fixed when a [`StackEvaluator`](crate::StackEvaluator)
//! is created. The defaults fail on the first undefined operation, optimise the
//! program before running it and split large tables across the rayon thread pool.
//!
//! # Example
//!
//! ```
//! use agraph_eval::{DomainPolicy, EvaluatorConfig};
//!
//! let config = EvaluatorConfig::default()
//!     .with_domain_policy(DomainPolicy::Propagate)
//!     .with_parallel(false);
//! assert!(config.optimize);
//! assert_eq!(config.domain_policy, DomainPolicy::Propagate);
//! ```

use std::fmt;
use std::str::FromStr;

/// Lower bound on the number of rows handed to one worker.
pub const DEFAULT_MIN_ROWS_PER_CHUNK: usize = 256;

/// What happens when an operation is undefined at its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DomainPolicy {
    /// Abort the call with `EvalError::ArithmeticDomain`
    #[default]
    Error,
    /// Replace the value and all its derivatives with NaN and continue
    Propagate,
}

impl FromStr for DomainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(DomainPolicy::Error),
            "propagate" | "nan" => Ok(DomainPolicy::Propagate),
            other => Err(format!("unknown domain policy '{other}'")),
        }
    }
}

impl fmt::Display for DomainPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainPolicy::Error => f.write_str("error"),
            DomainPolicy::Propagate => f.write_str("propagate"),
        }
    }
}

/// Settings of a [`StackEvaluator`](crate::StackEvaluator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Handling of undefined operations
    pub domain_policy: DomainPolicy,
    /// Deduplicate and reduce the program before evaluating it.
    ///
    /// Results are bit-identical either way. With optimisation off every
    /// instruction runs, so an undefined operation in an instruction the output
    /// does not use is reported; with it on, such instructions never run.
    pub optimize: bool,
    /// Evaluate row chunks on the rayon thread pool
    pub parallel: bool,
    /// Smallest number of rows evaluated as one chunk
    pub min_rows_per_chunk: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            domain_policy: DomainPolicy::default(),
            optimize: true,
            parallel: true,
            min_rows_per_chunk: DEFAULT_MIN_ROWS_PER_CHUNK,
        }
    }
}

impl EvaluatorConfig {
    pub fn with_domain_policy(mut self, domain_policy: DomainPolicy) -> Self {
        self.domain_policy = domain_policy;
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the smallest chunk size; zero is treated as one.
    pub fn with_min_rows_per_chunk(mut self, min_rows_per_chunk: usize) -> Self {
        self.min_rows_per_chunk = min_rows_per_chunk.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EvaluatorConfig::default();
        assert_eq!(config.domain_policy, DomainPolicy::Error);
        assert!(config.optimize);
        assert!(config.parallel);
        assert_eq!(config.min_rows_per_chunk, 256);
    }

    #[test]
    fn test_setters() {
        let config = EvaluatorConfig::default()
            .with_optimize(false)
            .with_parallel(false)
            .with_min_rows_per_chunk(0);
        assert!(!config.optimize);
        assert!(!config.parallel);
        assert_eq!(config.min_rows_per_chunk, 1);
    }

    #[test]
    fn test_domain_policy_from_str() {
        assert_eq!("error".parse::<DomainPolicy>(), Ok(DomainPolicy::Error));
        assert_eq!("Propagate".parse::<DomainPolicy>(), Ok(DomainPolicy::Propagate));
        assert_eq!("nan".parse::<DomainPolicy>(), Ok(DomainPolicy::Propagate));
        assert!("ignore".parse::<DomainPolicy>().is_err());
        assert_eq!(DomainPolicy::Propagate.to_string(), "propagate");
    }
}
