//! The exponential function.
//!
//! Overflow to infinity is a representable result, not a domain violation.

use super::DomainResult;

pub fn exp(a: f64) -> DomainResult {
    Ok(a.exp())
}

/// The derivative of `e^a` is the result itself.
pub fn exp_partial(_a: f64, r: f64) -> f64 {
    r
}
