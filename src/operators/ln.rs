//! Protected natural logarithm.
//!
//! The logarithm is taken of the absolute value of its operand, so negative
//! operands are defined; only an operand of exactly zero is rejected. The
//! derivative of `ln|a|` is `1/a` on both sides of zero.

use super::DomainResult;

pub fn log(a: f64) -> DomainResult {
    if a == 0.0 {
        return Err("logarithm of zero");
    }
    Ok(a.abs().ln())
}

pub fn log_partial(a: f64, _r: f64) -> f64 {
    1.0 / a
}
