//! Protected square root, `sqrt(|a|)`.

use super::{sign, DomainResult};

pub fn sqrt(a: f64) -> DomainResult {
    Ok(a.abs().sqrt())
}

/// `sign(a) / (2 sqrt|a|)`; NaN at zero where the derivative does not exist.
pub fn sqrt_partial(a: f64, r: f64) -> f64 {
    0.5 * sign(a) / r
}
