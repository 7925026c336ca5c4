//! Sine and cosine, arguments in radians.

use super::DomainResult;

pub fn sin(a: f64) -> DomainResult {
    Ok(a.sin())
}

pub fn sin_partial(a: f64, _r: f64) -> f64 {
    a.cos()
}

pub fn cos(a: f64) -> DomainResult {
    Ok(a.cos())
}

pub fn cos_partial(a: f64, _r: f64) -> f64 {
    -a.sin()
}
