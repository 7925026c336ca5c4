//! Elementary arithmetic: add, subtract, multiply, divide, negate and abs.
//!
//! Division is the only operator here with a domain restriction; a divisor of
//! exactly zero is reported rather than producing an infinity.

use super::{sign, DomainResult};

pub fn add(a: f64, b: f64) -> DomainResult {
    Ok(a + b)
}

pub fn add_partials(_a: f64, _b: f64, _r: f64) -> (f64, f64) {
    (1.0, 1.0)
}

pub fn subtract(a: f64, b: f64) -> DomainResult {
    Ok(a - b)
}

pub fn subtract_partials(_a: f64, _b: f64, _r: f64) -> (f64, f64) {
    (1.0, -1.0)
}

pub fn multiply(a: f64, b: f64) -> DomainResult {
    Ok(a * b)
}

/// d(ab) = b da + a db
pub fn multiply_partials(a: f64, b: f64, _r: f64) -> (f64, f64) {
    (b, a)
}

pub fn divide(a: f64, b: f64) -> DomainResult {
    if b == 0.0 {
        return Err("division by zero");
    }
    Ok(a / b)
}

/// d(a/b) = da / b - (a/b) db / b
pub fn divide_partials(_a: f64, b: f64, r: f64) -> (f64, f64) {
    (1.0 / b, -r / b)
}

pub fn negate(a: f64) -> DomainResult {
    Ok(-a)
}

pub fn negate_partial(_a: f64, _r: f64) -> f64 {
    -1.0
}

pub fn abs(a: f64) -> DomainResult {
    Ok(a.abs())
}

/// Subgradient 0 at the kink.
pub fn abs_partial(a: f64, _r: f64) -> f64 {
    sign(a)
}
