//! Power operators.
//!
//! Two flavours are provided:
//! - `power`: the real power `a^b`, undefined for a negative base raised to a
//!   non-integer exponent and for a zero base raised to a negative exponent
//! - `safe_power`: `|a|^b`, which is defined everywhere except for a zero base
//!   raised to a negative exponent
//!
//! The partial with respect to the exponent is `r ln|a|`. When the result is
//! exactly zero the exponent partial is taken as zero, which avoids the
//! `0 * -inf` that the formula would otherwise produce at `a == 0`.

use super::{sign, DomainResult};

pub fn power(a: f64, b: f64) -> DomainResult {
    if a < 0.0 && b.is_finite() && b.fract() != 0.0 {
        return Err("negative base with non-integer exponent");
    }
    if a == 0.0 && b < 0.0 {
        return Err("zero base with negative exponent");
    }
    Ok(a.powf(b))
}

pub fn power_partials(a: f64, b: f64, r: f64) -> (f64, f64) {
    let d_base = if b == 0.0 { 0.0 } else { b * a.powf(b - 1.0) };
    let d_exponent = if r == 0.0 { 0.0 } else { r * a.abs().ln() };
    (d_base, d_exponent)
}

pub fn safe_power(a: f64, b: f64) -> DomainResult {
    if a == 0.0 && b < 0.0 {
        return Err("zero base with negative exponent");
    }
    Ok(a.abs().powf(b))
}

pub fn safe_power_partials(a: f64, b: f64, r: f64) -> (f64, f64) {
    let d_base = if b == 0.0 {
        0.0
    } else {
        b * a.abs().powf(b - 1.0) * sign(a)
    };
    let d_exponent = if r == 0.0 { 0.0 } else { r * a.abs().ln() };
    (d_base, d_exponent)
}
