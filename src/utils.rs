//! Assorted numeric helpers.

/// Scale `values` in place so they sum to one and return the original sum.
///
/// A zero (or non-finite) sum leaves the values untouched.
#[inline]
pub fn normalize(values: &mut [f64]) -> f64 {
    let total: f64 = values.iter().sum();
    if total > 0.0 && total.is_finite() {
        values.iter_mut().for_each(|v| *v /= total);
    }
    total
}

/// `a` and `b` differ by at most `tolerance`, treating equal infinities as equal.
#[inline]
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    a == b || (a - b).abs() <= tolerance
}
