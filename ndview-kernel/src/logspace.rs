//! Log-space arithmetic.

use ndview_view::Lane;

use crate::summation::KahanSum;

/// `ln(exp(a) + exp(b))` without overflow.
#[inline]
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    if a.is_infinite() {
        return if a < 0.0 { b } else { a };
    }
    if b.is_infinite() {
        return if b < 0.0 { a } else { b };
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// `ln(Σ exp(x))` over a contiguous slice.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    log_sum_exp_lanes(values, &[Lane::new(0, values.len(), 1)])
}

/// `ln(Σ exp(x))` over every element of `lanes`.
///
/// Empty input and an all `-∞` input give `-∞`; any `+∞` gives `+∞`; any NaN gives NaN.
pub fn log_sum_exp_lanes(data: &[f64], lanes: &[Lane]) -> f64 {
    let mut max = f64::NEG_INFINITY;
    for lane in lanes {
        for i in lane.indices() {
            let x = data[i];
            if x.is_nan() {
                return f64::NAN;
            }
            if x > max {
                max = x;
            }
        }
    }
    if max.is_infinite() {
        return max;
    }
    let mut acc = KahanSum::new();
    for lane in lanes {
        acc.extend(lane.indices().map(|i| (data[i] - max).exp()));
    }
    max + acc.result().ln()
}
