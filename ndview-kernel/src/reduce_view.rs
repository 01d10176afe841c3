//! Reductions on views.
//!
//! A dense view reduces as one lane. A strided view reduces lane by lane and the
//! per-lane partials are combined with a compensated sum, so the result does not
//! depend on how the view is laid out beyond rounding.

use ndview_view::{NdView, Result, ViewError};

use crate::dispatch::Dispatcher;
use crate::kernel::{
    arg_max_lane, arg_min_lane, dot_lane, log_sum_exp_view, max_lane, min_lane, paired_lanes,
    sum_lane,
};
use crate::summation::KahanSum;

fn require_non_empty(v: &NdView, op: &str) -> Result<()> {
    if v.is_empty() {
        return Err(ViewError::InvalidArgument(format!("{op} of an empty view")));
    }
    Ok(())
}

/// Sum of all elements; `0.0` for an empty view.
pub fn sum(d: &Dispatcher<'_>, v: &NdView) -> f64 {
    let lanes = v.lanes();
    v.buffer().with(|data| match lanes.as_slice() {
        [] => 0.0,
        [lane] => sum_lane(d, data, *lane),
        _ => lanes
            .iter()
            .map(|&lane| sum_lane(d, data, lane))
            .collect::<KahanSum>()
            .result(),
    })
}

/// `Σ a[i] * b[i]` over two views of identical shape.
pub fn dot(d: &Dispatcher<'_>, a: &NdView, b: &NdView) -> Result<f64> {
    a.check_shape(b)?;
    let pairs = paired_lanes(a, b);
    // shared borrows only: `a` and `b` may alias
    Ok(a.buffer().with(|da| {
        b.buffer().with(|db| match pairs.as_slice() {
            [] => 0.0,
            [(la, lb)] => dot_lane(d, da, *la, db, *lb),
            _ => pairs
                .iter()
                .map(|&(la, lb)| dot_lane(d, da, la, db, lb))
                .collect::<KahanSum>()
                .result(),
        })
    }))
}

/// Arithmetic mean; NaN for an empty view.
pub fn mean(d: &Dispatcher<'_>, v: &NdView) -> f64 {
    sum(d, v) / v.len() as f64
}

/// Sample variance (`n - 1` denominator), two-pass.
pub fn variance(d: &Dispatcher<'_>, v: &NdView) -> Result<f64> {
    let n = v.len();
    if n < 2 {
        return Err(ViewError::InvalidArgument(format!(
            "variance needs at least two elements, got {n}"
        )));
    }
    let m = mean(d, v);
    let lanes = v.lanes();
    let ss = v.buffer().with(|data| {
        let mut acc = KahanSum::new();
        for lane in &lanes {
            acc.extend(lane.indices().map(|i| {
                let dev = data[i] - m;
                dev * dev
            }));
        }
        acc.result()
    });
    Ok(ss / (n - 1) as f64)
}

/// Sample standard deviation.
pub fn sd(d: &Dispatcher<'_>, v: &NdView) -> Result<f64> {
    variance(d, v).map(f64::sqrt)
}

/// Smallest element; NaN if the view holds any NaN.
pub fn min(d: &Dispatcher<'_>, v: &NdView) -> Result<f64> {
    require_non_empty(v, "min")?;
    let lanes = v.lanes();
    Ok(v.buffer().with(|data| {
        let mut best = f64::INFINITY;
        for &lane in &lanes {
            let x = min_lane(d, data, lane);
            if x.is_nan() {
                return x;
            }
            best = best.min(x);
        }
        best
    }))
}

/// Largest element; NaN if the view holds any NaN.
pub fn max(d: &Dispatcher<'_>, v: &NdView) -> Result<f64> {
    require_non_empty(v, "max")?;
    let lanes = v.lanes();
    Ok(v.buffer().with(|data| {
        let mut best = f64::NEG_INFINITY;
        for &lane in &lanes {
            let x = max_lane(d, data, lane);
            if x.is_nan() {
                return x;
            }
            best = best.max(x);
        }
        best
    }))
}

/// Row-major flat index of the first smallest element, or of the first NaN.
pub fn arg_min(v: &NdView) -> Result<usize> {
    require_non_empty(v, "arg_min")?;
    Ok(arg_scan(v, arg_min_lane, |x, best| x < best))
}

/// Row-major flat index of the first largest element, or of the first NaN.
pub fn arg_max(v: &NdView) -> Result<usize> {
    require_non_empty(v, "arg_max")?;
    Ok(arg_scan(v, arg_max_lane, |x, best| x > best))
}

fn arg_scan(
    v: &NdView,
    lane_scan: fn(&[f64], ndview_view::Lane) -> (usize, f64),
    better: fn(f64, f64) -> bool,
) -> usize {
    let lanes = v.lanes();
    v.buffer().with(|data| {
        let mut base = 0;
        let mut best: Option<(usize, f64)> = None;
        for &lane in &lanes {
            let (k, x) = lane_scan(data, lane);
            if x.is_nan() {
                return base + k;
            }
            match best {
                Some((_, b)) if !better(x, b) => {}
                _ => best = Some((base + k, x)),
            }
            base += lane.len;
        }
        best.map_or(0, |(i, _)| i)
    })
}

/// `ln(Σ exp(v[i]))`; `-∞` for an empty view.
pub fn log_sum_exp(d: &Dispatcher<'_>, v: &NdView) -> f64 {
    let lanes = v.lanes();
    v.buffer().with(|data| log_sum_exp_view(d, data, &lanes))
}
