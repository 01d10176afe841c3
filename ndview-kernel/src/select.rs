//! Partitioning, quickselect and quantiles on 1-D views.
//!
//! All functions here reorder the view's elements in place.

use ndview_view::{Lane, NdView, Result, ViewError};
use rand::Rng;

use crate::kernel::{arg_max_lane, arg_min_lane};

/// Lomuto partition of `lane[left..=right]` around the value at `p`.
fn partition_lane(data: &mut [f64], lane: Lane, p: usize, left: usize, right: usize) -> usize {
    let at = |i: usize| lane.index(i);
    let pivot = data[at(p)];
    data.swap(at(p), at(right));
    let mut split = left;
    for i in left..right {
        if data[at(i)] < pivot {
            data.swap(at(i), at(split));
            split += 1;
        }
    }
    data.swap(at(split), at(right));
    split
}

fn select_lane<R: Rng + ?Sized>(
    data: &mut [f64],
    lane: Lane,
    mut left: usize,
    mut right: usize,
    n: usize,
    rng: &mut R,
) -> f64 {
    loop {
        if left == right {
            return data[lane.index(left)];
        }
        let p = rng.gen_range(left..=right);
        let split = partition_lane(data, lane, p, left, right);
        match n.cmp(&split) {
            std::cmp::Ordering::Equal => return data[lane.index(n)],
            std::cmp::Ordering::Less => right = split - 1,
            std::cmp::Ordering::Greater => left = split + 1,
        }
    }
}

fn check_window(lane: &Lane, left: usize, inner: usize, right: usize) -> Result<()> {
    if right >= lane.len {
        return Err(ViewError::OutOfRange {
            index: right,
            extent: lane.len,
        });
    }
    if left > inner || inner > right {
        return Err(ViewError::OutOfRange {
            index: inner,
            extent: right + 1,
        });
    }
    Ok(())
}

/// Partition the whole view around the value at `p`.
///
/// Returns the split: elements before it are `< pivot`, the rest `>= pivot`, and the
/// pivot itself sits at the split.
pub fn partition(v: &NdView, p: usize) -> Result<usize> {
    let lane = v.lane_1d()?;
    partition_range(v, p, 0, lane.len.saturating_sub(1))
}

/// Partition `v[left..=right]` around the value at `p`, with `left <= p <= right`.
pub fn partition_range(v: &NdView, p: usize, left: usize, right: usize) -> Result<usize> {
    let lane = v.lane_1d()?;
    check_window(&lane, left, p, right)?;
    Ok(v
        .buffer()
        .with_mut(|data| partition_lane(data, lane, p, left, right)))
}

/// The `n`-th smallest element of `v[left..=right]`, by randomized quickselect.
pub fn select(v: &NdView, left: usize, right: usize, n: usize) -> Result<f64> {
    select_with(v, left, right, n, &mut rand::thread_rng())
}

/// [`select`] with an explicit pivot source.
pub fn select_with<R: Rng + ?Sized>(
    v: &NdView,
    left: usize,
    right: usize,
    n: usize,
    rng: &mut R,
) -> Result<f64> {
    let lane = v.lane_1d()?;
    check_window(&lane, left, n, right)?;
    Ok(v
        .buffer()
        .with_mut(|data| select_lane(data, lane, left, right, n, rng)))
}

/// Interpolated sample quantile at `q ∈ [0, 1]`, using position `(n + 1) · q`.
pub fn quantile(v: &NdView, q: f64) -> Result<f64> {
    quantile_with(v, q, &mut rand::thread_rng())
}

/// [`quantile`] with an explicit pivot source.
pub fn quantile_with<R: Rng + ?Sized>(v: &NdView, q: f64, rng: &mut R) -> Result<f64> {
    let lane = v.lane_1d()?;
    let n = lane.len;
    if n == 0 {
        return Err(ViewError::InvalidArgument("quantile of an empty view".into()));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(ViewError::InvalidArgument(format!(
            "quantile {q} outside [0, 1]"
        )));
    }

    let pos = (n + 1) as f64 * q;
    Ok(v.buffer().with_mut(|data| {
        if pos < 1.0 {
            return arg_min_lane(data, lane).1;
        }
        if pos >= n as f64 {
            return arg_max_lane(data, lane).1;
        }
        let floor = pos.floor();
        let frac = pos - floor;
        let k = floor as usize;
        let lo = select_lane(data, lane, 0, n - 1, k - 1, rng);
        let hi = select_lane(data, lane, 0, n - 1, k, rng);
        lo + frac * (hi - lo)
    }))
}

pub fn median(v: &NdView) -> Result<f64> {
    quantile(v, 0.5)
}
