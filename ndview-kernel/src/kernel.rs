//! Lane kernels: every operation is expressed per [`Lane`], trying the dispatcher's
//! backend on eligible lanes and running the scalar loop otherwise.
//!
//! Callers hold the buffer borrow; nothing here touches a `SharedBuffer`.

use ndview_view::{Lane, NdView};

use crate::dispatch::{declined, BinaryOp, Dispatcher, UnaryOp};
use crate::logspace::log_sum_exp_lanes;
use crate::summation::{balanced_dot, balanced_sum, KahanSum};

// ============================================================================
// Lane pairing
// ============================================================================

/// Matching lanes of two views of the same shape, in row-major order.
///
/// Two dense views pair as single flat lanes; otherwise both are split by rows.
pub(crate) fn paired_lanes(a: &NdView, b: &NdView) -> Vec<(Lane, Lane)> {
    debug_assert_eq!(a.shape(), b.shape());
    match (a.flat_lane(), b.flat_lane()) {
        (Some(la), Some(lb)) if la.len > 0 => vec![(la, lb)],
        (Some(_), Some(_)) => Vec::new(),
        _ => a.row_lanes().into_iter().zip(b.row_lanes()).collect(),
    }
}

// ============================================================================
// Elementwise
// ============================================================================

pub(crate) fn unary_lane(d: &Dispatcher<'_>, op: UnaryOp, data: &mut [f64], lane: Lane) {
    if let Some((backend, r)) = d.dense_backend(&lane) {
        if backend.try_unary(op, &mut data[r]) {
            return;
        }
        declined(backend, "unary", lane.len);
    }
    match lane.range() {
        Some(r) => data[r].iter_mut().for_each(|x| *x = op.apply(*x)),
        None => {
            for i in lane.indices() {
                data[i] = op.apply(data[i]);
            }
        }
    }
}

pub(crate) fn scalar_lane(
    d: &Dispatcher<'_>,
    op: BinaryOp,
    data: &mut [f64],
    lane: Lane,
    value: f64,
) {
    if let Some((backend, r)) = d.dense_backend(&lane) {
        if backend.try_scalar(op, &mut data[r], value) {
            return;
        }
        declined(backend, "scalar", lane.len);
    }
    match lane.range() {
        Some(r) => data[r].iter_mut().for_each(|x| *x = op.apply(*x, value)),
        None => {
            for i in lane.indices() {
                data[i] = op.apply(data[i], value);
            }
        }
    }
}

/// `dst[dst_lane] = dst[dst_lane] op src[src_lane]`.
pub(crate) fn binary_lane(
    d: &Dispatcher<'_>,
    op: BinaryOp,
    dst: &mut [f64],
    dst_lane: Lane,
    src: &[f64],
    src_lane: Lane,
) {
    debug_assert_eq!(dst_lane.len, src_lane.len);
    if let Some(backend) = d.route_pair(dst_lane.kind(), src_lane.kind()) {
        if let (Some(rd), Some(rs)) = (dst_lane.range(), src_lane.range()) {
            if backend.try_binary(op, &mut dst[rd], &src[rs]) {
                return;
            }
            declined(backend, "binary", dst_lane.len);
        }
    }
    match (dst_lane.range(), src_lane.range()) {
        (Some(rd), Some(rs)) => {
            for (x, &y) in dst[rd].iter_mut().zip(&src[rs]) {
                *x = op.apply(*x, y);
            }
        }
        _ => {
            for (i, j) in dst_lane.indices().zip(src_lane.indices()) {
                dst[i] = op.apply(dst[i], src[j]);
            }
        }
    }
}

/// In-place running total with a compensated accumulator.
pub(crate) fn cum_sum_lane(d: &Dispatcher<'_>, data: &mut [f64], lane: Lane) {
    if let Some((backend, r)) = d.dense_backend(&lane) {
        if backend.try_cum_sum(&mut data[r]) {
            return;
        }
        declined(backend, "cum_sum", lane.len);
    }
    let mut acc = KahanSum::new();
    for i in lane.indices() {
        acc.feed(data[i]);
        data[i] = acc.result();
    }
}

// ============================================================================
// Reductions
// ============================================================================

pub(crate) fn sum_lane(d: &Dispatcher<'_>, data: &[f64], lane: Lane) -> f64 {
    if let Some((backend, r)) = d.dense_backend(&lane) {
        if let Some(s) = backend.try_sum(&data[r]) {
            return s;
        }
        declined(backend, "sum", lane.len);
    }
    balanced_sum(data, lane)
}

pub(crate) fn dot_lane(
    d: &Dispatcher<'_>,
    a: &[f64],
    a_lane: Lane,
    b: &[f64],
    b_lane: Lane,
) -> f64 {
    if let Some(backend) = d.route_pair(a_lane.kind(), b_lane.kind()) {
        if let (Some(ra), Some(rb)) = (a_lane.range(), b_lane.range()) {
            if let Some(s) = backend.try_dot(&a[ra], &b[rb]) {
                return s;
            }
            declined(backend, "dot", a_lane.len);
        }
    }
    balanced_dot(a, a_lane, b, b_lane)
}

/// Smallest element of a non-empty lane.
pub(crate) fn min_lane(d: &Dispatcher<'_>, data: &[f64], lane: Lane) -> f64 {
    if let Some((backend, r)) = d.dense_backend(&lane) {
        if let Some(m) = backend.try_min(&data[r]) {
            return m;
        }
        declined(backend, "min", lane.len);
    }
    arg_min_lane(data, lane).1
}

/// Largest element of a non-empty lane.
pub(crate) fn max_lane(d: &Dispatcher<'_>, data: &[f64], lane: Lane) -> f64 {
    if let Some((backend, r)) = d.dense_backend(&lane) {
        if let Some(m) = backend.try_max(&data[r]) {
            return m;
        }
        declined(backend, "max", lane.len);
    }
    arg_max_lane(data, lane).1
}

/// Position within the lane and value of its first smallest element, or of its first NaN.
pub(crate) fn arg_min_lane(data: &[f64], lane: Lane) -> (usize, f64) {
    let mut best = (0, data[lane.index(0)]);
    if best.1.is_nan() {
        return best;
    }
    for k in 1..lane.len {
        let x = data[lane.index(k)];
        if x.is_nan() {
            return (k, x);
        }
        if x < best.1 {
            best = (k, x);
        }
    }
    best
}

/// Position within the lane and value of its first largest element, or of its first NaN.
pub(crate) fn arg_max_lane(data: &[f64], lane: Lane) -> (usize, f64) {
    let mut best = (0, data[lane.index(0)]);
    if best.1.is_nan() {
        return best;
    }
    for k in 1..lane.len {
        let x = data[lane.index(k)];
        if x.is_nan() {
            return (k, x);
        }
        if x > best.1 {
            best = (k, x);
        }
    }
    best
}

pub(crate) fn log_sum_exp_view(d: &Dispatcher<'_>, data: &[f64], lanes: &[Lane]) -> f64 {
    if let [lane] = lanes {
        if let Some((backend, r)) = d.dense_backend(lane) {
            if let Some(v) = backend.try_log_sum_exp(&data[r]) {
                return v;
            }
            declined(backend, "log_sum_exp", lane.len);
        }
    }
    log_sum_exp_lanes(data, lanes)
}
