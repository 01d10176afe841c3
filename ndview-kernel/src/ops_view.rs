//! Elementwise operations on views.
//!
//! `*_assign` functions write through to the receiver's buffer; the copying forms
//! `copy()` first and then run the in-place form on the copy.

use ndview_view::{NdView, Result};

use crate::dispatch::{BinaryOp, Dispatcher, UnaryOp};
use crate::kernel::{binary_lane, cum_sum_lane, paired_lanes, scalar_lane, unary_lane};
use crate::reduce_view;

/// `v[i] = op(v[i])`.
pub fn unary_assign(d: &Dispatcher<'_>, v: &NdView, op: UnaryOp) {
    let lanes = v.lanes();
    v.buffer().with_mut(|data| {
        for &lane in &lanes {
            unary_lane(d, op, data, lane);
        }
    });
}

/// `op(v)` as a new dense view.
pub fn unary(d: &Dispatcher<'_>, v: &NdView, op: UnaryOp) -> NdView {
    let out = v.copy();
    unary_assign(d, &out, op);
    out
}

/// `v[i] = v[i] op value`.
pub fn scalar_assign(d: &Dispatcher<'_>, v: &NdView, op: BinaryOp, value: f64) {
    let lanes = v.lanes();
    v.buffer().with_mut(|data| {
        for &lane in &lanes {
            scalar_lane(d, op, data, lane, value);
        }
    });
}

/// `v op value` as a new dense view.
pub fn scalar(d: &Dispatcher<'_>, v: &NdView, op: BinaryOp, value: f64) -> NdView {
    let out = v.copy();
    scalar_assign(d, &out, op, value);
    out
}

/// `dst[i] = dst[i] op src[i]` for views of identical shape.
///
/// When both views share a buffer, `src` is read into a snapshot before anything is
/// written, so overlapping operands behave as if `src` had been copied.
pub fn binary_assign(d: &Dispatcher<'_>, dst: &NdView, src: &NdView, op: BinaryOp) -> Result<()> {
    dst.check_shape(src)?;
    let snapshot;
    let src = if dst.shares_buffer(src) {
        snapshot = src.copy();
        &snapshot
    } else {
        src
    };
    let pairs = paired_lanes(dst, src);
    src.buffer().with(|s| {
        dst.buffer().with_mut(|t| {
            for &(dl, sl) in &pairs {
                binary_lane(d, op, t, dl, s, sl);
            }
        })
    });
    Ok(())
}

/// `a op b` as a new dense view.
pub fn binary(d: &Dispatcher<'_>, a: &NdView, b: &NdView, op: BinaryOp) -> Result<NdView> {
    a.check_shape(b)?;
    let out = a.copy();
    binary_assign(d, &out, b, op)?;
    Ok(out)
}

/// Replace a 1-D view with its running totals.
pub fn cum_sum(d: &Dispatcher<'_>, v: &NdView) -> Result<()> {
    let lane = v.lane_1d()?;
    v.buffer().with_mut(|data| cum_sum_lane(d, data, lane));
    Ok(())
}

/// Scale so the elements sum to (almost) one: `v /= sum(v) + ε·size`.
pub fn rescale(d: &Dispatcher<'_>, v: &NdView) {
    let total = reduce_view::sum(d, v) + f64::EPSILON * v.len() as f64;
    scalar_assign(d, v, BinaryOp::Div, total);
}

/// Normalize log-weights: `v -= log_sum_exp(v)`.
pub fn log_rescale(d: &Dispatcher<'_>, v: &NdView) {
    let lse = reduce_view::log_sum_exp(d, v);
    scalar_assign(d, v, BinaryOp::Sub, lse);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndview_view::Viewable;

    fn arange(n: usize) -> NdView {
        NdView::of(&(0..n).map(|x| x as f64).collect::<Vec<_>>())
    }

    #[test]
    fn test_unary_copy_leaves_source() {
        let d = Dispatcher::scalar();
        let v = NdView::of(&[0.0, 1.0, 2.0]);
        let e = unary(&d, &v, UnaryOp::Exp);
        assert_eq!(v.to_vec(), vec![0.0, 1.0, 2.0]);
        assert_relative_eq!(e.at(2).unwrap(), 2f64.exp());
        assert!(!e.shares_buffer(&v));
    }

    #[test]
    fn test_scalar_assign_strided() {
        let d = Dispatcher::scalar();
        let v = arange(10);
        let odd = v.slice(1, 10, 2, 0).unwrap();
        scalar_assign(&d, &odd, BinaryOp::Add, 100.0);
        assert_eq!(
            v.to_vec(),
            vec![0.0, 101.0, 2.0, 103.0, 4.0, 105.0, 6.0, 107.0, 8.0, 109.0]
        );
    }

    #[test]
    fn test_binary_shape_mismatch() {
        let d = Dispatcher::scalar();
        let a = arange(6).reshape(&[2, 3]).unwrap();
        let b = arange(6).reshape(&[3, 2]).unwrap();
        assert!(matches!(
            binary(&d, &a, &b, BinaryOp::Add),
            Err(ndview_view::ViewError::NonConformable(_, _))
        ));
        assert!(binary_assign(&d, &a, &b, BinaryOp::Add).is_err());
        assert_eq!(a.to_vec(), arange(6).to_vec());
    }

    #[test]
    fn test_binary_transposed_operand() {
        let d = Dispatcher::scalar();
        let a = arange(6).reshape(&[2, 3]).unwrap();
        let bt = arange(6).reshape(&[3, 2]).unwrap().transpose();
        let c = binary(&d, &a, &bt, BinaryOp::Mul).unwrap();
        // bt = [[0, 2, 4], [1, 3, 5]]
        assert_eq!(c.to_vec(), vec![0.0, 2.0, 8.0, 3.0, 12.0, 25.0]);
    }

    #[test]
    fn test_binary_overlapping_operands() {
        let d = Dispatcher::scalar();
        let v = arange(6);
        let head = v.slice(0, 5, 1, 0).unwrap();
        let tail = v.slice(1, 6, 1, 0).unwrap();
        // reads all of `tail` before writing `head`
        binary_assign(&d, &head, &tail, BinaryOp::Add).unwrap();
        assert_eq!(v.to_vec(), vec![1.0, 3.0, 5.0, 7.0, 9.0, 5.0]);

        let w = arange(4);
        binary_assign(&d, &w, &w, BinaryOp::Mul).unwrap();
        assert_eq!(w.to_vec(), vec![0.0, 1.0, 4.0, 9.0]);
    }

    #[test]
    fn test_log_add_exp_binary() {
        let d = Dispatcher::scalar();
        let a = NdView::of(&[0.0, f64::NEG_INFINITY, 1.0]);
        let b = NdView::of(&[0.0, 3.0, f64::NEG_INFINITY]);
        let c = binary(&d, &a, &b, BinaryOp::LogAddExp).unwrap();
        assert_relative_eq!(c.at(0).unwrap(), 2f64.ln());
        assert_eq!(c.at(1).unwrap(), 3.0);
        assert_eq!(c.at(2).unwrap(), 1.0);
    }

    #[test]
    fn test_cum_sum() {
        let d = Dispatcher::scalar();
        let v = NdView::of(&[1.0, 2.0, 3.0, 4.0]);
        cum_sum(&d, &v).unwrap();
        assert_eq!(v.to_vec(), vec![1.0, 3.0, 6.0, 10.0]);

        let m = NdView::zeros(&[2, 2]).unwrap();
        assert!(matches!(
            cum_sum(&d, &m),
            Err(ndview_view::ViewError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rescale_and_log_rescale() {
        let d = Dispatcher::scalar();
        let v = NdView::of(&[1.0, 3.0, 4.0]);
        rescale(&d, &v);
        assert_relative_eq!(v.to_vec().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.at(1).unwrap(), 0.375, epsilon = 1e-12);

        let w = NdView::of(&[-1.0, 0.5, 2.0, 7.0]);
        log_rescale(&d, &w);
        assert_relative_eq!(reduce_view::log_sum_exp(&d, &w).exp(), 1.0, epsilon = 1e-8);
    }
}
