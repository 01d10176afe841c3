//! Capability traits implemented for [`NdView`] on top of the process-wide
//! [`Dispatcher::current`]. Use the free functions in [`ops_view`](crate::ops_view),
//! [`reduce_view`](crate::reduce_view) to pick a dispatcher explicitly.

use ndview_view::{NdView, Result};

use crate::dispatch::{BinaryOp, Dispatcher, UnaryOp};
use crate::{ops_view, reduce_view, select, sort};

/// Whole-view reductions.
pub trait Reducible {
    fn sum(&self) -> f64;
    fn dot(&self, other: &Self) -> Result<f64>;
    fn mean(&self) -> f64;
    /// Sample variance (`n - 1` denominator).
    fn variance(&self) -> Result<f64>;
    /// Sample standard deviation.
    fn sd(&self) -> Result<f64>;
    fn min(&self) -> Result<f64>;
    fn max(&self) -> Result<f64>;
    /// Row-major index of the first smallest element.
    fn arg_min(&self) -> Result<usize>;
    /// Row-major index of the first largest element.
    fn arg_max(&self) -> Result<usize>;
    fn log_sum_exp(&self) -> f64;
}

impl Reducible for NdView {
    fn sum(&self) -> f64 {
        reduce_view::sum(&Dispatcher::current(), self)
    }

    fn dot(&self, other: &Self) -> Result<f64> {
        reduce_view::dot(&Dispatcher::current(), self, other)
    }

    fn mean(&self) -> f64 {
        reduce_view::mean(&Dispatcher::current(), self)
    }

    fn variance(&self) -> Result<f64> {
        reduce_view::variance(&Dispatcher::current(), self)
    }

    fn sd(&self) -> Result<f64> {
        reduce_view::sd(&Dispatcher::current(), self)
    }

    fn min(&self) -> Result<f64> {
        reduce_view::min(&Dispatcher::current(), self)
    }

    fn max(&self) -> Result<f64> {
        reduce_view::max(&Dispatcher::current(), self)
    }

    fn arg_min(&self) -> Result<usize> {
        reduce_view::arg_min(self)
    }

    fn arg_max(&self) -> Result<usize> {
        reduce_view::arg_max(self)
    }

    fn log_sum_exp(&self) -> f64 {
        reduce_view::log_sum_exp(&Dispatcher::current(), self)
    }
}

/// Elementwise arithmetic. `*_assign` methods write through to the shared buffer; the
/// others return a new dense view.
pub trait ElementwiseMutable: Sized {
    fn unary_assign(&self, op: UnaryOp);
    fn unary(&self, op: UnaryOp) -> Self;
    fn scalar_assign(&self, op: BinaryOp, value: f64);
    fn scalar(&self, op: BinaryOp, value: f64) -> Self;
    fn binary_assign(&self, other: &Self, op: BinaryOp) -> Result<()>;
    fn binary(&self, other: &Self, op: BinaryOp) -> Result<Self>;
    /// Running totals of a 1-D view.
    fn cum_sum(&self) -> Result<()>;
    fn rescale(&self);
    fn log_rescale(&self);

    fn exp_assign(&self) {
        self.unary_assign(UnaryOp::Exp)
    }
    fn exp(&self) -> Self {
        self.unary(UnaryOp::Exp)
    }
    fn expm1_assign(&self) {
        self.unary_assign(UnaryOp::Expm1)
    }
    fn expm1(&self) -> Self {
        self.unary(UnaryOp::Expm1)
    }
    fn ln_assign(&self) {
        self.unary_assign(UnaryOp::Ln)
    }
    fn ln(&self) -> Self {
        self.unary(UnaryOp::Ln)
    }
    fn ln_1p_assign(&self) {
        self.unary_assign(UnaryOp::Ln1p)
    }
    fn ln_1p(&self) -> Self {
        self.unary(UnaryOp::Ln1p)
    }
    fn neg_assign(&self) {
        self.unary_assign(UnaryOp::Neg)
    }
    fn neg(&self) -> Self {
        self.unary(UnaryOp::Neg)
    }

    fn add_assign(&self, other: &Self) -> Result<()> {
        self.binary_assign(other, BinaryOp::Add)
    }
    fn add(&self, other: &Self) -> Result<Self> {
        self.binary(other, BinaryOp::Add)
    }
    fn sub_assign(&self, other: &Self) -> Result<()> {
        self.binary_assign(other, BinaryOp::Sub)
    }
    fn sub(&self, other: &Self) -> Result<Self> {
        self.binary(other, BinaryOp::Sub)
    }
    fn mul_assign(&self, other: &Self) -> Result<()> {
        self.binary_assign(other, BinaryOp::Mul)
    }
    fn mul(&self, other: &Self) -> Result<Self> {
        self.binary(other, BinaryOp::Mul)
    }
    fn div_assign(&self, other: &Self) -> Result<()> {
        self.binary_assign(other, BinaryOp::Div)
    }
    fn div(&self, other: &Self) -> Result<Self> {
        self.binary(other, BinaryOp::Div)
    }
    fn log_add_exp_assign(&self, other: &Self) -> Result<()> {
        self.binary_assign(other, BinaryOp::LogAddExp)
    }
    fn log_add_exp(&self, other: &Self) -> Result<Self> {
        self.binary(other, BinaryOp::LogAddExp)
    }

    fn add_scalar_assign(&self, value: f64) {
        self.scalar_assign(BinaryOp::Add, value)
    }
    fn add_scalar(&self, value: f64) -> Self {
        self.scalar(BinaryOp::Add, value)
    }
    fn sub_scalar_assign(&self, value: f64) {
        self.scalar_assign(BinaryOp::Sub, value)
    }
    fn sub_scalar(&self, value: f64) -> Self {
        self.scalar(BinaryOp::Sub, value)
    }
    fn mul_scalar_assign(&self, value: f64) {
        self.scalar_assign(BinaryOp::Mul, value)
    }
    fn mul_scalar(&self, value: f64) -> Self {
        self.scalar(BinaryOp::Mul, value)
    }
    fn div_scalar_assign(&self, value: f64) {
        self.scalar_assign(BinaryOp::Div, value)
    }
    fn div_scalar(&self, value: f64) -> Self {
        self.scalar(BinaryOp::Div, value)
    }
    fn log_add_exp_scalar_assign(&self, value: f64) {
        self.scalar_assign(BinaryOp::LogAddExp, value)
    }
    fn log_add_exp_scalar(&self, value: f64) -> Self {
        self.scalar(BinaryOp::LogAddExp, value)
    }
}

impl ElementwiseMutable for NdView {
    fn unary_assign(&self, op: UnaryOp) {
        ops_view::unary_assign(&Dispatcher::current(), self, op)
    }

    fn unary(&self, op: UnaryOp) -> Self {
        ops_view::unary(&Dispatcher::current(), self, op)
    }

    fn scalar_assign(&self, op: BinaryOp, value: f64) {
        ops_view::scalar_assign(&Dispatcher::current(), self, op, value)
    }

    fn scalar(&self, op: BinaryOp, value: f64) -> Self {
        ops_view::scalar(&Dispatcher::current(), self, op, value)
    }

    fn binary_assign(&self, other: &Self, op: BinaryOp) -> Result<()> {
        ops_view::binary_assign(&Dispatcher::current(), self, other, op)
    }

    fn binary(&self, other: &Self, op: BinaryOp) -> Result<Self> {
        ops_view::binary(&Dispatcher::current(), self, other, op)
    }

    fn cum_sum(&self) -> Result<()> {
        ops_view::cum_sum(&Dispatcher::current(), self)
    }

    fn rescale(&self) {
        ops_view::rescale(&Dispatcher::current(), self)
    }

    fn log_rescale(&self) {
        ops_view::log_rescale(&Dispatcher::current(), self)
    }
}

/// In-place order statistics on 1-D views.
pub trait OrderStatistics {
    fn partition(&self, p: usize) -> Result<usize>;
    fn partition_range(&self, p: usize, left: usize, right: usize) -> Result<usize>;
    fn select(&self, left: usize, right: usize, n: usize) -> Result<f64>;
    fn quantile(&self, q: f64) -> Result<f64>;
    fn median(&self) -> Result<f64>;
    fn arg_sort(&self, reverse: bool) -> Result<Vec<usize>>;
    fn reorder(&self, indices: &[usize]) -> Result<()>;
    fn reorder_along(&self, indices: &[usize], axis: usize) -> Result<()>;
    fn sort(&self, reverse: bool) -> Result<()>;
    fn shuffle(&self) -> Result<()>;
}

impl OrderStatistics for NdView {
    fn partition(&self, p: usize) -> Result<usize> {
        select::partition(self, p)
    }

    fn partition_range(&self, p: usize, left: usize, right: usize) -> Result<usize> {
        select::partition_range(self, p, left, right)
    }

    fn select(&self, left: usize, right: usize, n: usize) -> Result<f64> {
        select::select(self, left, right, n)
    }

    fn quantile(&self, q: f64) -> Result<f64> {
        select::quantile(self, q)
    }

    fn median(&self) -> Result<f64> {
        select::median(self)
    }

    fn arg_sort(&self, reverse: bool) -> Result<Vec<usize>> {
        sort::arg_sort(self, reverse)
    }

    fn reorder(&self, indices: &[usize]) -> Result<()> {
        sort::reorder(self, indices)
    }

    fn reorder_along(&self, indices: &[usize], axis: usize) -> Result<()> {
        sort::reorder_along(self, indices, axis)
    }

    fn sort(&self, reverse: bool) -> Result<()> {
        sort::sort(self, reverse)
    }

    fn shuffle(&self) -> Result<()> {
        sort::shuffle(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_named_elementwise_methods() {
        let a = NdView::of(&[1.0, 2.0, 4.0]);
        let b = NdView::of(&[1.0, 1.0, 2.0]);
        assert_eq!(a.add(&b).unwrap().to_vec(), vec![2.0, 3.0, 6.0]);
        assert_eq!(a.div(&b).unwrap().to_vec(), vec![1.0, 2.0, 2.0]);
        assert_eq!(a.mul_scalar(0.5).to_vec(), vec![0.5, 1.0, 2.0]);
        assert_eq!(a.neg().to_vec(), vec![-1.0, -2.0, -4.0]);
        assert_relative_eq!(a.ln().at(2).unwrap(), 4f64.ln());

        a.sub_scalar_assign(1.0);
        assert_eq!(a.to_vec(), vec![0.0, 1.0, 3.0]);
        a.exp_assign();
        a.ln_assign();
        assert_relative_eq!(a.at(2).unwrap(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reducible_methods() {
        let v = NdView::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(v.sum(), 40.0);
        assert_eq!(v.mean(), 5.0);
        assert_relative_eq!(v.variance().unwrap(), 32.0 / 7.0, epsilon = 1e-14);
        assert_eq!(v.min().unwrap(), 2.0);
        assert_eq!(v.max().unwrap(), 9.0);
        assert_eq!(v.arg_max().unwrap(), 7);
        assert_eq!(v.dot(&v).unwrap(), 232.0);
    }

    #[test]
    fn test_order_statistics_methods() {
        let v = NdView::of(&[3.0, 1.0, 2.0]);
        assert_eq!(v.median().unwrap(), 2.0);
        v.sort(false).unwrap();
        assert_eq!(v.to_vec(), vec![1.0, 2.0, 3.0]);
        v.reorder(&[2, 1, 0]).unwrap();
        assert_eq!(v.to_vec(), vec![3.0, 2.0, 1.0]);
        assert_eq!(v.select(0, 2, 0).unwrap(), 1.0);
    }
}
