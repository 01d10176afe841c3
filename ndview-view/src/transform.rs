//! O(1) view transformations.

use crate::along::Along;
use crate::shape::{self, row_major_strides};
use crate::view::NdView;
use crate::{Result, ViewError};

/// Zero-copy transformations: every result shares the receiver's buffer.
pub trait Viewable: Sized {
    /// Elements `from, from + step, ...` (below `to`) of `axis`.
    fn slice(&self, from: usize, to: usize, step: usize, axis: usize) -> Result<Self>;

    /// Same elements under a new row-major shape. Only dense views can be reshaped.
    fn reshape(&self, shape: &[usize]) -> Result<Self>;

    /// Reverse the axis order.
    fn transpose(&self) -> Self;

    /// 1-D view of a dense view.
    fn flatten(&self) -> Result<Self>;

    /// Sub-view with `axis` fixed at `index`; the result has one axis fewer.
    fn index_axis(&self, index: usize, axis: usize) -> Result<Self>;

    /// Restartable sequence of the sub-views along `axis`.
    fn along(&self, axis: usize) -> Result<Along>;
}

impl Viewable for NdView {
    fn slice(&self, from: usize, to: usize, step: usize, axis: usize) -> Result<Self> {
        let rank = self.ndim();
        if axis >= rank {
            return Err(ViewError::InvalidAxis { axis, rank });
        }
        if step == 0 {
            return Err(ViewError::InvalidArgument("slice step must be >= 1".into()));
        }
        if from > to {
            return Err(ViewError::InvalidArgument(format!(
                "slice start {from} exceeds end {to}"
            )));
        }
        let extent = self.shape()[axis];
        if to > extent {
            return Err(ViewError::OutOfRange { index: to, extent });
        }

        let mut dims = self.shape().to_vec();
        let mut strides = self.strides().to_vec();
        let offset = self.offset() + from * strides[axis];
        dims[axis] = (to - from).div_ceil(step);
        strides[axis] *= step;
        Ok(NdView::from_parts_unchecked(
            self.buffer().clone(),
            offset,
            &dims,
            &strides,
        ))
    }

    fn reshape(&self, new_shape: &[usize]) -> Result<Self> {
        if new_shape.is_empty() {
            return Err(ViewError::InvalidArgument(
                "a view needs at least one axis".into(),
            ));
        }
        let to = shape::size(new_shape);
        if to != self.len() {
            return Err(ViewError::SizeMismatch {
                from: self.len(),
                to,
            });
        }
        if !self.is_dense() {
            return Err(ViewError::Unsupported(
                "reshape of a non-contiguous view; copy() it first",
            ));
        }
        let strides = row_major_strides(new_shape);
        Ok(NdView::from_parts_unchecked(
            self.buffer().clone(),
            self.offset(),
            new_shape,
            &strides,
        ))
    }

    fn transpose(&self) -> Self {
        let dims: Vec<usize> = self.shape().iter().rev().copied().collect();
        let strides: Vec<usize> = self.strides().iter().rev().copied().collect();
        NdView::from_parts_unchecked(self.buffer().clone(), self.offset(), &dims, &strides)
    }

    fn flatten(&self) -> Result<Self> {
        if !self.is_dense() {
            return Err(ViewError::IllegalState("not dense"));
        }
        Ok(NdView::from_parts_unchecked(
            self.buffer().clone(),
            self.offset(),
            &[self.len()],
            &[1],
        ))
    }

    fn index_axis(&self, index: usize, axis: usize) -> Result<Self> {
        let rank = self.ndim();
        if rank < 2 {
            return Err(ViewError::Unsupported(
                "sub-views along an axis need at least two axes",
            ));
        }
        if axis >= rank {
            return Err(ViewError::InvalidAxis { axis, rank });
        }
        let extent = self.shape()[axis];
        if index >= extent {
            return Err(ViewError::OutOfRange { index, extent });
        }
        let mut dims = self.shape().to_vec();
        let mut strides = self.strides().to_vec();
        let offset = self.offset() + index * strides[axis];
        dims.remove(axis);
        strides.remove(axis);
        Ok(NdView::from_parts_unchecked(
            self.buffer().clone(),
            offset,
            &dims,
            &strides,
        ))
    }

    fn along(&self, axis: usize) -> Result<Along> {
        Along::new(self.clone(), axis)
    }
}
