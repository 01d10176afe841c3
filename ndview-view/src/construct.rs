//! Constructors: fresh dense arrays and concatenation.

use crate::buffer::SharedBuffer;
use crate::shape::{self, row_major_strides};
use crate::transform::Viewable;
use crate::view::NdView;
use crate::{Result, ViewError};

fn check_rank(shape: &[usize]) -> Result<()> {
    if shape.is_empty() {
        return Err(ViewError::InvalidArgument(
            "a view needs at least one axis".into(),
        ));
    }
    Ok(())
}

impl NdView {
    /// Dense row-major array of zeros.
    pub fn zeros(shape: &[usize]) -> Result<Self> {
        Self::full(shape, 0.0)
    }

    /// Dense row-major array with every element set to `value`.
    pub fn full(shape: &[usize], value: f64) -> Result<Self> {
        Self::from_vec(vec![value; shape::size(shape)], shape)
    }

    /// 1-D array holding a copy of `values`.
    pub fn of(values: &[f64]) -> Self {
        let buffer = SharedBuffer::new(values.to_vec());
        NdView::from_parts_unchecked(buffer, 0, &[values.len()], &[1])
    }

    /// Dense row-major array taking ownership of `values`.
    pub fn from_vec(values: Vec<f64>, shape: &[usize]) -> Result<Self> {
        check_rank(shape)?;
        let expected = shape::size(shape);
        if values.len() != expected {
            return Err(ViewError::SizeMismatch {
                from: values.len(),
                to: expected,
            });
        }
        let strides = row_major_strides(shape);
        Ok(NdView::from_parts_unchecked(
            SharedBuffer::new(values),
            0,
            shape,
            &strides,
        ))
    }

    /// Dense row-major array with values produced by `f` in row-major order.
    pub fn from_fn(shape: &[usize], mut f: impl FnMut(&[usize]) -> f64) -> Result<Self> {
        check_rank(shape)?;
        let total = shape::size(shape);
        let rank = shape.len();
        let mut data = Vec::with_capacity(total);
        let mut idx = vec![0usize; rank];
        for _ in 0..total {
            data.push(f(&idx));
            for d in (0..rank).rev() {
                idx[d] += 1;
                if idx[d] < shape[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        Self::from_vec(data, shape)
    }

    /// Join views along axis 0 into a new dense array.
    pub fn concatenate(views: &[&NdView]) -> Result<Self> {
        Self::concatenate_along(views, 0)
    }

    /// Join views along `axis` into a new dense array.
    ///
    /// All views must have the same rank and agree on every extent except `axis`.
    pub fn concatenate_along(views: &[&NdView], axis: usize) -> Result<Self> {
        let first = views.first().ok_or_else(|| {
            ViewError::InvalidArgument("nothing to concatenate".into())
        })?;
        let rank = first.ndim();
        if axis >= rank {
            return Err(ViewError::InvalidAxis { axis, rank });
        }
        let mut shape = first.shape().to_vec();
        shape[axis] = 0;
        for v in views {
            let conforms = v.ndim() == rank
                && v
                    .shape()
                    .iter()
                    .zip(first.shape())
                    .enumerate()
                    .all(|(d, (a, b))| d == axis || a == b);
            if !conforms {
                return Err(ViewError::NonConformable(
                    first.shape().to_vec(),
                    v.shape().to_vec(),
                ));
            }
            shape[axis] += v.shape()[axis];
        }

        let out = NdView::zeros(&shape)?;
        let mut pos = 0;
        for v in views {
            let extent = v.shape()[axis];
            out.slice(pos, pos + extent, 1, axis)?.assign(v)?;
            pos += extent;
        }
        Ok(out)
    }

    /// New dense array holding `self` followed by `other` along `axis`.
    pub fn append(&self, other: &NdView, axis: usize) -> Result<Self> {
        Self::concatenate_along(&[self, other], axis)
    }
}
