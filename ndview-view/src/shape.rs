//! Row-major shape and stride arithmetic.
//!
//! All functions here are pure. The last axis varies fastest (C order).

use crate::{Result, ViewError};

/// Number of elements described by `shape`.
#[inline]
pub fn size(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Convert a multi-index into a row-major flat index.
pub fn ravel(index: &[usize], shape: &[usize]) -> Result<usize> {
    if index.len() != shape.len() {
        return Err(ViewError::InvalidArgument(format!(
            "expected {} indices, got {}",
            shape.len(),
            index.len()
        )));
    }
    let mut flat = 0usize;
    let mut running = 1usize;
    for axis in (0..shape.len()).rev() {
        if index[axis] >= shape[axis] {
            return Err(ViewError::OutOfRange {
                index: index[axis],
                extent: shape[axis],
            });
        }
        flat += index[axis] * running;
        running *= shape[axis];
    }
    Ok(flat)
}

/// Convert a row-major flat index back into a multi-index.
pub fn unravel(flat: usize, shape: &[usize]) -> Result<Vec<usize>> {
    let total = size(shape);
    if flat >= total {
        return Err(ViewError::OutOfRange {
            index: flat,
            extent: total,
        });
    }
    let mut index = vec![0usize; shape.len()];
    let mut rest = flat;
    for axis in (0..shape.len()).rev() {
        index[axis] = rest % shape[axis];
        rest /= shape[axis];
    }
    Ok(index)
}

/// Compute row-major strides (C default: last index varies fastest).
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let rank = shape.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1usize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Whether `(shape, strides)` addresses one contiguous row-major block.
///
/// Axes of extent 1 do not constrain their stride. Empty shapes are contiguous.
pub fn is_row_major_contiguous(shape: &[usize], strides: &[usize]) -> bool {
    if shape.iter().any(|&d| d == 0) {
        return true;
    }
    let mut expected = 1usize;
    for (&dim, &stride) in shape.iter().zip(strides.iter()).rev() {
        if dim != 1 && stride != expected {
            return false;
        }
        expected *= dim;
    }
    true
}
