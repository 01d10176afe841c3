//! The view type: a shape/stride/offset descriptor over a [`SharedBuffer`].

use std::fmt;
use std::sync::Arc;

use crate::buffer::SharedBuffer;
use crate::shape::{self, is_row_major_contiguous, row_major_strides};
use crate::storage::{row_lanes, Lane, StorageKind};
use crate::{Result, ViewError};

// ============================================================================
// Validation helpers
// ============================================================================

/// Validate that every element addressed by `(offset, dims, strides)` lies in `[0, len)`.
fn validate_bounds(len: usize, dims: &[usize], strides: &[usize], offset: usize) -> Result<()> {
    if dims.is_empty() {
        return Err(ViewError::InvalidArgument(
            "a view needs at least one axis".into(),
        ));
    }
    if dims.len() != strides.len() {
        return Err(ViewError::InvalidArgument(format!(
            "{} strides for {} axes",
            strides.len(),
            dims.len()
        )));
    }
    if dims.iter().any(|&d| d == 0) {
        return Ok(());
    }
    let mut max_offset = offset;
    for (&dim, &stride) in dims.iter().zip(strides.iter()) {
        let end = stride.checked_mul(dim - 1).ok_or(ViewError::OutOfRange {
            index: usize::MAX,
            extent: len,
        })?;
        max_offset = max_offset.checked_add(end).ok_or(ViewError::OutOfRange {
            index: usize::MAX,
            extent: len,
        })?;
    }
    if max_offset >= len {
        return Err(ViewError::OutOfRange {
            index: max_offset,
            extent: len,
        });
    }
    Ok(())
}

// ============================================================================
// NdView
// ============================================================================

/// Strided view over a shared `f64` buffer.
///
/// Cloning a view is O(1) and yields another view of the same elements. Every view
/// transformation ([`Viewable`](crate::Viewable)) shares the buffer as well; only
/// [`copy`](Self::copy) allocates.
///
/// The [`StorageKind`] tag is computed once when the view is built.
#[derive(Clone)]
pub struct NdView {
    buffer: SharedBuffer,
    offset: usize,
    dims: Arc<[usize]>,
    strides: Arc<[usize]>,
    kind: StorageKind,
}

impl NdView {
    /// Wrap an existing buffer without copying.
    pub fn wrap(
        buffer: SharedBuffer,
        offset: usize,
        shape: &[usize],
        strides: &[usize],
    ) -> Result<Self> {
        validate_bounds(buffer.len(), shape, strides, offset)?;
        Ok(Self::from_parts_unchecked(buffer, offset, shape, strides))
    }

    /// Build a view whose bounds the caller has already established.
    pub(crate) fn from_parts_unchecked(
        buffer: SharedBuffer,
        offset: usize,
        shape: &[usize],
        strides: &[usize],
    ) -> Self {
        debug_assert!(validate_bounds(buffer.len(), shape, strides, offset).is_ok());
        let dense = is_row_major_contiguous(shape, strides);
        Self {
            buffer,
            offset,
            kind: StorageKind::classify(dense, shape::size(shape)),
            dims: Arc::from(shape),
            strides: Arc::from(strides),
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    #[inline]
    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    #[inline]
    pub fn is_dense(&self) -> bool {
        self.kind.is_dense()
    }

    #[inline]
    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    /// Whether both views are backed by the same buffer.
    pub fn shares_buffer(&self, other: &NdView) -> bool {
        self.buffer.ptr_eq(&other.buffer)
    }

    /// Whether the buffer spans of both views intersect.
    ///
    /// Conservative: two interleaved views (even and odd elements, say) overlap by this
    /// definition even though they address disjoint elements.
    pub fn overlaps(&self, other: &NdView) -> bool {
        match (self.span(), other.span()) {
            (Some((a0, a1)), Some((b0, b1))) => self.shares_buffer(other) && a0 <= b1 && b0 <= a1,
            _ => false,
        }
    }

    /// Inclusive buffer index range touched by the view.
    fn span(&self) -> Option<(usize, usize)> {
        if self.is_empty() {
            return None;
        }
        let last: usize = self
            .dims
            .iter()
            .zip(self.strides.iter())
            .map(|(&d, &s)| (d - 1) * s)
            .sum();
        Some((self.offset, self.offset + last))
    }

    // ------------------------------------------------------------------------
    // Lanes
    // ------------------------------------------------------------------------

    /// The single lane covering a dense view.
    pub fn flat_lane(&self) -> Option<Lane> {
        self.is_dense().then(|| Lane::new(self.offset, self.len(), 1))
    }

    /// Last-axis rows in row-major order, whatever the layout.
    pub fn row_lanes(&self) -> Vec<Lane> {
        row_lanes(&self.dims, &self.strides, self.offset)
    }

    /// Lanes covering every element in row-major order: one lane if the view is dense.
    pub fn lanes(&self) -> Vec<Lane> {
        match self.flat_lane() {
            Some(lane) if lane.len > 0 => vec![lane],
            Some(_) => Vec::new(),
            None => self.row_lanes(),
        }
    }

    /// The lane of a 1-D view.
    pub fn lane_1d(&self) -> Result<Lane> {
        if self.ndim() != 1 {
            return Err(ViewError::Unsupported("operation requires a 1-D view"));
        }
        Ok(Lane::new(self.offset, self.dims[0], self.strides[0]))
    }

    // ------------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------------

    fn buffer_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.ndim() {
            return Err(ViewError::InvalidArgument(format!(
                "expected {} indices, got {}",
                self.ndim(),
                index.len()
            )));
        }
        let mut pos = self.offset;
        for (axis, &i) in index.iter().enumerate() {
            if i >= self.dims[axis] {
                return Err(ViewError::OutOfRange {
                    index: i,
                    extent: self.dims[axis],
                });
            }
            pos += i * self.strides[axis];
        }
        Ok(pos)
    }

    fn flat_buffer_index(&self, flat: usize) -> Result<usize> {
        if let Some(lane) = self.flat_lane() {
            if flat >= lane.len {
                return Err(ViewError::OutOfRange {
                    index: flat,
                    extent: lane.len,
                });
            }
            return Ok(lane.index(flat));
        }
        let index = shape::unravel(flat, &self.dims)?;
        self.buffer_index(&index)
    }

    /// Element at a multi-index.
    pub fn get(&self, index: &[usize]) -> Result<f64> {
        let pos = self.buffer_index(index)?;
        Ok(self.buffer.with(|d| d[pos]))
    }

    /// Overwrite the element at a multi-index.
    pub fn set(&self, index: &[usize], value: f64) -> Result<()> {
        let pos = self.buffer_index(index)?;
        self.buffer.with_mut(|d| d[pos] = value);
        Ok(())
    }

    /// Element at a row-major flat index.
    pub fn at(&self, flat: usize) -> Result<f64> {
        let pos = self.flat_buffer_index(flat)?;
        Ok(self.buffer.with(|d| d[pos]))
    }

    /// Overwrite the element at a row-major flat index.
    pub fn set_at(&self, flat: usize, value: f64) -> Result<()> {
        let pos = self.flat_buffer_index(flat)?;
        self.buffer.with_mut(|d| d[pos] = value);
        Ok(())
    }

    /// Swap two elements of a 1-D view.
    pub fn swap(&self, i: usize, j: usize) -> Result<()> {
        let lane = self.lane_1d()?;
        for k in [i, j] {
            if k >= lane.len {
                return Err(ViewError::OutOfRange {
                    index: k,
                    extent: lane.len,
                });
            }
        }
        self.buffer
            .with_mut(|d| d.swap(lane.index(i), lane.index(j)));
        Ok(())
    }

    /// Reverse a 1-D view in place by swapping elements.
    pub fn reverse(&self) -> Result<()> {
        let lane = self.lane_1d()?;
        self.buffer.with_mut(|d| {
            let n = lane.len;
            for i in 0..n / 2 {
                d.swap(lane.index(i), lane.index(n - 1 - i));
            }
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Bulk access
    // ------------------------------------------------------------------------

    /// Set every element to `value`.
    pub fn fill(&self, value: f64) {
        let lanes = self.lanes();
        self.buffer.with_mut(|d| {
            for lane in &lanes {
                match lane.range() {
                    Some(r) => d[r].fill(value),
                    None => lane.indices().for_each(|i| d[i] = value),
                }
            }
        });
    }

    /// Elements in row-major order.
    pub fn to_vec(&self) -> Vec<f64> {
        let lanes = self.lanes();
        let mut out = Vec::with_capacity(self.len());
        self.buffer.with(|d| {
            for lane in &lanes {
                match lane.range() {
                    Some(r) => out.extend_from_slice(&d[r]),
                    None => out.extend(lane.indices().map(|i| d[i])),
                }
            }
        });
        out
    }

    /// Deep copy into a fresh dense buffer.
    pub fn copy(&self) -> NdView {
        let strides = row_major_strides(&self.dims);
        NdView::from_parts_unchecked(SharedBuffer::new(self.to_vec()), 0, &self.dims, &strides)
    }

    /// Overwrite this view with the elements of `src` (same shape).
    ///
    /// `src` is read completely before anything is written when both views share a
    /// buffer.
    pub fn assign(&self, src: &NdView) -> Result<()> {
        self.check_shape(src)?;
        let values = src.to_vec();
        let lanes = self.lanes();
        self.buffer.with_mut(|d| {
            let mut pos = 0;
            for lane in &lanes {
                let chunk = &values[pos..pos + lane.len];
                match lane.range() {
                    Some(r) => d[r].copy_from_slice(chunk),
                    None => {
                        for (i, &v) in lane.indices().zip(chunk) {
                            d[i] = v;
                        }
                    }
                }
                pos += lane.len;
            }
        });
        Ok(())
    }

    /// Copy this view's elements into `dst` (same shape).
    pub fn copy_to(&self, dst: &NdView) -> Result<()> {
        dst.assign(self)
    }

    /// Fail with [`ViewError::NonConformable`] unless both shapes are identical.
    pub fn check_shape(&self, other: &NdView) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(ViewError::NonConformable(
                self.shape().to_vec(),
                other.shape().to_vec(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Flat-buffer export
    // ------------------------------------------------------------------------

    /// Expose the contiguous buffer region of a dense view for serialization.
    pub fn to_flat_buffer(&self) -> Result<FlatBuffer> {
        if !self.is_dense() {
            return Err(ViewError::IllegalState(
                "cannot export a non-dense view; copy() it first",
            ));
        }
        Ok(FlatBuffer {
            buffer: self.buffer.clone(),
            offset: self.offset,
            len: self.len(),
            shape: self.dims.to_vec(),
        })
    }

    /// Wrap an exported or deserialized flat region as a dense view.
    pub fn from_flat_buffer(flat: FlatBuffer) -> Result<Self> {
        if shape::size(&flat.shape) != flat.len {
            return Err(ViewError::SizeMismatch {
                from: flat.len,
                to: shape::size(&flat.shape),
            });
        }
        let strides = row_major_strides(&flat.shape);
        NdView::wrap(flat.buffer, flat.offset, &flat.shape, &strides)
    }
}

/// A dense view's region: `len` contiguous elements of `buffer` starting at `offset`,
/// laid out row-major with `shape`.
#[derive(Clone, Debug)]
pub struct FlatBuffer {
    pub buffer: SharedBuffer,
    pub offset: usize,
    pub len: usize,
    pub shape: Vec<usize>,
}

impl FlatBuffer {
    pub fn to_vec(&self) -> Vec<f64> {
        // an empty region's offset is never bounds-checked
        if self.len == 0 {
            return Vec::new();
        }
        self.buffer
            .with(|d| d[self.offset..self.offset + self.len].to_vec())
    }
}

impl PartialEq for NdView {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.to_vec() == other.to_vec()
    }
}

impl fmt::Debug for NdView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NdView")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for NdView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn nested(
            f: &mut fmt::Formatter<'_>,
            values: &[f64],
            dims: &[usize],
        ) -> fmt::Result {
            write!(f, "[")?;
            if dims.len() == 1 {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
            } else {
                let step = values.len() / dims[0].max(1);
                for i in 0..dims[0] {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    nested(f, &values[i * step..(i + 1) * step], &dims[1..])?;
                }
            }
            write!(f, "]")
        }
        nested(f, &self.to_vec(), &self.dims)
    }
}

// ============================================================================
// Tests
// ============================================================================
