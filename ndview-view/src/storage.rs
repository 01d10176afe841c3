//! Storage specialization: dense/strided classification and lane decomposition.
//!
//! Every numeric operation runs over 1-D [`Lane`]s. A dense view is a single lane; any
//! other view is split into one lane per last-axis row. Each lane carries a
//! [`StorageKind`] which decides whether an accelerated kernel may run on it.

use std::ops::Range;

/// Lanes of at most this many elements always take the scalar path.
pub const SPLIT_THRESHOLD: usize = 16;

/// Execution flavour of a view or lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Contiguous, at most [`SPLIT_THRESHOLD`] elements.
    SmallDense,
    /// Contiguous, more than [`SPLIT_THRESHOLD`] elements. Eligible for acceleration.
    LargeDense,
    /// Elements are not contiguous.
    Strided,
}

impl StorageKind {
    #[inline]
    pub fn classify(dense: bool, size: usize) -> Self {
        match (dense, size > SPLIT_THRESHOLD) {
            (false, _) => StorageKind::Strided,
            (true, false) => StorageKind::SmallDense,
            (true, true) => StorageKind::LargeDense,
        }
    }

    #[inline]
    pub fn is_dense(self) -> bool {
        !matches!(self, StorageKind::Strided)
    }
}

/// A 1-D run of `len` elements starting at `offset`, `stride` elements apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lane {
    pub offset: usize,
    pub len: usize,
    pub stride: usize,
}

impl Lane {
    #[inline]
    pub fn new(offset: usize, len: usize, stride: usize) -> Self {
        Self {
            offset,
            len,
            stride,
        }
    }

    #[inline]
    pub fn kind(&self) -> StorageKind {
        StorageKind::classify(self.stride == 1 || self.len <= 1, self.len)
    }

    /// Buffer index of the `i`-th lane element.
    #[inline]
    pub fn index(&self, i: usize) -> usize {
        self.offset + i * self.stride
    }

    /// Buffer range of a dense lane.
    #[inline]
    pub fn range(&self) -> Option<Range<usize>> {
        self.kind()
            .is_dense()
            .then(|| self.offset..self.offset + self.len)
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).map(move |i| self.index(i))
    }

    /// Sub-lane of elements `[from, to)`.
    #[inline]
    pub fn sub(&self, from: usize, to: usize) -> Lane {
        debug_assert!(from <= to && to <= self.len);
        Lane::new(self.index(from), to - from, self.stride)
    }
}

/// Decompose a view into its last-axis rows, in row-major order.
pub fn row_lanes(dims: &[usize], strides: &[usize], offset: usize) -> Vec<Lane> {
    let rank = dims.len();
    if rank == 0 || dims.iter().any(|&d| d == 0) {
        return Vec::new();
    }
    let len = dims[rank - 1];
    let stride = strides[rank - 1];
    let outer = rank - 1;
    let count: usize = dims[..outer].iter().product();

    let mut lanes = Vec::with_capacity(count);
    let mut idx = vec![0usize; outer];
    let mut base = offset;
    for _ in 0..count {
        lanes.push(Lane::new(base, len, stride));
        for d in (0..outer).rev() {
            idx[d] += 1;
            base += strides[d];
            if idx[d] < dims[d] {
                break;
            }
            base -= strides[d] * dims[d];
            idx[d] = 0;
        }
    }
    lanes
}
