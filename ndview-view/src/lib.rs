//! Shared-buffer strided views over `f64` data.
//!
//! This crate provides the data model of the `ndview` workspace:
//!
//! - [`SharedBuffer`]: a fixed-length `f64` buffer shared by every view built over it
//! - [`NdView`]: the `(buffer, offset, shape, strides)` tuple plus its [`StorageKind`] tag
//! - [`Viewable`]: O(1) view transformations (slice, reshape, transpose, flatten, along)
//! - [`shape`]: pure row-major shape/stride arithmetic ([`ravel`], [`unravel`])
//! - [`storage`]: the dense/strided classification and [`Lane`] decomposition used for dispatch
//!
//! # Example
//!
//! ```rust
//! use ndview_view::{NdView, Viewable};
//!
//! let m = NdView::from_vec((0..6).map(|x| x as f64).collect(), &[2, 3]).unwrap();
//! let t = m.transpose();
//! assert_eq!(t.shape(), &[3, 2]);
//! assert_eq!(t.get(&[2, 1]).unwrap(), 5.0);
//!
//! // Views alias: writes through one are visible through the other.
//! t.set(&[0, 0], 42.0).unwrap();
//! assert_eq!(m.get(&[0, 0]).unwrap(), 42.0);
//! ```
//!
//! Views are deliberately `!Send`: the backing buffer is an `Rc<RefCell<_>>`, so a buffer
//! and all of its views live on one thread.

mod along;
mod buffer;
mod construct;
pub mod shape;
pub mod storage;
mod transform;
pub mod view;

pub use along::{Along, AlongIter};
pub use buffer::SharedBuffer;
pub use shape::{is_row_major_contiguous, ravel, row_major_strides, unravel};
pub use storage::{row_lanes, Lane, StorageKind, SPLIT_THRESHOLD};
pub use transform::Viewable;
pub use view::{FlatBuffer, NdView};

/// Errors raised by view construction and the operations built on views.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewError {
    /// An index, slice bound or buffer bound lies outside its valid range.
    #[error("index {index} out of range for extent {extent}")]
    OutOfRange { index: usize, extent: usize },

    /// Invalid axis number for the given rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Malformed parameters.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operand shapes differ in a binary operation.
    #[error("non-conformable shapes: {0:?} vs {1:?}")]
    NonConformable(Vec<usize>, Vec<usize>),

    /// Reshape target holds a different number of elements.
    #[error("size mismatch: cannot reshape {from} elements into {to}")]
    SizeMismatch { from: usize, to: usize },

    /// The operation is not defined for this view flavour.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// A structural precondition of the view does not hold.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;
