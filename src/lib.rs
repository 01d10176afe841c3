//! Dense/strided N-dimensional `f64` arrays.
//!
//! `ndview` provides NumPy-like views over shared buffers together with numerically
//! careful kernels:
//!
//! - [`NdView`]: `(buffer, offset, shape, strides)`; slicing, reshaping, transposing and
//!   [`along`](Viewable::along) are O(1) and share the buffer
//! - elementwise arithmetic ([`ElementwiseMutable`]), reductions ([`Reducible`]) and
//!   in-place order statistics ([`OrderStatistics`])
//! - balanced pairwise and Kahan summation, log-space arithmetic
//! - an optional SIMD backend (`simd` feature) behind a [`Dispatcher`], with a scalar
//!   fallback for small, strided and unsupported cases
//!
//! # Example
//!
//! ```rust
//! use ndview::prelude::*;
//!
//! let m = NdView::from_fn(&[2, 3], |i| (i[0] * 3 + i[1]) as f64).unwrap();
//! let col = m.slice(1, 2, 1, 1).unwrap(); // shape [2, 1], shares m's buffer
//! col.mul_scalar_assign(10.0);
//! assert_eq!(m.to_vec(), vec![0.0, 10.0, 2.0, 3.0, 40.0, 5.0]);
//!
//! assert_eq!(m.sum(), 60.0);
//! assert_eq!(m.arg_max().unwrap(), 4);
//!
//! let v = m.flatten().unwrap().copy();
//! v.sort(false).unwrap();
//! assert_eq!(v.to_vec(), vec![0.0, 2.0, 3.0, 5.0, 10.0, 40.0]);
//! ```
//!
//! # Acceleration
//!
//! [`Dispatcher::current`] consults a process-wide flag probed on first use: the `simd`
//! feature must be enabled, the CPU must support the backend, and the
//! `NDVIEW_ACCELERATION` environment variable must not be `0`/`false`/`off`/`no`.
//! [`enable_acceleration`] and [`disable_acceleration`] override the probe. Functions in
//! [`ops_view`], [`reduce_view`], [`select`] and [`sort`] accept an explicit dispatcher.

pub use ndview_kernel::{
    dispatch, logspace, ops_view, reduce_view, select, simd, sort, summation,
};
pub use ndview_view::{shape, storage, view};

pub use ndview_kernel::{
    acceleration_enabled, disable_acceleration, enable_acceleration, log_add_exp, AccelBackend,
    AccelConfig, BinaryOp, Dispatcher, ElementwiseMutable, KahanSum, OrderStatistics,
    Reducible, UnaryOp, ACCELERATION_ENV,
};
#[cfg(feature = "simd")]
pub use ndview_kernel::SimdBackend;
pub use ndview_view::{
    is_row_major_contiguous, ravel, row_lanes, row_major_strides, unravel, Along, AlongIter,
    FlatBuffer, Lane, NdView, Result, SharedBuffer, StorageKind, ViewError, Viewable,
    SPLIT_THRESHOLD,
};

/// The view type and every capability trait.
pub mod prelude {
    pub use crate::{
        Dispatcher, ElementwiseMutable, NdView, OrderStatistics, Reducible, ViewError,
        Viewable,
    };
}
