//! Numeric kernels over [`NdView`]s: elementwise arithmetic, accuracy-preserving
//! reductions and in-place order statistics.
//!
//! Every operation decomposes its view(s) into [`Lane`]s and asks a [`Dispatcher`]
//! whether a lane may run on the accelerated backend. Dense lanes of more than
//! [`SPLIT_THRESHOLD`] elements are offered to the backend; everything else, and
//! everything the backend declines, runs on the scalar kernels.
//!
//! # Modules
//!
//! - [`dispatch`]: backend contract, capability flag, [`Dispatcher`]
//! - [`summation`]: balanced pairwise summation and [`KahanSum`]
//! - [`logspace`]: [`log_add_exp`], `log_sum_exp`
//! - [`ops_view`]: elementwise unary / scalar / binary operations, `cum_sum`, rescaling
//! - [`reduce_view`]: `sum`, `dot`, `mean`, `variance`, `sd`, extrema
//! - [`select`]: partition, quickselect, quantiles
//! - [`sort`]: `arg_sort`, `reorder`, `sort`, `shuffle`
//!
//! The free functions take an explicit `&Dispatcher`; the capability traits
//! ([`Reducible`], [`ElementwiseMutable`], [`OrderStatistics`]) use
//! [`Dispatcher::current`].
//!
//! # Example
//!
//! ```rust
//! use ndview_kernel::{reduce_view, Dispatcher, NdView, Reducible, Viewable};
//!
//! let m = NdView::from_fn(&[3, 4], |i| (i[0] * 4 + i[1]) as f64).unwrap();
//! let t = m.transpose();
//!
//! // same elements, different layout
//! assert_eq!(m.sum(), 66.0);
//! assert_eq!(reduce_view::sum(&Dispatcher::scalar(), &t), 66.0);
//! assert_eq!(t.arg_max().unwrap(), 11);
//! ```

pub mod dispatch;
mod kernel;
pub mod logspace;
pub mod ops_view;
pub mod reduce_view;
pub mod select;
pub mod simd;
pub mod sort;
pub mod summation;
mod traits;

pub use ndview_view::{
    ravel, row_major_strides, unravel, Along, FlatBuffer, Lane, NdView, Result, SharedBuffer,
    StorageKind, ViewError, Viewable, SPLIT_THRESHOLD,
};

pub use dispatch::{
    acceleration_enabled, disable_acceleration, enable_acceleration, AccelBackend, AccelConfig,
    BinaryOp, Dispatcher, UnaryOp, ACCELERATION_ENV,
};
pub use logspace::log_add_exp;
#[cfg(feature = "simd")]
pub use simd::SimdBackend;
pub use summation::KahanSum;
pub use traits::{ElementwiseMutable, OrderStatistics, Reducible};
