//! Acceleration dispatch.
//!
//! Every kernel asks a [`Dispatcher`] for a backend before touching a lane:
//!
//! 1. acceleration disabled → scalar fallback
//! 2. [`StorageKind::SmallDense`] → scalar fallback
//! 3. [`StorageKind::LargeDense`] → the backend, falling back when it declines
//! 4. [`StorageKind::Strided`] → scalar fallback over the strided indices
//!
//! The process-wide capability flag is probed lazily on first use and can be forced
//! with [`enable_acceleration`] / [`disable_acceleration`]. Tests that must not touch
//! process state build their own `Dispatcher` instead.

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU8, Ordering};

use ndview_view::{Lane, StorageKind};

use crate::logspace::log_add_exp;
use crate::simd;

/// Environment variable read by the capability probe. `0`, `false`, `off` and `no`
/// disable acceleration.
pub const ACCELERATION_ENV: &str = "NDVIEW_ACCELERATION";

// ============================================================================
// Operations
// ============================================================================

/// Elementwise unary operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Exp,
    Expm1,
    Ln,
    Ln1p,
    Neg,
}

impl UnaryOp {
    #[inline(always)]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryOp::Exp => x.exp(),
            UnaryOp::Expm1 => x.exp_m1(),
            UnaryOp::Ln => x.ln(),
            UnaryOp::Ln1p => x.ln_1p(),
            UnaryOp::Neg => -x,
        }
    }
}

/// Elementwise binary operations, applied as `dst = dst op rhs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    LogAddExp,
}

impl BinaryOp {
    #[inline(always)]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::LogAddExp => log_add_exp(a, b),
        }
    }
}

// ============================================================================
// Backend contract
// ============================================================================

/// An accelerated implementation of the dense kernels.
///
/// Each method receives contiguous slices and either computes the same result as the
/// scalar fallback (up to rounding for reductions) or reports "not handled" by
/// returning `false` / `None`. Every method defaults to "not handled". `try_sum` and
/// `try_dot` must follow the balanced fold term for term; `try_min` / `try_max` return
/// NaN when the slice holds one.
pub trait AccelBackend {
    fn name(&self) -> &'static str;

    fn try_unary(&self, _op: UnaryOp, _dst: &mut [f64]) -> bool {
        false
    }

    fn try_scalar(&self, _op: BinaryOp, _dst: &mut [f64], _value: f64) -> bool {
        false
    }

    fn try_binary(&self, _op: BinaryOp, _dst: &mut [f64], _src: &[f64]) -> bool {
        false
    }

    fn try_sum(&self, _src: &[f64]) -> Option<f64> {
        None
    }

    fn try_dot(&self, _a: &[f64], _b: &[f64]) -> Option<f64> {
        None
    }

    fn try_min(&self, _src: &[f64]) -> Option<f64> {
        None
    }

    fn try_max(&self, _src: &[f64]) -> Option<f64> {
        None
    }

    fn try_log_sum_exp(&self, _src: &[f64]) -> Option<f64> {
        None
    }

    fn try_cum_sum(&self, _dst: &mut [f64]) -> bool {
        false
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Acceleration settings of a [`Dispatcher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccelConfig {
    pub enabled: bool,
}

impl AccelConfig {
    pub const fn accelerated() -> Self {
        Self { enabled: true }
    }

    pub const fn scalar_only() -> Self {
        Self { enabled: false }
    }

    /// Read [`ACCELERATION_ENV`]; unset means enabled.
    pub fn from_env() -> Self {
        match std::env::var(ACCELERATION_ENV) {
            Ok(value) => Self {
                enabled: !is_off(&value),
            },
            Err(_) => Self::accelerated(),
        }
    }
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self::accelerated()
    }
}

fn is_off(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off" | "no"
    )
}

// ============================================================================
// Process-wide capability flag
// ============================================================================

const UNPROBED: u8 = 0;
const ON: u8 = 1;
const OFF: u8 = 2;

static ACCELERATION: AtomicU8 = AtomicU8::new(UNPROBED);

fn probe() -> bool {
    if !AccelConfig::from_env().enabled {
        tracing::info!("acceleration disabled by {ACCELERATION_ENV}");
        return false;
    }
    match simd::detect() {
        Some(backend) => {
            tracing::info!(backend, "acceleration enabled");
            true
        }
        None => {
            tracing::warn!("no accelerated backend available; using scalar kernels");
            false
        }
    }
}

/// Whether the process-wide dispatcher uses the accelerated backend.
pub fn acceleration_enabled() -> bool {
    match ACCELERATION.load(Ordering::Acquire) {
        UNPROBED => {
            let state = if probe() { ON } else { OFF };
            // a concurrent probe or override wins
            let _ = ACCELERATION.compare_exchange(
                UNPROBED,
                state,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            ACCELERATION.load(Ordering::Acquire) == ON
        }
        state => state == ON,
    }
}

/// Force acceleration on for every later [`Dispatcher::current`].
///
/// Has no effect on the executed path when no backend is compiled in.
pub fn enable_acceleration() {
    tracing::debug!("acceleration forced on");
    ACCELERATION.store(ON, Ordering::Release);
}

/// Force the scalar path for every later [`Dispatcher::current`].
pub fn disable_acceleration() {
    tracing::debug!("acceleration forced off");
    ACCELERATION.store(OFF, Ordering::Release);
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes lanes to an accelerated backend or to the scalar fallback.
#[derive(Clone, Copy)]
pub struct Dispatcher<'b> {
    config: AccelConfig,
    backend: Option<&'b dyn AccelBackend>,
}

impl<'b> Dispatcher<'b> {
    pub fn new(config: AccelConfig, backend: Option<&'b dyn AccelBackend>) -> Self {
        Self { config, backend }
    }

    /// A dispatcher that never accelerates.
    pub fn scalar() -> Dispatcher<'static> {
        Dispatcher::new(AccelConfig::scalar_only(), None)
    }

    /// The process-wide dispatcher: the compiled-in backend behind the capability flag.
    pub fn current() -> Dispatcher<'static> {
        let config = AccelConfig {
            enabled: acceleration_enabled(),
        };
        Dispatcher::new(config, simd::default_backend())
    }

    #[inline]
    pub fn config(&self) -> AccelConfig {
        self.config
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.map(|b| b.name())
    }

    /// Backend eligible for a lane of the given kind, if any.
    #[inline]
    pub fn route(&self, kind: StorageKind) -> Option<&'b dyn AccelBackend> {
        if !self.config.enabled {
            return None;
        }
        match kind {
            StorageKind::LargeDense => self.backend,
            StorageKind::SmallDense | StorageKind::Strided => None,
        }
    }

    /// Backend eligible for a binary operation: both lanes must qualify.
    #[inline]
    pub fn route_pair(&self, a: StorageKind, b: StorageKind) -> Option<&'b dyn AccelBackend> {
        self.route(a).and(self.route(b))
    }

    /// Backend and buffer range for a lane that may be accelerated.
    #[inline]
    pub(crate) fn dense_backend(
        &self,
        lane: &Lane,
    ) -> Option<(&'b dyn AccelBackend, Range<usize>)> {
        let backend = self.route(lane.kind())?;
        lane.range().map(|r| (backend, r))
    }
}

impl fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("backend", &self.backend_name())
            .finish()
    }
}

/// Log a declined backend call at trace level.
#[inline]
pub(crate) fn declined(backend: &dyn AccelBackend, op: &'static str, len: usize) {
    tracing::trace!(backend = backend.name(), op, len, "backend declined; scalar fallback");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Declines;

    impl AccelBackend for Declines {
        fn name(&self) -> &'static str {
            "declines"
        }
    }

    #[test]
    fn test_op_apply() {
        assert_eq!(UnaryOp::Neg.apply(2.0), -2.0);
        assert_eq!(UnaryOp::Exp.apply(0.0), 1.0);
        assert_eq!(UnaryOp::Ln.apply(1.0), 0.0);
        assert_eq!(BinaryOp::Div.apply(3.0, 2.0), 1.5);
        assert_eq!(BinaryOp::LogAddExp.apply(f64::NEG_INFINITY, 2.0), 2.0);
    }

    #[test]
    fn test_route_by_kind() {
        let backend = Declines;
        let d = Dispatcher::new(AccelConfig::accelerated(), Some(&backend));
        assert!(d.route(StorageKind::LargeDense).is_some());
        assert!(d.route(StorageKind::SmallDense).is_none());
        assert!(d.route(StorageKind::Strided).is_none());
        assert!(d
            .route_pair(StorageKind::LargeDense, StorageKind::LargeDense)
            .is_some());
        assert!(d
            .route_pair(StorageKind::LargeDense, StorageKind::Strided)
            .is_none());
    }

    #[test]
    fn test_disabled_config_never_routes() {
        let backend = Declines;
        let d = Dispatcher::new(AccelConfig::scalar_only(), Some(&backend));
        assert!(d.route(StorageKind::LargeDense).is_none());
        assert!(Dispatcher::scalar().route(StorageKind::LargeDense).is_none());
    }

    #[test]
    fn test_dense_backend_needs_range() {
        let backend = Declines;
        let d = Dispatcher::new(AccelConfig::accelerated(), Some(&backend));
        let (_, r) = d.dense_backend(&Lane::new(4, 32, 1)).unwrap();
        assert_eq!(r, 4..36);
        assert!(d.dense_backend(&Lane::new(4, 32, 2)).is_none());
        assert!(d.dense_backend(&Lane::new(4, 8, 1)).is_none());
    }

    #[test]
    fn test_is_off() {
        assert!(is_off("0"));
        assert!(is_off(" OFF "));
        assert!(is_off("false"));
        assert!(!is_off("1"));
        assert!(!is_off(""));
    }

    #[test]
    fn test_debug_names_backend() {
        let backend = Declines;
        let d = Dispatcher::new(AccelConfig::accelerated(), Some(&backend));
        assert!(format!("{d:?}").contains("declines"));
    }
}
