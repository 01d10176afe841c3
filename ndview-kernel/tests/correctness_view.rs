use std::cell::RefCell;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndview_kernel::logspace::log_sum_exp;
use ndview_kernel::summation::{kahan_sum, pairwise_sum};
use ndview_kernel::{
    disable_acceleration, enable_acceleration, ops_view, reduce_view, select, AccelBackend,
    AccelConfig, BinaryOp, Dispatcher, KahanSum, Lane, NdView, StorageKind, UnaryOp, Viewable,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};

fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

/// Records every call; computes the scalar result when `handles` is set.
struct Counting {
    handles: bool,
    calls: RefCell<Vec<(&'static str, usize)>>,
}

impl Counting {
    fn new(handles: bool) -> Self {
        Self {
            handles,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn record(&self, op: &'static str, len: usize) -> bool {
        self.calls.borrow_mut().push((op, len));
        self.handles
    }

    fn count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn ops(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(|&(op, _)| op).collect()
    }
}

impl AccelBackend for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn try_unary(&self, op: UnaryOp, dst: &mut [f64]) -> bool {
        if !self.record("unary", dst.len()) {
            return false;
        }
        dst.iter_mut().for_each(|x| *x = op.apply(*x));
        true
    }

    fn try_scalar(&self, op: BinaryOp, dst: &mut [f64], value: f64) -> bool {
        if !self.record("scalar", dst.len()) {
            return false;
        }
        dst.iter_mut().for_each(|x| *x = op.apply(*x, value));
        true
    }

    fn try_binary(&self, op: BinaryOp, dst: &mut [f64], src: &[f64]) -> bool {
        if !self.record("binary", dst.len()) {
            return false;
        }
        for (x, &y) in dst.iter_mut().zip(src) {
            *x = op.apply(*x, y);
        }
        true
    }

    fn try_sum(&self, src: &[f64]) -> Option<f64> {
        self.record("sum", src.len())
            .then(|| src.iter().copied().collect::<KahanSum>().result())
    }

    fn try_dot(&self, a: &[f64], b: &[f64]) -> Option<f64> {
        self.record("dot", a.len())
            .then(|| a.iter().zip(b).map(|(x, y)| x * y).collect::<KahanSum>().result())
    }

    fn try_min(&self, src: &[f64]) -> Option<f64> {
        self.record("min", src.len())
            .then(|| src.iter().copied().fold(f64::INFINITY, nan_min))
    }

    fn try_max(&self, src: &[f64]) -> Option<f64> {
        self.record("max", src.len())
            .then(|| src.iter().copied().fold(f64::NEG_INFINITY, nan_max))
    }

    fn try_log_sum_exp(&self, src: &[f64]) -> Option<f64> {
        self.record("log_sum_exp", src.len())
            .then(|| log_sum_exp(src))
    }

    fn try_cum_sum(&self, dst: &mut [f64]) -> bool {
        if !self.record("cum_sum", dst.len()) {
            return false;
        }
        let mut acc = KahanSum::new();
        for x in dst.iter_mut() {
            acc += *x;
            *x = acc.result();
        }
        true
    }
}

fn arange(n: usize) -> NdView {
    NdView::of(&(0..n).map(|x| x as f64 * 0.5 - 3.0).collect::<Vec<_>>())
}

fn random_view(shape: &[usize], seed: u64) -> NdView {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::new(-10.0, 10.0);
    NdView::from_fn(shape, |_| dist.sample(&mut rng)).unwrap()
}

// ============================================================================
// Routing
// ============================================================================

#[test]
fn test_large_dense_goes_to_backend() {
    let backend = Counting::new(true);
    let d = Dispatcher::new(AccelConfig::accelerated(), Some(&backend));
    let v = arange(32);
    assert_eq!(v.kind(), StorageKind::LargeDense);

    ops_view::scalar_assign(&d, &v, BinaryOp::Mul, 2.0);
    let s = reduce_view::sum(&d, &v);
    assert_eq!(backend.ops(), vec!["scalar", "sum"]);
    assert_eq!(backend.calls.borrow()[0].1, 32);
    assert_eq!(s, (0..32).map(|x| x as f64 - 6.0).sum::<f64>());
}

#[test]
fn test_small_dense_stays_scalar() {
    let backend = Counting::new(true);
    let d = Dispatcher::new(AccelConfig::accelerated(), Some(&backend));
    let v = arange(16);
    assert_eq!(v.kind(), StorageKind::SmallDense);
    ops_view::unary_assign(&d, &v, UnaryOp::Neg);
    reduce_view::sum(&d, &v);
    reduce_view::min(&d, &v).unwrap();
    assert_eq!(backend.count(), 0);
    assert_eq!(v.at(0).unwrap(), 3.0);
}

#[test]
fn test_strided_stays_scalar() {
    let backend = Counting::new(true);
    let d = Dispatcher::new(AccelConfig::accelerated(), Some(&backend));
    let base = arange(80);
    let every_other = base.slice(0, 80, 2, 0).unwrap();
    assert_eq!(every_other.kind(), StorageKind::Strided);

    ops_view::scalar_assign(&d, &every_other, BinaryOp::Add, 100.0);
    let m = reduce_view::max(&d, &every_other).unwrap();
    assert_eq!(backend.count(), 0);
    assert_eq!(m, 100.0 + 78.0 * 0.5 - 3.0);
    // untouched odd elements
    assert_eq!(base.at(1).unwrap(), -2.5);
}

#[test]
fn test_disabled_config_stays_scalar() {
    let backend = Counting::new(true);
    let d = Dispatcher::new(AccelConfig::scalar_only(), Some(&backend));
    let v = arange(64);
    ops_view::unary_assign(&d, &v, UnaryOp::Exp);
    reduce_view::dot(&d, &v, &v).unwrap();
    assert_eq!(backend.count(), 0);
}

#[test]
fn test_declined_falls_back_silently() {
    let backend = Counting::new(false);
    let declining = Dispatcher::new(AccelConfig::accelerated(), Some(&backend));
    let scalar = Dispatcher::scalar();

    let a = arange(50);
    let b = arange(50);
    ops_view::unary_assign(&declining, &a, UnaryOp::Expm1);
    ops_view::unary_assign(&scalar, &b, UnaryOp::Expm1);
    assert_eq!(a, b);

    ops_view::cum_sum(&declining, &a).unwrap();
    ops_view::cum_sum(&scalar, &b).unwrap();
    assert_eq!(a, b);

    assert_eq!(
        reduce_view::log_sum_exp(&declining, &a),
        reduce_view::log_sum_exp(&scalar, &b)
    );
    assert_eq!(backend.ops(), vec!["unary", "cum_sum", "log_sum_exp"]);
}

#[test]
fn test_binary_needs_both_lanes_eligible() {
    let backend = Counting::new(true);
    let d = Dispatcher::new(AccelConfig::accelerated(), Some(&backend));
    let a = arange(40);
    let b = arange(40).copy();
    ops_view::binary_assign(&d, &a, &b, BinaryOp::Sub).unwrap();
    assert_eq!(backend.ops(), vec!["binary"]);
    assert!(a.to_vec().iter().all(|&x| x == 0.0));

    let wide = arange(80);
    let strided = wide.slice(1, 80, 2, 0).unwrap();
    ops_view::binary_assign(&d, &a, &strided, BinaryOp::Add).unwrap();
    assert_eq!(backend.count(), 1);
    assert_eq!(a.at(3).unwrap(), strided.at(3).unwrap());
}

#[test]
fn test_row_lanes_of_column_block_are_dispatched() {
    let backend = Counting::new(true);
    let d = Dispatcher::new(AccelConfig::accelerated(), Some(&backend));
    let m = NdView::from_fn(&[10, 40], |i| (i[0] * 40 + i[1]) as f64).unwrap();
    // each row of the block is a contiguous run of 20
    let block = m.slice(5, 25, 1, 1).unwrap();
    assert_eq!(block.kind(), StorageKind::Strided);

    ops_view::scalar_assign(&d, &block, BinaryOp::Mul, 0.0);
    assert_eq!(backend.count(), 10);
    assert!(backend.calls.borrow().iter().all(|&(_, len)| len == 20));
    assert_eq!(m.get(&[3, 4]).unwrap(), 124.0);
    assert_eq!(m.get(&[3, 5]).unwrap(), 0.0);

    // transposed rows have stride 40: none qualify
    let before = backend.count();
    reduce_view::sum(&d, &m.transpose());
    assert_eq!(backend.count(), before);
}

#[test]
fn test_backend_extrema_and_dot() {
    let backend = Counting::new(true);
    let d = Dispatcher::new(AccelConfig::accelerated(), Some(&backend));
    let v = random_view(&[100], 4);
    let scalar = Dispatcher::scalar();
    assert_eq!(
        reduce_view::min(&d, &v).unwrap(),
        reduce_view::min(&scalar, &v).unwrap()
    );
    assert_eq!(
        reduce_view::max(&d, &v).unwrap(),
        reduce_view::max(&scalar, &v).unwrap()
    );
    assert_relative_eq!(
        reduce_view::dot(&d, &v, &v).unwrap(),
        reduce_view::dot(&scalar, &v, &v).unwrap(),
        epsilon = 1e-10
    );
    assert_eq!(backend.ops(), vec!["min", "max", "dot"]);
}

// ============================================================================
// Accelerated vs scalar agreement
// ============================================================================

#[cfg(feature = "simd")]
#[test]
fn test_simd_matches_scalar() {
    use ndview_kernel::SimdBackend;

    let simd = SimdBackend;
    let fast = Dispatcher::new(AccelConfig::accelerated(), Some(&simd));
    let scalar = Dispatcher::scalar();

    for shape in [vec![1001], vec![37, 53], vec![4, 5, 67]] {
        let a = random_view(&shape, 1);
        let b = random_view(&shape, 2);
        for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
            let x = ops_view::binary(&fast, &a, &b, op).unwrap();
            let y = ops_view::binary(&scalar, &a, &b, op).unwrap();
            assert_eq!(x, y, "{op:?} {shape:?}");
            assert_eq!(
                ops_view::scalar(&fast, &a, op, 1.75),
                ops_view::scalar(&scalar, &a, op, 1.75)
            );
        }
        assert_eq!(
            ops_view::unary(&fast, &a, UnaryOp::Neg),
            ops_view::unary(&scalar, &a, UnaryOp::Neg)
        );

        assert_eq!(
            reduce_view::sum(&fast, &a),
            reduce_view::sum(&scalar, &a)
        );
        assert_eq!(
            reduce_view::dot(&fast, &a, &b).unwrap(),
            reduce_view::dot(&scalar, &a, &b).unwrap()
        );

        // strided layout: same values through the scalar path of either dispatcher
        let scale = reduce_view::dot(&scalar, &a, &a).unwrap();
        let t = a.transpose();
        assert_abs_diff_eq!(
            reduce_view::sum(&fast, &t),
            reduce_view::sum(&scalar, &a),
            epsilon = 1e-9 * scale
        );
    }
}

#[cfg(feature = "simd")]
#[test]
fn test_simd_sum_keeps_balanced_accuracy() {
    use ndview_kernel::SimdBackend;

    let simd = SimdBackend;
    let fast = Dispatcher::new(AccelConfig::accelerated(), Some(&simd));
    let scalar = Dispatcher::scalar();

    let n = 1usize << 22;
    let tenths = NdView::full(&[n], 0.1).unwrap();
    let exact = 0.1 * n as f64;
    assert_eq!(reduce_view::sum(&fast, &tenths), exact);
    assert_eq!(reduce_view::sum(&scalar, &tenths), exact);
    let ones = NdView::full(&[n], 1.0).unwrap();
    assert_eq!(
        reduce_view::dot(&fast, &tenths, &ones).unwrap(),
        reduce_view::dot(&scalar, &tenths, &ones).unwrap()
    );

    // not a power of two: the remainder and the final stack drain both matter
    let m = n + 3;
    let fractions = NdView::full(&[m], 1.0 / m as f64).unwrap();
    let got = reduce_view::sum(&fast, &fractions);
    assert_eq!(got, reduce_view::sum(&scalar, &fractions));
    let bound = (m as f64).log2() * f64::EPSILON;
    assert!((got - 1.0).abs() <= bound, "err={}", (got - 1.0).abs());
}

#[test]
fn test_process_flag_overrides() {
    disable_acceleration();
    assert!(!Dispatcher::current().config().enabled);
    let v = arange(64);
    let total = reduce_view::sum(&Dispatcher::current(), &v);
    enable_acceleration();
    assert!(Dispatcher::current().config().enabled);
    assert_relative_eq!(reduce_view::sum(&Dispatcher::current(), &v), total, epsilon = 1e-12);
}

// ============================================================================
// Numerical properties
// ============================================================================

#[test]
fn test_balanced_and_kahan_agree_on_normal_samples() {
    let mut rng = StdRng::seed_from_u64(42);
    let normal = Normal::new(0.0, 1e3).unwrap();
    for n in [10usize, 1_000, 65_537] {
        let values: Vec<f64> = (0..n).map(|_| rng.sample(normal)).collect();
        let scale: f64 = values.iter().map(|x| x.abs()).sum();
        let lane = Lane::new(0, n, 1);
        assert_abs_diff_eq!(
            pairwise_sum(&values),
            kahan_sum(&values, lane),
            epsilon = scale * 1e-14
        );
    }
}

#[test]
fn test_reciprocal_sums_to_one() {
    let d = Dispatcher::scalar();
    for n in [7usize, 100, 12_345] {
        let v = NdView::full(&[n], 1.0 / n as f64).unwrap();
        assert_relative_eq!(reduce_view::sum(&d, &v), 1.0, epsilon = 1e-13);
    }
}

#[test]
fn test_regression_statistics() {
    let d = Dispatcher::current();
    let v = NdView::of(&[
        1.5409738, 2.6926526, 0.8159389, 2.5009070, 3.2777667, 1.5157005, 0.9984120,
        2.3274278, 1.7286019, 0.9756442,
    ]);
    assert_abs_diff_eq!(reduce_view::sum(&d, &v), 18.37403, epsilon = 1e-5);
    assert_abs_diff_eq!(reduce_view::mean(&d, &v), 1.837403, epsilon = 1e-6);
    assert_abs_diff_eq!(reduce_view::sd(&d, &v).unwrap(), 0.8286257, epsilon = 1e-6);
}

#[test]
fn test_log_rescale_normalizes() {
    let d = Dispatcher::scalar();
    let mut rng = StdRng::seed_from_u64(3);
    let v = NdView::from_fn(&[200], |_| rng.gen_range(-50.0..50.0)).unwrap();
    ops_view::log_rescale(&d, &v);
    assert_abs_diff_eq!(reduce_view::log_sum_exp(&d, &v).exp(), 1.0, epsilon = 1e-8);
}

#[test]
fn test_quantile_bounds_on_random_data() {
    let mut rng = StdRng::seed_from_u64(8);
    let d = Dispatcher::scalar();
    let v = random_view(&[501], 8);
    let lo = reduce_view::min(&d, &v).unwrap();
    let hi = reduce_view::max(&d, &v).unwrap();
    assert_eq!(select::quantile_with(&v, 0.0, &mut rng).unwrap(), lo);
    assert_eq!(select::quantile_with(&v, 1.0, &mut rng).unwrap(), hi);

    let mut sorted = v.to_vec();
    sorted.sort_by(f64::total_cmp);
    // pos = 502 * 0.5 = 251 -> the 251st smallest
    assert_eq!(select::quantile_with(&v, 0.5, &mut rng).unwrap(), sorted[250]);
}
