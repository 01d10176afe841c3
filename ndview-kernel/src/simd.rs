//! The accelerated backend, built on `pulp` runtime SIMD dispatch.
//!
//! Only arithmetic with an exact vector equivalent is handled: `+ - * /` (elementwise
//! and by scalar), negation, `sum` and `dot`. Transcendental functions, log-space ops,
//! extrema and prefix sums are declined and run on the scalar path.
//!
//! `sum` and `dot` feed the same balanced fold as the scalar kernels, group for group,
//! so their results are bit-identical to [`pairwise_sum`](crate::summation::pairwise_sum)
//! and [`pairwise_dot`](crate::summation::pairwise_dot).

use crate::dispatch::AccelBackend;

/// Name of the compiled-in backend if this CPU can run it.
pub(crate) fn detect() -> Option<&'static str> {
    #[cfg(feature = "simd")]
    {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("avx2") {
                return Some("pulp/avx2");
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                return Some("pulp/neon");
            }
        }
    }
    None
}

/// The backend used by [`Dispatcher::current`](crate::Dispatcher::current).
pub(crate) fn default_backend() -> Option<&'static dyn AccelBackend> {
    #[cfg(feature = "simd")]
    {
        static BACKEND: simd_impls::SimdBackend = simd_impls::SimdBackend;
        Some(&BACKEND)
    }
    #[cfg(not(feature = "simd"))]
    {
        None
    }
}

#[cfg(feature = "simd")]
pub use simd_impls::SimdBackend;

#[cfg(feature = "simd")]
mod simd_impls {
    use crate::dispatch::{AccelBackend, BinaryOp, UnaryOp};
    use crate::summation::{unaligned_tail, BalancedStack};
    use pulp::{Simd, WithSimd};

    /// Vectorized dense kernels for `f64`.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SimdBackend;

    #[inline(always)]
    fn zip_assign<S: Simd>(
        dst: &mut [f64],
        src: &[f64],
        vec_op: impl Fn(S::f64s, S::f64s) -> S::f64s,
        op: impl Fn(f64, f64) -> f64,
    ) {
        let (d_head, d_tail) = S::as_mut_simd_f64s(dst);
        let (s_head, s_tail) = S::as_simd_f64s(src);
        debug_assert_eq!(d_head.len(), s_head.len());
        for (x, &y) in d_head.iter_mut().zip(s_head.iter()) {
            *x = vec_op(*x, y);
        }
        for (x, &y) in d_tail.iter_mut().zip(s_tail.iter()) {
            *x = op(*x, y);
        }
    }

    #[inline(always)]
    fn map_assign<S: Simd>(
        dst: &mut [f64],
        vec_op: impl Fn(S::f64s) -> S::f64s,
        op: impl Fn(f64) -> f64,
    ) {
        let (head, tail) = S::as_mut_simd_f64s(dst);
        for x in head.iter_mut() {
            *x = vec_op(*x);
        }
        for x in tail.iter_mut() {
            *x = op(*x);
        }
    }

    struct Binary<'a> {
        op: BinaryOp,
        dst: &'a mut [f64],
        src: &'a [f64],
    }

    impl WithSimd for Binary<'_> {
        type Output = ();

        #[inline(always)]
        fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
            let Binary { op, dst, src } = self;
            match op {
                BinaryOp::Add => {
                    zip_assign::<S>(dst, src, |a, b| simd.add_f64s(a, b), |a, b| a + b)
                }
                BinaryOp::Sub => {
                    zip_assign::<S>(dst, src, |a, b| simd.sub_f64s(a, b), |a, b| a - b)
                }
                BinaryOp::Mul => {
                    zip_assign::<S>(dst, src, |a, b| simd.mul_f64s(a, b), |a, b| a * b)
                }
                BinaryOp::Div => {
                    zip_assign::<S>(dst, src, |a, b| simd.div_f64s(a, b), |a, b| a / b)
                }
                BinaryOp::LogAddExp => {
                    for (x, &y) in dst.iter_mut().zip(src.iter()) {
                        *x = op.apply(*x, y);
                    }
                }
            }
        }
    }

    struct Scalar<'a> {
        op: BinaryOp,
        dst: &'a mut [f64],
        value: f64,
    }

    impl WithSimd for Scalar<'_> {
        type Output = ();

        #[inline(always)]
        fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
            let Scalar { op, dst, value } = self;
            let v = simd.splat_f64s(value);
            match op {
                BinaryOp::Add => map_assign::<S>(dst, |a| simd.add_f64s(a, v), |a| a + value),
                BinaryOp::Sub => map_assign::<S>(dst, |a| simd.sub_f64s(a, v), |a| a - value),
                BinaryOp::Mul => map_assign::<S>(dst, |a| simd.mul_f64s(a, v), |a| a * value),
                BinaryOp::Div => map_assign::<S>(dst, |a| simd.div_f64s(a, v), |a| a / value),
                BinaryOp::LogAddExp => dst.iter_mut().for_each(|a| *a = op.apply(*a, value)),
            }
        }
    }

    /// Products for [`Dot`] are formed this many at a time before folding.
    const DOT_CHUNK: usize = 256;

    struct Sum<'a>(&'a [f64]);

    impl WithSimd for Sum<'_> {
        type Output = f64;

        #[inline(always)]
        fn with_simd<S: Simd>(self, _simd: S) -> Self::Output {
            let values = self.0;
            let mut stack = BalancedStack::new();
            for g in values.chunks_exact(4) {
                stack.push_group(g);
            }
            stack.finish() + unaligned_tail(values.len(), |i| values[i])
        }
    }

    struct Dot<'a> {
        a: &'a [f64],
        b: &'a [f64],
    }

    impl WithSimd for Dot<'_> {
        type Output = f64;

        #[inline(always)]
        fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
            let Dot { a, b } = self;
            let aligned = a.len() - a.len() % 4;

            // separate multiply and add: a fused multiply-add would round differently
            // from the scalar kernel
            let mut scratch = [0.0f64; DOT_CHUNK];
            let mut stack = BalancedStack::new();
            let chunks_a = a[..aligned].chunks(DOT_CHUNK);
            let chunks_b = b[..aligned].chunks(DOT_CHUNK);
            for (ca, cb) in chunks_a.zip(chunks_b) {
                let products = &mut scratch[..ca.len()];
                products.copy_from_slice(ca);
                zip_assign::<S>(products, cb, |x, y| simd.mul_f64s(x, y), |x, y| x * y);
                for g in products.chunks_exact(4) {
                    stack.push_group(g);
                }
            }
            stack.finish() + unaligned_tail(a.len(), |i| a[i] * b[i])
        }
    }

    impl AccelBackend for SimdBackend {
        fn name(&self) -> &'static str {
            "pulp"
        }

        fn try_unary(&self, op: UnaryOp, dst: &mut [f64]) -> bool {
            match op {
                UnaryOp::Neg => {
                    pulp::Arch::new().dispatch(Scalar {
                        op: BinaryOp::Mul,
                        dst,
                        value: -1.0,
                    });
                    true
                }
                UnaryOp::Exp | UnaryOp::Expm1 | UnaryOp::Ln | UnaryOp::Ln1p => false,
            }
        }

        fn try_scalar(&self, op: BinaryOp, dst: &mut [f64], value: f64) -> bool {
            if op == BinaryOp::LogAddExp {
                return false;
            }
            pulp::Arch::new().dispatch(Scalar { op, dst, value });
            true
        }

        fn try_binary(&self, op: BinaryOp, dst: &mut [f64], src: &[f64]) -> bool {
            if op == BinaryOp::LogAddExp || dst.len() != src.len() {
                return false;
            }
            pulp::Arch::new().dispatch(Binary { op, dst, src });
            true
        }

        fn try_sum(&self, src: &[f64]) -> Option<f64> {
            Some(pulp::Arch::new().dispatch(Sum(src)))
        }

        fn try_dot(&self, a: &[f64], b: &[f64]) -> Option<f64> {
            if a.len() != b.len() {
                return None;
            }
            Some(pulp::Arch::new().dispatch(Dot { a, b }))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn data(n: usize, seed: f64) -> Vec<f64> {
            (0..n).map(|i| ((i as f64) * seed).sin() * 10.0).collect()
        }

        #[test]
        fn test_binary_matches_scalar_bitwise() {
            for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
                for n in [17, 64, 103] {
                    let a = data(n, 0.37);
                    let b: Vec<f64> = data(n, 1.13).iter().map(|x| x + 20.0).collect();
                    let mut got = a.clone();
                    assert!(SimdBackend.try_binary(op, &mut got, &b));
                    let expected: Vec<f64> =
                        a.iter().zip(&b).map(|(&x, &y)| op.apply(x, y)).collect();
                    assert_eq!(got, expected, "{op:?} n={n}");
                }
            }
        }

        #[test]
        fn test_scalar_and_neg() {
            let a = data(33, 0.71);
            let mut got = a.clone();
            assert!(SimdBackend.try_scalar(BinaryOp::Sub, &mut got, 2.5));
            let expected: Vec<f64> = a.iter().map(|x| x - 2.5).collect();
            assert_eq!(got, expected);

            let mut neg = a.clone();
            assert!(SimdBackend.try_unary(UnaryOp::Neg, &mut neg));
            let expected: Vec<f64> = a.iter().map(|x| -x).collect();
            assert_eq!(neg, expected);
        }

        #[test]
        fn test_declines_transcendentals() {
            let mut a = data(40, 0.5);
            let before = a.clone();
            assert!(!SimdBackend.try_unary(UnaryOp::Exp, &mut a));
            assert!(!SimdBackend.try_scalar(BinaryOp::LogAddExp, &mut a, 1.0));
            assert_eq!(a, before);
            assert!(SimdBackend.try_min(&a).is_none());
            assert!(SimdBackend.try_log_sum_exp(&a).is_none());
        }

        #[test]
        fn test_sum_and_dot_match_balanced_fold() {
            use crate::summation::{pairwise_dot, pairwise_sum};
            for n in [0, 3, 17, 1001, 4 * DOT_CHUNK + 6] {
                let a = data(n, 0.13);
                let b = data(n, 0.29);
                assert_eq!(
                    SimdBackend.try_sum(&a).unwrap(),
                    pairwise_sum(&a),
                    "n={n}"
                );
                assert_eq!(
                    SimdBackend.try_dot(&a, &b).unwrap(),
                    pairwise_dot(&a, &b),
                    "n={n}"
                );
            }
            let a = data(10, 0.5);
            assert!(SimdBackend.try_dot(&a, &a[1..]).is_none());
        }

        #[test]
        fn test_sum_of_inexact_terms() {
            let n = 1usize << 22;
            let tenths = vec![0.1; n];
            assert_eq!(SimdBackend.try_sum(&tenths).unwrap(), 0.1 * n as f64);
            let ones = vec![1.0; n];
            let dot = SimdBackend.try_dot(&tenths, &ones).unwrap();
            assert_eq!(dot, 0.1 * n as f64);
        }
    }
}
