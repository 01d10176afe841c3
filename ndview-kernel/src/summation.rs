//! Accuracy-preserving summation.
//!
//! - [`balanced_sum`] / [`balanced_dot`]: pairwise (tree) reduction in groups of four,
//!   rounding error grows as O(log n) rather than O(n)
//! - [`KahanSum`]: sequential compensated summation for running totals

use ndview_view::Lane;

/// Stack of partial sums for the balanced fold, fed one group sum at a time.
///
/// Pushing group `g` pops one entry per trailing set bit of `g`, so the entries always
/// cover power-of-two runs of groups in decreasing size.
pub(crate) struct BalancedStack {
    stack: [f64; 64],
    depth: usize,
    groups: usize,
}

impl BalancedStack {
    pub(crate) fn new() -> Self {
        Self {
            stack: [0.0; 64],
            depth: 0,
            groups: 0,
        }
    }

    #[inline(always)]
    pub(crate) fn push(&mut self, mut v: f64) {
        let mut bit = 1usize;
        while self.groups & bit != 0 {
            self.depth -= 1;
            v += self.stack[self.depth];
            bit <<= 1;
        }
        self.stack[self.depth] = v;
        self.depth += 1;
        self.groups += 1;
    }

    /// Adds four consecutive terms as one group.
    #[inline(always)]
    pub(crate) fn push_group(&mut self, g: &[f64]) {
        self.push((g[0] + g[1]) + (g[2] + g[3]));
    }

    pub(crate) fn finish(mut self) -> f64 {
        let mut acc = 0.0;
        while self.depth > 0 {
            self.depth -= 1;
            acc += self.stack[self.depth];
        }
        acc
    }
}

/// Sum of the `len % 4` trailing terms, accumulated from the end.
#[inline(always)]
pub(crate) fn unaligned_tail(len: usize, term: impl Fn(usize) -> f64) -> f64 {
    (len - len % 4..len).rev().fold(0.0, |acc, i| acc + term(i))
}

/// Balanced pairwise fold of `len` terms produced by `term`.
///
/// Terms are taken four at a time and each group sum goes through a [`BalancedStack`].
/// The `len % 4` leftover terms are accumulated separately, from the end, and added last.
#[inline(always)]
fn balanced_fold(len: usize, term: impl Fn(usize) -> f64) -> f64 {
    let unaligned = unaligned_tail(len, &term);
    let mut stack = BalancedStack::new();
    let mut i = 0usize;
    while i + 4 <= len {
        stack.push((term(i) + term(i + 1)) + (term(i + 2) + term(i + 3)));
        i += 4;
    }
    stack.finish() + unaligned
}

/// Balanced sum of the lane's elements.
pub fn balanced_sum(data: &[f64], lane: Lane) -> f64 {
    match lane.range() {
        Some(r) => pairwise_sum(&data[r]),
        None => balanced_fold(lane.len, |i| data[lane.index(i)]),
    }
}

/// Balanced sum of `Σ a[i] * b[i]` over two lanes of equal length.
pub fn balanced_dot(a: &[f64], a_lane: Lane, b: &[f64], b_lane: Lane) -> f64 {
    debug_assert_eq!(a_lane.len, b_lane.len);
    match (a_lane.range(), b_lane.range()) {
        (Some(ra), Some(rb)) => pairwise_dot(&a[ra], &b[rb]),
        _ => balanced_fold(a_lane.len, |i| a[a_lane.index(i)] * b[b_lane.index(i)]),
    }
}

/// Balanced sum of a contiguous slice.
pub fn pairwise_sum(values: &[f64]) -> f64 {
    balanced_fold(values.len(), |i| values[i])
}

/// Balanced dot product of two contiguous slices of equal length.
pub fn pairwise_dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    balanced_fold(a.len(), |i| a[i] * b[i])
}

/// Compensated (Kahan–Neumaier) running sum.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KahanSum {
    acc: f64,
    comp: f64,
}

impl KahanSum {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn feed(&mut self, x: f64) {
        let t = self.acc + x;
        if self.acc.abs() >= x.abs() {
            self.comp += (self.acc - t) + x;
        } else {
            self.comp += (x - t) + self.acc;
        }
        self.acc = t;
    }

    #[inline]
    pub fn result(&self) -> f64 {
        self.acc + self.comp
    }
}

impl std::ops::AddAssign<f64> for KahanSum {
    #[inline]
    fn add_assign(&mut self, x: f64) {
        self.feed(x);
    }
}

impl Extend<f64> for KahanSum {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for x in iter {
            self.feed(x);
        }
    }
}

impl FromIterator<f64> for KahanSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = KahanSum::new();
        acc.extend(iter);
        acc
    }
}

/// Compensated sum of the lane's elements.
pub fn kahan_sum(data: &[f64], lane: Lane) -> f64 {
    lane.indices()
        .map(|i| data[i])
        .collect::<KahanSum>()
        .result()
}
