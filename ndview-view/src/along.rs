//! Iteration over the sub-views along one axis.

use crate::transform::Viewable;
use crate::view::NdView;
use crate::{Result, ViewError};

/// The sub-views of a view along one axis (rows or columns of a matrix, say).
///
/// Nothing is computed up front. Each call to [`iter`](Self::iter) starts a fresh pass,
/// and every yielded view shares the source buffer.
#[derive(Clone, Debug)]
pub struct Along {
    view: NdView,
    axis: usize,
}

impl Along {
    pub(crate) fn new(view: NdView, axis: usize) -> Result<Self> {
        let rank = view.ndim();
        if rank < 2 {
            return Err(ViewError::Unsupported(
                "along() needs at least two axes; the view is already flat",
            ));
        }
        if axis >= rank {
            return Err(ViewError::InvalidAxis { axis, rank });
        }
        Ok(Self { view, axis })
    }

    #[inline]
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// Number of sub-views.
    #[inline]
    pub fn len(&self) -> usize {
        self.view.shape()[self.axis]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> AlongIter<'_> {
        AlongIter {
            along: self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a Along {
    type Item = NdView;
    type IntoIter = AlongIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A single pass over an [`Along`].
#[derive(Clone, Debug)]
pub struct AlongIter<'a> {
    along: &'a Along,
    next: usize,
}

impl Iterator for AlongIter<'_> {
    type Item = NdView;

    fn next(&mut self) -> Option<NdView> {
        if self.next >= self.along.len() {
            return None;
        }
        let i = self.next;
        self.next += 1;
        // index and axis were validated when `Along` was built
        self.along.view.index_axis(i, self.along.axis).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.along.len() - self.next;
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for AlongIter<'_> {}
