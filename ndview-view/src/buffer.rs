//! The backing storage shared by views.

use std::cell::RefCell;
use std::rc::Rc;

/// Fixed-length `f64` buffer with shared ownership.
///
/// Cloning the handle does not copy the data. Every [`NdView`](crate::NdView) built over
/// a buffer holds a clone, so the storage lives as long as its longest-lived view.
///
/// Mutation goes through [`with_mut`](Self::with_mut). Calling `with_mut` on a buffer from
/// inside a `with`/`with_mut` closure on the *same* buffer panics.
#[derive(Clone)]
pub struct SharedBuffer(Rc<RefCell<Box<[f64]>>>);

impl SharedBuffer {
    pub fn new(data: Vec<f64>) -> Self {
        Self(Rc::new(RefCell::new(data.into_boxed_slice())))
    }

    pub fn zeros(len: usize) -> Self {
        Self::new(vec![0.0; len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles refer to the same storage.
    #[inline]
    pub fn ptr_eq(&self, other: &SharedBuffer) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this storage.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Run `f` with read access to the whole buffer.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&[f64]) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Run `f` with write access to the whole buffer.
    #[inline]
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut [f64]) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    /// Copy of the whole buffer.
    pub fn to_vec(&self) -> Vec<f64> {
        self.0.borrow().to_vec()
    }
}

impl From<Vec<f64>> for SharedBuffer {
    fn from(data: Vec<f64>) -> Self {
        Self::new(data)
    }
}

impl std::fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("len", &self.len())
            .field("handles", &self.handle_count())
            .finish()
    }
}
