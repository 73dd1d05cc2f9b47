//! Atomically counted shared ownership with in-place recycling
//!
//! Messages, arrays and string buffers are all held through [`Shared`]. Every
//! set pointer-typed field holds exactly one count. A uniquely held object can
//! be reset and reused instead of freed and reallocated, which is what keeps
//! repeated parsing into the same message allocation-free.

use alloc::sync::Arc;
use core::fmt;
use core::ops::Deref;

/// Reference-counted handle to a message, array or string buffer
pub struct Shared<T>(Arc<T>);

impl<T> Shared<T> {
    /// Wrap a fresh object with a reference count of one
    #[inline]
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Current number of owners
    #[inline]
    pub fn ref_count(this: &Self) -> usize {
        Arc::strong_count(&this.0)
    }

    /// Whether this handle is the only owner
    #[inline]
    pub fn is_unique(this: &Self) -> bool {
        Arc::strong_count(&this.0) == 1
    }

    /// Mutable access when uniquely owned
    #[inline]
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        Arc::get_mut(&mut this.0)
    }

    /// Whether two handles refer to the same object
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<T: Clone> Shared<T> {
    /// Mutable access, copying the object first if it is shared
    #[inline]
    pub fn make_mut(this: &mut Self) -> &mut T {
        Arc::make_mut(&mut this.0)
    }
}

impl<T> Clone for Shared<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: PartialEq> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(self, other) || *self.0 == *other.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Objects that can be reset in place for reuse
pub trait Recycle {
    /// Return the object to its freshly allocated logical state while keeping
    /// any storage it has already acquired
    fn reset(&mut self);
}

/// Take one more count on `obj`; a `None` reference is a no-op
#[inline]
pub fn retain<T>(obj: Option<&Shared<T>>) -> Option<Shared<T>> {
    obj.cloned()
}

/// Drop one count on `obj`
///
/// Returns true when this was the last count and the object (and with it
/// every child it owned) has been freed.
#[inline]
pub fn release<T>(obj: Option<Shared<T>>) -> bool {
    match obj {
        Some(shared) => Arc::into_inner(shared.0).is_some(),
        None => false,
    }
}

/// Reuse `*slot` if it is uniquely owned, otherwise replace it with `fresh()`
///
/// A shared previous occupant only loses this slot's count. Returns the
/// object now installed and whether it was reused.
pub fn recycle<T, F>(slot: &mut Option<Shared<T>>, fresh: F) -> (&mut T, bool)
where
    T: Recycle + Clone,
    F: FnOnce() -> T,
{
    let (shared, reused) = match slot.take() {
        Some(mut shared) => match Shared::get_mut(&mut shared) {
            Some(obj) => {
                obj.reset();
                (shared, true)
            }
            None => (Shared::new(fresh()), false),
        },
        None => (Shared::new(fresh()), false),
    };

    (Shared::make_mut(slot.insert(shared)), reused)
}
