use std::sync::Arc;

use crate::foundation::error::{ReelError, ReelResult};
use crate::reference::shared::{ResourceReleaser, SharedHandle};

/// Reference-counted owning handle to an expensive value (typically a frame [`Bitmap`]).
///
/// Every `OwnedRef` that points at a value holds one count on its [`SharedHandle`]. The value is
/// handed to its releaser exactly once, when the last handle is closed. Handles close explicitly
/// through [`OwnedRef::close`] or implicitly on drop; closing twice is a no-op.
///
/// After a handle is closed it is *empty*: [`OwnedRef::get`] fails with [`ReelError::Closed`] and
/// cloning it yields another empty handle.
///
/// [`Bitmap`]: crate::Bitmap
#[must_use = "dropping an OwnedRef immediately closes it"]
pub struct OwnedRef<T> {
    shared: Option<Arc<SharedHandle<T>>>,
}

impl<T> OwnedRef<T> {
    /// Wrap `value` with a custom releaser. The returned handle is the only reference (count 1).
    pub fn of<R>(value: T, releaser: R) -> Self
    where
        R: ResourceReleaser<T> + 'static,
    {
        Self {
            shared: Some(SharedHandle::new(value, Box::new(releaser))),
        }
    }

    /// Wrap `value` so that it is simply dropped when the last handle closes.
    pub fn new(value: T) -> Self
    where
        T: 'static,
    {
        Self::of(value, drop::<T>)
    }

    /// An empty handle that refers to nothing.
    pub fn empty() -> Self {
        Self { shared: None }
    }

    /// Return `true` while this handle has not been closed.
    pub fn is_valid(&self) -> bool {
        self.shared.is_some()
    }

    /// Borrow the value.
    pub fn get(&self) -> ReelResult<&T> {
        self.shared
            .as_deref()
            .map(SharedHandle::get)
            .ok_or_else(|| ReelError::closed("value accessed after close"))
    }

    /// Mutably borrow the value. Only possible while this is the single live handle.
    pub fn get_mut(&mut self) -> ReelResult<&mut T> {
        let shared = self
            .shared
            .as_mut()
            .ok_or_else(|| ReelError::closed("value mutated after close"))?;
        let refs = SharedHandle::ref_count(shared);
        Arc::get_mut(shared)
            .map(SharedHandle::get_mut)
            .ok_or_else(|| {
                ReelError::shared(format!(
                    "exclusive access needs a single reference, found {refs}"
                ))
            })
    }

    /// Clone the handle if it is still valid.
    pub fn clone_if_valid(&self) -> Option<Self> {
        self.shared.as_ref().map(|shared| Self {
            shared: Some(Arc::clone(shared)),
        })
    }

    /// Close this handle. Releases the value if this was the last live reference.
    ///
    /// Returns `true` when this call released the value. Subsequent calls do nothing and return
    /// `false`.
    pub fn close(&mut self) -> bool {
        match self.shared.take() {
            Some(shared) => SharedHandle::delete_reference(shared),
            None => false,
        }
    }

    /// Number of live handles sharing the value, `0` once closed.
    pub fn ref_count(&self) -> usize {
        self.shared.as_ref().map_or(0, SharedHandle::ref_count)
    }

    /// Return `true` when both handles are valid and point at the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.shared, &other.shared) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T> Clone for OwnedRef<T> {
    /// Adds a reference to the same value; cloning a closed handle yields an empty one.
    fn clone(&self) -> Self {
        self.clone_if_valid().unwrap_or_else(Self::empty)
    }
}

impl<T> Default for OwnedRef<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Drop for OwnedRef<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T> std::fmt::Debug for OwnedRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedRef")
            .field("valid", &self.is_valid())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// Close every handle yielded by `refs`.
pub fn close_all<'a, T: 'a>(refs: impl IntoIterator<Item = &'a mut OwnedRef<T>>) {
    for r in refs {
        r.close();
    }
}

/// Return `true` when `r` is present and still valid.
pub fn is_valid<T>(r: Option<&OwnedRef<T>>) -> bool {
    r.is_some_and(OwnedRef::is_valid)
}

#[cfg(test)]
#[path = "../../tests/unit/reference/owned.rs"]
mod tests;
