use std::sync::Arc;

/// Releases a value once the last reference to it has been closed.
///
/// Implemented for any `Fn(T) + Send + Sync` closure, so `|bitmap| pool.recycle(bitmap)` works as a
/// releaser.
pub trait ResourceReleaser<T>: Send + Sync {
    /// Consume `value`. Called exactly once per shared handle.
    fn release(&self, value: T);
}

impl<T, F> ResourceReleaser<T> for F
where
    F: Fn(T) + Send + Sync,
{
    fn release(&self, value: T) {
        self(value)
    }
}

/// Shared state behind every [`OwnedRef`](crate::OwnedRef) pointing at the same value.
///
/// The reference count is the strong count of the `Arc` holding the handle: every live `OwnedRef`
/// owns exactly one strong reference, and closing a ref drops it. The releaser runs on the 1→0
/// transition only, on whichever thread performed that transition.
pub struct SharedHandle<T> {
    value: T,
    releaser: Box<dyn ResourceReleaser<T>>,
}

impl<T> SharedHandle<T> {
    pub(crate) fn new(value: T, releaser: Box<dyn ResourceReleaser<T>>) -> Arc<Self> {
        Arc::new(Self { value, releaser })
    }

    /// Borrow the shared value.
    pub fn get(&self) -> &T {
        &self.value
    }

    pub(crate) fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Number of live references to `handle`.
    pub fn ref_count(handle: &Arc<Self>) -> usize {
        Arc::strong_count(handle)
    }

    /// Give up one reference. Returns `true` if this was the last one and the value was released.
    ///
    /// `Arc::into_inner` hands the value to exactly one caller even when the last references are
    /// dropped concurrently.
    pub(crate) fn delete_reference(handle: Arc<Self>) -> bool {
        match Arc::into_inner(handle) {
            Some(Self { value, releaser }) => {
                releaser.release(value);
                true
            }
            None => false,
        }
    }
}

impl<T> std::fmt::Debug for SharedHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedHandle")
            .field("value_ptr", &std::ptr::from_ref(&self.value))
            .finish_non_exhaustive()
    }
}
