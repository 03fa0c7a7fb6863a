use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::buffer::bitmap::Bitmap;
use crate::cache::frame_cache::{FrameCache, FrameCacheListener, FrameProvenance};
use crate::reference::owned::OwnedRef;

#[derive(Default)]
struct LastFrame {
    frame: Option<usize>,
    bitmap: OwnedRef<Bitmap>,
    listener: Option<Arc<dyn FrameCacheListener>>,
}

/// Cache that keeps only the most recently rendered frame.
///
/// That frame answers cache hits for its own index, serves as the fallback for every other index,
/// and is given up for reuse when exclusively owned and of the requested size. Prepared frames are
/// ignored.
#[derive(Default)]
pub struct KeepLastFrameCache {
    inner: Mutex<LastFrame>,
}

impl KeepLastFrameCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LastFrame> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameCache for KeepLastFrameCache {
    fn get_cached_frame(&self, frame: usize) -> Option<OwnedRef<Bitmap>> {
        let last = self.lock();
        if last.frame == Some(frame) {
            last.bitmap.clone_if_valid()
        } else {
            None
        }
    }

    fn get_fallback_frame(&self, _frame: usize) -> Option<OwnedRef<Bitmap>> {
        self.lock().bitmap.clone_if_valid()
    }

    fn get_buffer_to_reuse_for_frame(
        &self,
        _frame: usize,
        width: u32,
        height: u32,
    ) -> Option<OwnedRef<Bitmap>> {
        let (evicted, listener, bitmap) = {
            let mut last = self.lock();
            let reusable = last.bitmap.ref_count() == 1
                && last
                    .bitmap
                    .get()
                    .is_ok_and(|b| b.has_size(width, height));
            if !reusable {
                return None;
            }
            let evicted = last.frame.take();
            let bitmap = std::mem::take(&mut last.bitmap);
            (evicted, last.listener.clone(), bitmap)
        };
        if let (Some(frame), Some(listener)) = (evicted, listener) {
            listener.on_frame_evicted(frame);
        }
        Some(bitmap)
    }

    fn contains(&self, frame: usize) -> bool {
        let last = self.lock();
        last.frame == Some(frame) && last.bitmap.is_valid()
    }

    fn size_in_bytes(&self) -> usize {
        self.lock()
            .bitmap
            .get()
            .map_or(0, Bitmap::size_in_bytes)
    }

    fn clear(&self) {
        let (evicted, listener, mut bitmap) = {
            let mut last = self.lock();
            (
                last.frame.take(),
                last.listener.clone(),
                std::mem::take(&mut last.bitmap),
            )
        };
        bitmap.close();
        if let (Some(frame), Some(listener)) = (evicted, listener) {
            listener.on_frame_evicted(frame);
        }
    }

    fn on_frame_rendered(
        &self,
        frame: usize,
        bitmap: &OwnedRef<Bitmap>,
        _provenance: FrameProvenance,
    ) {
        let Some(incoming) = bitmap.clone_if_valid() else {
            return;
        };
        let (replaced, listener, _old) = {
            let mut last = self.lock();
            if last.frame == Some(frame) && last.bitmap.ptr_eq(&incoming) {
                return;
            }
            let replaced = last.frame.replace(frame).filter(|&f| f != frame);
            let old = std::mem::replace(&mut last.bitmap, incoming);
            (replaced, last.listener.clone(), old)
        };
        if let Some(listener) = listener {
            if let Some(old_frame) = replaced {
                listener.on_frame_evicted(old_frame);
            }
            listener.on_frame_cached(frame);
        }
    }

    fn on_frame_prepared(
        &self,
        _frame: usize,
        _bitmap: &OwnedRef<Bitmap>,
        _provenance: FrameProvenance,
    ) {
    }

    fn set_frame_cache_listener(&self, listener: Option<Arc<dyn FrameCacheListener>>) {
        self.lock().listener = listener;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/keep_last.rs"]
mod tests;
