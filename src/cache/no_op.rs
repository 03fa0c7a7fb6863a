use crate::buffer::bitmap::Bitmap;
use crate::cache::frame_cache::{FrameCache, FrameProvenance};
use crate::reference::owned::OwnedRef;

/// Cache that retains nothing: every draw renders into a fresh buffer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpFrameCache;

impl FrameCache for NoOpFrameCache {
    fn get_cached_frame(&self, _frame: usize) -> Option<OwnedRef<Bitmap>> {
        None
    }

    fn get_fallback_frame(&self, _frame: usize) -> Option<OwnedRef<Bitmap>> {
        None
    }

    fn get_buffer_to_reuse_for_frame(
        &self,
        _frame: usize,
        _width: u32,
        _height: u32,
    ) -> Option<OwnedRef<Bitmap>> {
        None
    }

    fn contains(&self, _frame: usize) -> bool {
        false
    }

    fn size_in_bytes(&self) -> usize {
        0
    }

    fn clear(&self) {}

    fn on_frame_rendered(
        &self,
        _frame: usize,
        _bitmap: &OwnedRef<Bitmap>,
        _provenance: FrameProvenance,
    ) {
    }

    fn on_frame_prepared(
        &self,
        _frame: usize,
        _bitmap: &OwnedRef<Bitmap>,
        _provenance: FrameProvenance,
    ) {
    }
}
