use std::sync::Arc;

use crate::buffer::bitmap::Bitmap;
use crate::reference::owned::OwnedRef;

/// Which step of frame selection produced the buffer that was drawn.
///
/// Diagnostics only; correctness never depends on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameProvenance {
    /// Served straight from the frame cache.
    Cached,
    /// Rendered into a recycled buffer.
    Reused,
    /// Rendered into a freshly allocated buffer.
    Created,
    /// Degraded substitute after the real frame could not be produced.
    Fallback,
}

impl FrameProvenance {
    /// Stable lowercase name for logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Reused => "reused",
            Self::Created => "created",
            Self::Fallback => "fallback",
        }
    }
}

/// Observer of cache membership changes.
pub trait FrameCacheListener: Send + Sync {
    /// `frame` was inserted into the cache.
    fn on_frame_cached(&self, frame: usize);

    /// `frame` left the cache (evicted or cleared).
    fn on_frame_evicted(&self, frame: usize);
}

/// Thread-safe store of rendered frames shared by the draw path and the background preparer.
///
/// Ownership contract: every `get_*` method returns a handle the caller owns and must close (or
/// drop). A buffer returned by [`FrameCache::get_buffer_to_reuse_for_frame`] is exclusively the
/// caller's; the cache keeps no reference to it. `on_frame_*` callbacks borrow the caller's handle;
/// a cache that wants to keep the frame clones it.
pub trait FrameCache: Send + Sync {
    /// Already-rendered buffer for `frame`.
    fn get_cached_frame(&self, frame: usize) -> Option<OwnedRef<Bitmap>>;

    /// Substitute to show when `frame` cannot be produced (e.g. the last good frame).
    fn get_fallback_frame(&self, frame: usize) -> Option<OwnedRef<Bitmap>>;

    /// Stale buffer of exactly `width x height` that `frame` can be rendered into.
    fn get_buffer_to_reuse_for_frame(
        &self,
        frame: usize,
        width: u32,
        height: u32,
    ) -> Option<OwnedRef<Bitmap>>;

    /// Return `true` if `frame` is cached.
    fn contains(&self, frame: usize) -> bool;

    /// Bytes currently retained by the cache.
    fn size_in_bytes(&self) -> usize;

    /// Release every retained buffer.
    fn clear(&self);

    /// `frame` was drawn from `bitmap`. Never called for [`FrameProvenance::Fallback`].
    fn on_frame_rendered(
        &self,
        frame: usize,
        bitmap: &OwnedRef<Bitmap>,
        provenance: FrameProvenance,
    );

    /// `frame` was rendered ahead of time by the preparer.
    fn on_frame_prepared(
        &self,
        frame: usize,
        bitmap: &OwnedRef<Bitmap>,
        provenance: FrameProvenance,
    );

    /// `frame` could not be drawn at all.
    fn on_frame_dropped(&self, _frame: usize) {}

    /// Install or remove the membership listener.
    fn set_frame_cache_listener(&self, _listener: Option<Arc<dyn FrameCacheListener>>) {}
}
