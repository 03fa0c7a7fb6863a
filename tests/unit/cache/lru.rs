use std::sync::Mutex;

use super::*;
use crate::foundation::core::PixelFormat;

fn frame(w: u32, h: u32) -> OwnedRef<Bitmap> {
    OwnedRef::new(Bitmap::new(w, h, PixelFormat::Rgba8Premul).unwrap())
}

fn opts(max_cached_frames: usize, max_reuse_buffers: usize) -> LruFrameCacheOpts {
    LruFrameCacheOpts {
        max_cached_frames,
        max_reuse_buffers,
        ..LruFrameCacheOpts::default()
    }
}

/// Insert `frame` through the draw path and give up the caller's handle.
fn render(cache: &LruFrameCache, index: usize, w: u32, h: u32) {
    let mut b = frame(w, h);
    cache.on_frame_rendered(index, &b, FrameProvenance::Created);
    b.close();
}

fn prepare(cache: &LruFrameCache, index: usize, w: u32, h: u32) {
    let mut b = frame(w, h);
    cache.on_frame_prepared(index, &b, FrameProvenance::Created);
    b.close();
}

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl FrameCacheListener for Events {
    fn on_frame_cached(&self, frame: usize) {
        self.0.lock().unwrap().push(format!("cached {frame}"));
    }

    fn on_frame_evicted(&self, frame: usize) {
        self.0.lock().unwrap().push(format!("evicted {frame}"));
    }
}

#[test]
fn opts_default_and_partial_json() {
    let parsed: LruFrameCacheOpts =
        serde_json::from_str(r#"{"max_cached_frames":3}"#).unwrap();
    assert_eq!(parsed.max_cached_frames, 3);
    assert_eq!(parsed.max_reuse_buffers, LruFrameCacheOpts::default().max_reuse_buffers);
    assert!(parsed.enable_buffer_reuse);
}

#[test]
fn cached_frames_hit_and_count() {
    let cache = LruFrameCache::new(opts(4, 2));
    prepare(&cache, 1, 2, 2);
    render(&cache, 0, 2, 2);

    assert!(cache.contains(0) && cache.contains(1));
    assert!(cache.get_cached_frame(1).is_some());
    assert!(cache.get_cached_frame(1).is_some());
    assert!(cache.get_cached_frame(7).is_none());

    let st = cache.stats();
    assert_eq!(st.cached_frames, 2);
    assert_eq!(st.cached_bytes, 32);
    assert_eq!(st.hits, 2);
    assert_eq!(st.prepared_hits, 1);
    assert_eq!(st.misses, 1);
    assert_eq!(cache.size_in_bytes(), 32);
}

#[test]
fn least_recently_used_frame_is_evicted_into_pool() {
    let cache = LruFrameCache::new(opts(2, 1));
    prepare(&cache, 0, 2, 2);
    prepare(&cache, 1, 2, 2);
    let _touch = cache.get_cached_frame(0).unwrap();
    drop(_touch);
    prepare(&cache, 2, 2, 2);

    assert!(cache.contains(0));
    assert!(!cache.contains(1));
    assert!(cache.contains(2));
    let st = cache.stats();
    assert_eq!(st.evictions, 1);
    assert_eq!(st.pooled_buffers, 1);

    let reused = cache.get_buffer_to_reuse_for_frame(3, 2, 2).unwrap();
    assert_eq!(reused.ref_count(), 1);
    assert_eq!(cache.stats().pooled_buffers, 0);
}

#[test]
fn shared_buffers_are_never_pooled() {
    let cache = LruFrameCache::new(opts(1, 4));
    let held = frame(2, 2);
    cache.on_frame_prepared(0, &held, FrameProvenance::Created);
    prepare(&cache, 1, 2, 2);

    assert!(!cache.contains(0));
    assert_eq!(cache.stats().pooled_buffers, 0);
    assert_eq!(held.ref_count(), 1);
}

#[test]
fn byte_bound_evicts_older_frames() {
    let cache = LruFrameCache::new(LruFrameCacheOpts {
        max_cached_frames: 16,
        max_cache_bytes: 100,
        max_reuse_buffers: 0,
        enable_buffer_reuse: true,
    });
    prepare(&cache, 0, 3, 3);
    prepare(&cache, 1, 3, 3);
    assert!(cache.contains(0));
    prepare(&cache, 2, 3, 3);
    assert!(!cache.contains(0));
    assert!(cache.stats().cached_bytes <= 100);
}

#[test]
fn full_cache_gives_up_its_oldest_exclusive_frame_for_reuse() {
    let cache = LruFrameCache::new(opts(2, 0));
    prepare(&cache, 0, 2, 2);
    prepare(&cache, 1, 2, 2);

    assert!(cache.get_buffer_to_reuse_for_frame(2, 3, 3).is_none());
    let reused = cache.get_buffer_to_reuse_for_frame(2, 2, 2).unwrap();
    assert_eq!(reused.ref_count(), 1);
    assert!(!cache.contains(0));
    assert!(cache.contains(1));
}

#[test]
fn reuse_disabled_returns_nothing() {
    let cache = LruFrameCache::new(LruFrameCacheOpts {
        max_cached_frames: 1,
        enable_buffer_reuse: false,
        ..LruFrameCacheOpts::default()
    });
    prepare(&cache, 0, 2, 2);
    prepare(&cache, 1, 2, 2);
    assert_eq!(cache.stats().pooled_buffers, 0);
    assert!(cache.get_buffer_to_reuse_for_frame(2, 2, 2).is_none());
}

#[test]
fn fallback_prefers_last_rendered_then_nearest_earlier() {
    let cache = LruFrameCache::new(opts(4, 0));
    assert!(cache.get_fallback_frame(0).is_none());

    prepare(&cache, 2, 2, 2);
    prepare(&cache, 5, 2, 2);
    let near = cache.get_fallback_frame(4).unwrap();
    assert!(near.ptr_eq(&cache.get_cached_frame(2).unwrap()));
    let first = cache.get_fallback_frame(1).unwrap();
    assert!(first.ptr_eq(&cache.get_cached_frame(2).unwrap()));

    let drawn = frame(2, 2);
    cache.on_frame_rendered(7, &drawn, FrameProvenance::Created);
    assert!(cache.get_fallback_frame(3).unwrap().ptr_eq(&drawn));
}

#[test]
fn last_rendered_stays_pinned_after_eviction() {
    let cache = LruFrameCache::new(opts(1, 2));
    render(&cache, 0, 2, 2);
    prepare(&cache, 1, 2, 2);

    assert!(!cache.contains(0));
    assert_eq!(cache.stats().pooled_buffers, 0);
    assert!(cache.get_fallback_frame(1).is_some());
    assert_eq!(cache.size_in_bytes(), 32);
}

#[test]
fn clear_releases_everything_and_notifies() {
    let cache = LruFrameCache::new(opts(2, 2));
    let events = Arc::new(Events::default());
    cache.set_frame_cache_listener(Some(events.clone()));

    render(&cache, 0, 2, 2);
    prepare(&cache, 1, 2, 2);
    prepare(&cache, 2, 2, 2);
    cache.clear();

    assert_eq!(cache.size_in_bytes(), 0);
    assert!(cache.get_fallback_frame(0).is_none());
    assert_eq!(
        *events.0.lock().unwrap(),
        ["cached 0", "cached 1", "evicted 0", "cached 2", "evicted 1", "evicted 2"]
    );
}

#[test]
fn buffers_are_released_once_cache_lets_go() {
    let released = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let cache = LruFrameCache::new(opts(1, 0));
    for i in 0..3 {
        let counter = Arc::clone(&released);
        let mut b = OwnedRef::of(
            Bitmap::new(2, 2, PixelFormat::Rgba8Premul).unwrap(),
            move |_b: Bitmap| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            },
        );
        cache.on_frame_prepared(i, &b, FrameProvenance::Created);
        b.close();
    }
    assert_eq!(released.load(std::sync::atomic::Ordering::SeqCst), 2);
    cache.clear();
    assert_eq!(released.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[test]
fn previous_fallback_becomes_poolable_once_evicted() {
    let cache = LruFrameCache::new(opts(1, 1));
    render(&cache, 0, 2, 2);
    render(&cache, 1, 2, 2);

    assert!(!cache.contains(0));
    assert_eq!(cache.stats().pooled_buffers, 1);
    assert!(cache.get_buffer_to_reuse_for_frame(2, 2, 2).is_some());
}
