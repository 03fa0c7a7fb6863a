use std::sync::Mutex;

use super::*;
use crate::foundation::core::PixelFormat;

fn frame(w: u32, h: u32) -> OwnedRef<Bitmap> {
    OwnedRef::new(Bitmap::new(w, h, PixelFormat::Rgba8Premul).unwrap())
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
fn hit_only_for_last_rendered_index() {
    let cache = KeepLastFrameCache::new();
    assert!(cache.get_cached_frame(0).is_none());
    assert!(cache.get_fallback_frame(0).is_none());

    let b = frame(4, 4);
    cache.on_frame_rendered(2, &b, FrameProvenance::Created);
    assert_eq!(b.ref_count(), 2);
    assert!(cache.contains(2));
    assert!(!cache.contains(1));

    let hit = cache.get_cached_frame(2).unwrap();
    assert!(hit.ptr_eq(&b));
    assert!(cache.get_cached_frame(3).is_none());
    assert!(cache.get_fallback_frame(3).unwrap().ptr_eq(&b));
    assert_eq!(cache.size_in_bytes(), 64);
}

#[test]
fn reuse_requires_exclusive_buffer_of_matching_size() {
    let cache = KeepLastFrameCache::new();
    let mut b = frame(4, 4);
    cache.on_frame_rendered(0, &b, FrameProvenance::Created);

    assert!(cache.get_buffer_to_reuse_for_frame(1, 4, 4).is_none());
    b.close();
    assert!(cache.get_buffer_to_reuse_for_frame(1, 8, 8).is_none());

    let reused = cache.get_buffer_to_reuse_for_frame(1, 4, 4).unwrap();
    assert_eq!(reused.ref_count(), 1);
    assert!(!cache.contains(0));
    assert_eq!(cache.size_in_bytes(), 0);
}

#[test]
fn prepared_frames_are_ignored() {
    let cache = KeepLastFrameCache::new();
    let b = frame(2, 2);
    cache.on_frame_prepared(5, &b, FrameProvenance::Created);
    assert!(!cache.contains(5));
    assert_eq!(b.ref_count(), 1);
}

#[test]
fn clear_releases_and_notifies() {
    let cache = KeepLastFrameCache::new();
    let events = Arc::new(Events::default());
    cache.set_frame_cache_listener(Some(events.clone()));

    let a = frame(2, 2);
    let b = frame(2, 2);
    cache.on_frame_rendered(0, &a, FrameProvenance::Created);
    cache.on_frame_rendered(1, &b, FrameProvenance::Reused);
    assert_eq!(a.ref_count(), 1);
    cache.clear();
    assert_eq!(b.ref_count(), 1);
    assert!(cache.get_fallback_frame(0).is_none());

    let seen = events.0.lock().unwrap().clone();
    assert_eq!(seen, ["cached 0", "evicted 0", "cached 1", "evicted 1"]);
}

#[test]
fn redrawing_the_kept_frame_is_not_a_new_insert() {
    let cache = KeepLastFrameCache::new();
    let events = Arc::new(Events::default());
    cache.set_frame_cache_listener(Some(events.clone()));

    let b = frame(2, 2);
    cache.on_frame_rendered(4, &b, FrameProvenance::Created);
    let hit = cache.get_cached_frame(4).unwrap();
    cache.on_frame_rendered(4, &hit, FrameProvenance::Cached);

    assert_eq!(*events.0.lock().unwrap(), ["cached 4"]);
    assert_eq!(b.ref_count(), 3);
}
