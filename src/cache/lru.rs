use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::buffer::bitmap::Bitmap;
use crate::cache::frame_cache::{FrameCache, FrameCacheListener, FrameProvenance};
use crate::reference::owned::OwnedRef;

/// Bounds for [`LruFrameCache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LruFrameCacheOpts {
    /// Maximum number of frames kept by index.
    pub max_cached_frames: usize,
    /// Maximum bytes held by cached frames (the reuse pool is counted separately).
    pub max_cache_bytes: usize,
    /// Maximum number of evicted buffers parked for reuse.
    pub max_reuse_buffers: usize,
    /// Recycle evicted buffers instead of releasing them.
    pub enable_buffer_reuse: bool,
}

impl Default for LruFrameCacheOpts {
    fn default() -> Self {
        Self {
            max_cached_frames: 8,
            max_cache_bytes: 64 * 1024 * 1024,
            max_reuse_buffers: 2,
            enable_buffer_reuse: true,
        }
    }
}

/// Counters reported by [`LruFrameCache::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct LruFrameCacheStats {
    /// Frames currently cached by index.
    pub cached_frames: usize,
    /// Bytes held by cached frames.
    pub cached_bytes: usize,
    /// Buffers parked in the reuse pool.
    pub pooled_buffers: usize,
    /// `get_cached_frame` calls that found the frame.
    pub hits: u64,
    /// `get_cached_frame` calls that missed.
    pub misses: u64,
    /// Hits served by a frame the preparer rendered ahead of time.
    pub prepared_hits: u64,
    /// Frames evicted to stay within bounds or to hand out a buffer.
    pub evictions: u64,
    /// Buffers handed out for reuse.
    pub reuses: u64,
    /// Frames the driver reported as dropped.
    pub dropped: u64,
}

struct Entry {
    bitmap: OwnedRef<Bitmap>,
    bytes: usize,
    last_access: u64,
    prepared: bool,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<usize, Entry>,
    tick: u64,
    cached_bytes: usize,
    pool: Vec<OwnedRef<Bitmap>>,
    last_rendered: Option<(usize, OwnedRef<Bitmap>)>,
    listener: Option<Arc<dyn FrameCacheListener>>,
    stats: LruFrameCacheStats,
}

/// Work left over after the lock is released: listener callbacks and buffers to close.
#[derive(Default)]
struct Deferred {
    listener: Option<Arc<dyn FrameCacheListener>>,
    cached: Option<usize>,
    evicted: Vec<usize>,
    released: Vec<OwnedRef<Bitmap>>,
}

impl Deferred {
    fn finish(self) {
        drop(self.released);
        let Some(listener) = self.listener else {
            return;
        };
        for frame in self.evicted {
            listener.on_frame_evicted(frame);
        }
        if let Some(frame) = self.cached {
            listener.on_frame_cached(frame);
        }
    }
}

impl Inner {
    fn touch(&mut self) -> u64 {
        self.tick = self.tick.wrapping_add(1);
        self.tick
    }

    fn insert(
        &mut self,
        opts: &LruFrameCacheOpts,
        frame: usize,
        bitmap: OwnedRef<Bitmap>,
        prepared: bool,
        deferred: &mut Deferred,
    ) {
        let bytes = bitmap.get().map_or(0, Bitmap::size_in_bytes);
        let last_access = self.touch();
        match self.entries.get_mut(&frame) {
            Some(entry) => {
                entry.last_access = last_access;
                entry.prepared = prepared;
                if !entry.bitmap.ptr_eq(&bitmap) {
                    self.cached_bytes = self.cached_bytes - entry.bytes + bytes;
                    entry.bytes = bytes;
                    let old = std::mem::replace(&mut entry.bitmap, bitmap);
                    self.recycle(opts, old, deferred);
                }
            }
            None => {
                self.cached_bytes += bytes;
                self.entries.insert(
                    frame,
                    Entry {
                        bitmap,
                        bytes,
                        last_access,
                        prepared,
                    },
                );
                deferred.cached = Some(frame);
            }
        }
        self.trim(opts, frame, deferred);
    }

    /// Evict least recently used frames, never `keep`, until the bounds hold.
    fn trim(&mut self, opts: &LruFrameCacheOpts, keep: usize, deferred: &mut Deferred) {
        while self.entries.len() > opts.max_cached_frames
            || self.cached_bytes > opts.max_cache_bytes
        {
            let Some(victim) = self
                .entries
                .iter()
                .filter(|(f, _)| **f != keep)
                .min_by_key(|(_, e)| e.last_access)
                .map(|(f, _)| *f)
            else {
                break;
            };
            if let Some(entry) = self.remove(victim, deferred) {
                self.recycle(opts, entry.bitmap, deferred);
            }
        }
    }

    fn remove(&mut self, frame: usize, deferred: &mut Deferred) -> Option<Entry> {
        let entry = self.entries.remove(&frame)?;
        self.cached_bytes -= entry.bytes;
        self.stats.evictions += 1;
        deferred.evicted.push(frame);
        Some(entry)
    }

    fn recycle(
        &mut self,
        opts: &LruFrameCacheOpts,
        bitmap: OwnedRef<Bitmap>,
        deferred: &mut Deferred,
    ) {
        if opts.enable_buffer_reuse
            && bitmap.ref_count() == 1
            && self.pool.len() < opts.max_reuse_buffers
        {
            self.pool.push(bitmap);
        } else {
            deferred.released.push(bitmap);
        }
    }

    fn pool_bytes(&self) -> usize {
        self.pool
            .iter()
            .map(|b| b.get().map_or(0, Bitmap::size_in_bytes))
            .sum()
    }

    fn orphaned_fallback_bytes(&self) -> usize {
        match &self.last_rendered {
            Some((frame, bitmap))
                if !self
                    .entries
                    .get(frame)
                    .is_some_and(|e| e.bitmap.ptr_eq(bitmap)) =>
            {
                bitmap.get().map_or(0, Bitmap::size_in_bytes)
            }
            _ => 0,
        }
    }
}

/// Bounded least-recently-used frame cache.
///
/// Frames are kept by index up to [`LruFrameCacheOpts::max_cached_frames`] and
/// [`LruFrameCacheOpts::max_cache_bytes`]. Evicted buffers that nobody else references are parked
/// in a small reuse pool, so steady-state playback renders into recycled memory. The most recently
/// drawn frame is pinned as the fallback even after it is evicted.
#[derive(Default)]
pub struct LruFrameCache {
    opts: LruFrameCacheOpts,
    inner: Mutex<Inner>,
}

impl LruFrameCache {
    /// Create a cache with the given bounds.
    pub fn new(opts: LruFrameCacheOpts) -> Self {
        Self {
            opts,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Options this cache was built with.
    pub fn opts(&self) -> LruFrameCacheOpts {
        self.opts
    }

    /// Current counters.
    pub fn stats(&self) -> LruFrameCacheStats {
        let inner = self.lock();
        LruFrameCacheStats {
            cached_frames: inner.entries.len(),
            cached_bytes: inner.cached_bytes,
            pooled_buffers: inner.pool.len(),
            ..inner.stats
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deferred(inner: &Inner) -> Deferred {
        Deferred {
            listener: inner.listener.clone(),
            ..Deferred::default()
        }
    }
}

impl FrameCache for LruFrameCache {
    fn get_cached_frame(&self, frame: usize) -> Option<OwnedRef<Bitmap>> {
        let mut inner = self.lock();
        let tick = inner.touch();
        let found = inner.entries.get_mut(&frame).and_then(|entry| {
            entry.last_access = tick;
            let was_prepared = std::mem::take(&mut entry.prepared);
            entry.bitmap.clone_if_valid().map(|b| (b, was_prepared))
        });
        match found {
            Some((bitmap, was_prepared)) => {
                inner.stats.hits += 1;
                if was_prepared {
                    inner.stats.prepared_hits += 1;
                }
                Some(bitmap)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    fn get_fallback_frame(&self, frame: usize) -> Option<OwnedRef<Bitmap>> {
        let inner = self.lock();
        if let Some(bitmap) = inner
            .last_rendered
            .as_ref()
            .and_then(|(_, b)| b.clone_if_valid())
        {
            return Some(bitmap);
        }
        let nearest_before = inner
            .entries
            .iter()
            .filter(|(f, _)| **f <= frame)
            .max_by_key(|(f, _)| **f);
        nearest_before
            .or_else(|| inner.entries.iter().min_by_key(|(f, _)| **f))
            .and_then(|(_, e)| e.bitmap.clone_if_valid())
    }

    fn get_buffer_to_reuse_for_frame(
        &self,
        frame: usize,
        width: u32,
        height: u32,
    ) -> Option<OwnedRef<Bitmap>> {
        if !self.opts.enable_buffer_reuse {
            return None;
        }
        let fits = |b: &OwnedRef<Bitmap>| {
            b.ref_count() == 1 && b.get().is_ok_and(|b| b.has_size(width, height))
        };

        let mut inner = self.lock();
        if let Some(idx) = inner.pool.iter().position(fits) {
            inner.stats.reuses += 1;
            return Some(inner.pool.swap_remove(idx));
        }
        if inner.entries.len() < self.opts.max_cached_frames {
            return None;
        }

        let victim = inner
            .entries
            .iter()
            .filter(|(f, e)| **f != frame && fits(&e.bitmap))
            .min_by_key(|(_, e)| e.last_access)
            .map(|(f, _)| *f)?;
        let mut deferred = Self::deferred(&inner);
        let entry = inner.remove(victim, &mut deferred)?;
        inner.stats.reuses += 1;
        drop(inner);
        tracing::trace!(frame, victim, "evicted cached frame to recycle its buffer");
        deferred.finish();
        Some(entry.bitmap)
    }

    fn contains(&self, frame: usize) -> bool {
        self.lock().entries.contains_key(&frame)
    }

    fn size_in_bytes(&self) -> usize {
        let inner = self.lock();
        inner.cached_bytes + inner.pool_bytes() + inner.orphaned_fallback_bytes()
    }

    fn clear(&self) {
        let mut inner = self.lock();
        let mut deferred = Self::deferred(&inner);
        let mut frames: Vec<usize> = inner.entries.keys().copied().collect();
        frames.sort_unstable();
        deferred.evicted = frames;
        deferred
            .released
            .extend(inner.entries.drain().map(|(_, e)| e.bitmap));
        let pooled = std::mem::take(&mut inner.pool);
        deferred.released.extend(pooled);
        deferred
            .released
            .extend(inner.last_rendered.take().map(|(_, b)| b));
        inner.cached_bytes = 0;
        drop(inner);
        tracing::debug!(frames = deferred.evicted.len(), "cleared frame cache");
        deferred.finish();
    }

    fn on_frame_rendered(
        &self,
        frame: usize,
        bitmap: &OwnedRef<Bitmap>,
        _provenance: FrameProvenance,
    ) {
        let (Some(kept), Some(pinned)) = (bitmap.clone_if_valid(), bitmap.clone_if_valid()) else {
            return;
        };
        let mut inner = self.lock();
        let mut deferred = Self::deferred(&inner);
        if let Some((previous_frame, previous)) = inner.last_rendered.replace((frame, pinned)) {
            let still_cached = inner
                .entries
                .get(&previous_frame)
                .is_some_and(|e| e.bitmap.ptr_eq(&previous));
            if still_cached {
                // Not the last reference, so nothing is released under the lock.
                drop(previous);
            } else {
                deferred.released.push(previous);
            }
        }
        inner.insert(&self.opts, frame, kept, false, &mut deferred);
        drop(inner);
        deferred.finish();
    }

    fn on_frame_prepared(
        &self,
        frame: usize,
        bitmap: &OwnedRef<Bitmap>,
        _provenance: FrameProvenance,
    ) {
        let Some(kept) = bitmap.clone_if_valid() else {
            return;
        };
        let mut inner = self.lock();
        let mut deferred = Self::deferred(&inner);
        inner.insert(&self.opts, frame, kept, true, &mut deferred);
        drop(inner);
        deferred.finish();
    }

    fn on_frame_dropped(&self, _frame: usize) {
        self.lock().stats.dropped += 1;
    }

    fn set_frame_cache_listener(&self, listener: Option<Arc<dyn FrameCacheListener>>) {
        self.lock().listener = listener;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/lru.rs"]
mod tests;
