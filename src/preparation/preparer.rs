use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::buffer::allocator::BufferAllocator;
use crate::buffer::bitmap::Bitmap;
use crate::cache::frame_cache::{FrameCache, FrameProvenance};
use crate::driver::animation_driver::AnimationDriver;
use crate::foundation::core::PixelFormat;
use crate::foundation::error::{ReelError, ReelResult};
use crate::reference::owned::OwnedRef;
use crate::render::renderer::FrameRenderer;

/// Renders frames into a cache ahead of the draw path.
pub trait FramePreparer: Send + Sync {
    /// Make `frame` of `driver`'s animation available in `cache` eventually.
    ///
    /// Returns `false` when the preparer cannot take the frame at all (for example because the
    /// driver has no buffer size yet); callers should then stop asking for further frames.
    fn prepare_frame(
        &self,
        cache: &Arc<dyn FrameCache>,
        driver: &AnimationDriver,
        frame: usize,
    ) -> bool;
}

/// Options for [`DefaultFramePreparer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FramePreparerOpts {
    /// Worker threads. `None` lets rayon pick.
    pub threads: Option<usize>,
}

/// Counters reported by [`DefaultFramePreparer::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PreparerStats {
    /// Jobs submitted to the worker pool.
    pub scheduled: u64,
    /// Requests skipped because the frame was already cached.
    pub skipped_cached: u64,
    /// Requests skipped because a job for the frame was already pending.
    pub skipped_pending: u64,
    /// Frames rendered and handed to the cache.
    pub prepared: u64,
    /// Jobs that could not produce the frame.
    pub failed: u64,
    /// Jobs abandoned because their animation was closed.
    pub discarded: u64,
}

#[derive(Default)]
struct Counters {
    scheduled: AtomicU64,
    skipped_cached: AtomicU64,
    skipped_pending: AtomicU64,
    prepared: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

/// Pending jobs keyed by `(cache identity, frame)`.
#[derive(Default)]
struct Pending {
    jobs: Mutex<HashSet<(usize, usize)>>,
    idle: Condvar,
}

impl Pending {
    fn lock(&self) -> MutexGuard<'_, HashSet<(usize, usize)>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, key: (usize, usize)) {
        let mut jobs = self.lock();
        jobs.remove(&key);
        if jobs.is_empty() {
            self.idle.notify_all();
        }
    }
}

/// Everything a background job needs, detached from the driver that requested it.
struct PrepareJob {
    key: (usize, usize),
    frame: usize,
    width: u32,
    height: u32,
    format: PixelFormat,
    cache: Arc<dyn FrameCache>,
    renderer: Arc<dyn FrameRenderer>,
    allocator: Arc<dyn BufferAllocator>,
    closed: Arc<AtomicBool>,
}

impl PrepareJob {
    fn ensure_open(&self) -> ReelResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ReelError::closed(format!(
                "animation closed before frame {} was prepared",
                self.frame
            )));
        }
        Ok(())
    }

    fn run(&self) -> ReelResult<bool> {
        self.ensure_open()?;
        if self.cache.contains(self.frame) {
            return Ok(false);
        }
        let reuse = self
            .cache
            .get_buffer_to_reuse_for_frame(self.frame, self.width, self.height);
        if let Some(buffer) = reuse {
            match self.render_and_store(buffer, FrameProvenance::Reused) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e @ ReelError::Closed(_)) => return Err(e),
                Err(e) => {
                    tracing::debug!(frame = self.frame, error = %e, "reuse buffer render failed");
                }
            }
        }
        self.ensure_open()?;
        let buffer = self
            .allocator
            .create_buffer(self.width, self.height, self.format)?;
        if self.render_and_store(buffer, FrameProvenance::Created)? {
            Ok(true)
        } else {
            Err(ReelError::render(format!(
                "renderer could not produce frame {}",
                self.frame
            )))
        }
    }

    fn render_and_store(
        &self,
        mut buffer: OwnedRef<Bitmap>,
        provenance: FrameProvenance,
    ) -> ReelResult<bool> {
        self.ensure_open()?;
        let rendered = self.renderer.render_frame(self.frame, buffer.get_mut()?)?;
        if !rendered {
            return Ok(false);
        }
        self.ensure_open()?;
        self.cache.on_frame_prepared(self.frame, &buffer, provenance);
        if let Err(e) = self.ensure_open() {
            // close() ran between the check and the store and may have cleared before it
            self.cache.clear();
            return Err(e);
        }
        Ok(true)
    }
}

/// [`FramePreparer`] running jobs on a dedicated rayon pool.
///
/// A frame that is already cached, or already pending for the same cache, is not scheduled again.
/// Jobs re-check the cache when they start, then render into a reuse buffer if the cache offers one
/// and into a freshly allocated buffer otherwise. Jobs of a closed animation never store a frame.
pub struct DefaultFramePreparer {
    pool: rayon::ThreadPool,
    pending: Arc<Pending>,
    counters: Arc<Counters>,
}

impl DefaultFramePreparer {
    /// Create a preparer with its own worker pool.
    pub fn new(opts: FramePreparerOpts) -> ReelResult<Self> {
        Ok(Self {
            pool: build_thread_pool(opts.threads)?,
            pending: Arc::new(Pending::default()),
            counters: Arc::new(Counters::default()),
        })
    }

    /// Number of jobs scheduled but not finished.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Block until every scheduled job has finished.
    pub fn wait_until_idle(&self) {
        let mut jobs = self.pending.lock();
        while !jobs.is_empty() {
            jobs = self
                .pending
                .idle
                .wait(jobs)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Current counters.
    pub fn stats(&self) -> PreparerStats {
        let c = &self.counters;
        PreparerStats {
            scheduled: c.scheduled.load(Ordering::Acquire),
            skipped_cached: c.skipped_cached.load(Ordering::Acquire),
            skipped_pending: c.skipped_pending.load(Ordering::Acquire),
            prepared: c.prepared.load(Ordering::Acquire),
            failed: c.failed.load(Ordering::Acquire),
            discarded: c.discarded.load(Ordering::Acquire),
        }
    }
}

impl FramePreparer for DefaultFramePreparer {
    fn prepare_frame(
        &self,
        cache: &Arc<dyn FrameCache>,
        driver: &AnimationDriver,
        frame: usize,
    ) -> bool {
        if driver.is_closed() {
            return false;
        }
        let (Some(width), Some(height)) =
            (driver.bitmap_width().get(), driver.bitmap_height().get())
        else {
            tracing::trace!(frame, "no buffer size yet, not preparing");
            return false;
        };
        if cache.contains(frame) {
            self.counters.skipped_cached.fetch_add(1, Ordering::AcqRel);
            return true;
        }

        let key = (Arc::as_ptr(cache).cast::<()>() as usize, frame);
        if !self.pending.lock().insert(key) {
            self.counters.skipped_pending.fetch_add(1, Ordering::AcqRel);
            return true;
        }

        let job = PrepareJob {
            key,
            frame,
            width,
            height,
            format: driver.pixel_format(),
            cache: Arc::clone(cache),
            renderer: Arc::clone(driver.renderer()),
            allocator: Arc::clone(driver.allocator()),
            closed: driver.closed_flag(),
        };
        let pending = Arc::clone(&self.pending);
        let counters = Arc::clone(&self.counters);
        counters.scheduled.fetch_add(1, Ordering::AcqRel);
        self.pool.spawn(move || {
            match job.run() {
                Ok(true) => {
                    counters.prepared.fetch_add(1, Ordering::AcqRel);
                    tracing::trace!(frame = job.frame, "prepared frame");
                }
                Ok(false) => {}
                Err(ReelError::Closed(_)) => {
                    counters.discarded.fetch_add(1, Ordering::AcqRel);
                    tracing::debug!(frame = job.frame, "animation closed, frame discarded");
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::AcqRel);
                    tracing::warn!(frame = job.frame, error = %e, "frame preparation failed");
                }
            }
            pending.finish(job.key);
        });
        true
    }
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ReelError::validation(
            "preparer 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("reel-prepare-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/preparation/preparer.rs"]
mod tests;
