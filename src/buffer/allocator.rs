use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::buffer::bitmap::Bitmap;
use crate::foundation::core::PixelFormat;
use crate::foundation::error::{ReelError, ReelResult};
use crate::reference::owned::OwnedRef;

/// Creates fresh frame buffers when neither the cache nor the reuse pool can provide one.
///
/// Implementations either return a fully usable buffer or an error; never a partially-valid one.
pub trait BufferAllocator: Send + Sync {
    /// Allocate a `width x height` bitmap in `format`.
    fn create_buffer(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> ReelResult<OwnedRef<Bitmap>>;
}

/// Options for [`HeapBitmapAllocator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HeapAllocatorOpts {
    /// Upper bound on bytes held by live buffers from this allocator. `None` means unbounded.
    pub max_live_bytes: Option<usize>,
}

/// Snapshot of [`HeapBitmapAllocator`] accounting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct AllocatorStats {
    /// Buffers currently alive (allocated and not yet released).
    pub live_buffers: usize,
    /// Bytes held by live buffers.
    pub live_bytes: usize,
    /// Buffers handed out since construction.
    pub allocated_total: u64,
    /// Buffers released since construction.
    pub released_total: u64,
    /// Allocations refused because of the byte budget.
    pub refused_total: u64,
}

#[derive(Debug, Default)]
struct Counters {
    live_buffers: AtomicUsize,
    live_bytes: AtomicUsize,
    allocated_total: AtomicU64,
    released_total: AtomicU64,
    refused_total: AtomicU64,
}

/// Heap-backed [`BufferAllocator`] with optional byte budget.
///
/// Every buffer it returns carries a releaser that gives its bytes back to the budget, so live
/// accounting is exact as long as every [`OwnedRef`] is eventually closed.
#[derive(Debug, Clone, Default)]
pub struct HeapBitmapAllocator {
    opts: HeapAllocatorOpts,
    counters: Arc<Counters>,
}

impl HeapBitmapAllocator {
    /// Create an allocator with the given options.
    pub fn new(opts: HeapAllocatorOpts) -> Self {
        Self {
            opts,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Current accounting snapshot.
    pub fn stats(&self) -> AllocatorStats {
        let c = &self.counters;
        AllocatorStats {
            live_buffers: c.live_buffers.load(Ordering::Acquire),
            live_bytes: c.live_bytes.load(Ordering::Acquire),
            allocated_total: c.allocated_total.load(Ordering::Acquire),
            released_total: c.released_total.load(Ordering::Acquire),
            refused_total: c.refused_total.load(Ordering::Acquire),
        }
    }

    fn reserve(&self, bytes: usize) -> ReelResult<()> {
        let Some(max) = self.opts.max_live_bytes else {
            self.counters.live_bytes.fetch_add(bytes, Ordering::AcqRel);
            return Ok(());
        };
        let reserved = self
            .counters
            .live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                let next = live.saturating_add(bytes);
                (next <= max).then_some(next)
            });
        match reserved {
            Ok(_) => Ok(()),
            Err(live) => {
                self.counters.refused_total.fetch_add(1, Ordering::AcqRel);
                Err(ReelError::allocation(format!(
                    "budget exhausted: {live} live + {bytes} requested > {max} bytes"
                )))
            }
        }
    }
}

impl BufferAllocator for HeapBitmapAllocator {
    fn create_buffer(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> ReelResult<OwnedRef<Bitmap>> {
        if width == 0 || height == 0 {
            return Err(ReelError::allocation(format!(
                "cannot allocate {width}x{height} bitmap (dimensions unset)"
            )));
        }
        let bytes = format.byte_len(width, height);
        self.reserve(bytes)?;
        let bitmap = match Bitmap::new(width, height, format) {
            Ok(b) => b,
            Err(e) => {
                self.counters.live_bytes.fetch_sub(bytes, Ordering::AcqRel);
                return Err(e);
            }
        };

        self.counters.live_buffers.fetch_add(1, Ordering::AcqRel);
        self.counters.allocated_total.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(width, height, ?format, bytes, "allocated frame buffer");

        let counters = Arc::clone(&self.counters);
        Ok(OwnedRef::of(bitmap, move |released: Bitmap| {
            counters
                .live_bytes
                .fetch_sub(released.size_in_bytes(), Ordering::AcqRel);
            counters.live_buffers.fetch_sub(1, Ordering::AcqRel);
            counters.released_total.fetch_add(1, Ordering::AcqRel);
        }))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/allocator.rs"]
mod tests;
