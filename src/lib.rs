//! reelcache is the frame-ownership and frame-caching core of an animated image player.
//!
//! Expensive frame buffers travel as [`OwnedRef`] handles that release their value exactly once,
//! when the last handle closes. On top of that, an [`AnimationDriver`] decides for every requested
//! frame whether to draw a cached bitmap, render into a recycled buffer, allocate a new one or fall
//! back to a degraded frame, while a [`FramePreparer`] renders upcoming frames in the background:
//!
//! - Describe the animation with [`AnimationMetadata`] (or any [`AnimationInformation`])
//! - Pick a [`FrameCache`] policy such as [`LruFrameCache`]
//! - Create an [`AnimationDriver`] and call [`AnimationDriver::draw_frame`] per display tick
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod buffer;
pub(crate) mod cache;
pub(crate) mod driver;
pub(crate) mod preparation;
pub(crate) mod reference;
pub(crate) mod render;

pub use crate::foundation::core::{Bounds, Dimension, LoopCount, LoopCountOverride, PixelFormat};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::animation::information::{AnimationInformation, AnimationMetadata};
pub use crate::animation::scheduler::DropFramesScheduler;
pub use crate::buffer::allocator::{
    AllocatorStats, BufferAllocator, HeapAllocatorOpts, HeapBitmapAllocator,
};
pub use crate::buffer::bitmap::Bitmap;
pub use crate::cache::frame_cache::{FrameCache, FrameCacheListener, FrameProvenance};
pub use crate::cache::keep_last::KeepLastFrameCache;
pub use crate::cache::lru::{LruFrameCache, LruFrameCacheOpts, LruFrameCacheStats};
pub use crate::cache::no_op::NoOpFrameCache;
pub use crate::driver::animation_driver::{AnimationDriver, DrawOutcome, DriverOpts, DriverStats};
pub use crate::driver::listener::FrameListener;
pub use crate::preparation::preparer::{
    DefaultFramePreparer, FramePreparer, FramePreparerOpts, PreparerStats,
};
pub use crate::preparation::strategy::{
    FixedNumberStrategy, FramePreparationStrategy, NoOpStrategy,
};
pub use crate::reference::owned::{OwnedRef, close_all, is_valid};
pub use crate::reference::shared::{ResourceReleaser, SharedHandle};
pub use crate::render::canvas::{Canvas, DrawRecord, RecordingCanvas};
pub use crate::render::renderer::FrameRenderer;
