use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::animation::information::AnimationInformation;
use crate::buffer::allocator::BufferAllocator;
use crate::buffer::bitmap::Bitmap;
use crate::cache::frame_cache::{FrameCache, FrameProvenance};
use crate::driver::listener::FrameListener;
use crate::foundation::core::{Bounds, Dimension, LoopCount, LoopCountOverride, PixelFormat};
use crate::preparation::preparer::FramePreparer;
use crate::preparation::strategy::FramePreparationStrategy;
use crate::reference::owned::OwnedRef;
use crate::render::canvas::Canvas;
use crate::render::renderer::FrameRenderer;

/// Options for [`AnimationDriver`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DriverOpts {
    /// Format of buffers the driver allocates.
    pub pixel_format: PixelFormat,
    /// Replace the loop count encoded in the animation.
    pub loop_count_override: Option<LoopCountOverride>,
}

/// Result of one [`AnimationDriver::draw_frame`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    /// A buffer was drawn; the provenance says which step produced it.
    Drawn(FrameProvenance),
    /// Nothing was drawn.
    Dropped,
}

impl DrawOutcome {
    /// Return `true` when something was drawn.
    pub fn is_drawn(self) -> bool {
        matches!(self, Self::Drawn(_))
    }

    /// Provenance of the drawn buffer, if any.
    pub fn provenance(self) -> Option<FrameProvenance> {
        match self {
            Self::Drawn(p) => Some(p),
            Self::Dropped => None,
        }
    }
}

/// Per-driver draw counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct DriverStats {
    /// `draw_frame` calls.
    pub draws: u64,
    /// Draws served from the cache.
    pub cached: u64,
    /// Draws rendered into a reuse buffer.
    pub reused: u64,
    /// Draws rendered into a freshly allocated buffer.
    pub created: u64,
    /// Draws that showed a fallback frame.
    pub fallback: u64,
    /// Draws that showed nothing.
    pub dropped: u64,
    /// Renderer calls that failed.
    pub render_failures: u64,
    /// Allocator calls that failed.
    pub allocation_failures: u64,
}

impl DriverStats {
    fn record(&mut self, outcome: DrawOutcome) {
        self.draws += 1;
        match outcome {
            DrawOutcome::Drawn(FrameProvenance::Cached) => self.cached += 1,
            DrawOutcome::Drawn(FrameProvenance::Reused) => self.reused += 1,
            DrawOutcome::Drawn(FrameProvenance::Created) => self.created += 1,
            DrawOutcome::Drawn(FrameProvenance::Fallback) => self.fallback += 1,
            DrawOutcome::Dropped => self.dropped += 1,
        }
    }
}

struct Preparation {
    strategy: Arc<dyn FramePreparationStrategy>,
    preparer: Arc<dyn FramePreparer>,
}

/// Plays one animated image: picks or produces a buffer for each requested frame and draws it.
///
/// For every [`draw_frame`](Self::draw_frame) the driver tries, in order:
///
/// 1. the cached frame,
/// 2. rendering into a buffer the cache offers for reuse,
/// 3. rendering into a freshly allocated buffer,
/// 4. the cache's fallback frame,
///
/// and reports a dropped frame when all of them fail. Every buffer obtained along the way is
/// closed before `draw_frame` returns. Frames drawn by steps 1 to 3 are reported to the cache
/// through [`FrameCache::on_frame_rendered`]; fallback frames never are.
///
/// The draw path is not internally synchronized: `draw_frame` takes `&mut self`. Background
/// preparation runs concurrently against the same thread-safe [`FrameCache`].
pub struct AnimationDriver {
    info: Arc<dyn AnimationInformation>,
    renderer: Arc<dyn FrameRenderer>,
    allocator: Arc<dyn BufferAllocator>,
    cache: Arc<dyn FrameCache>,
    preparation: Option<Preparation>,
    listener: Option<Arc<dyn FrameListener>>,
    opts: DriverOpts,
    bounds: Option<Bounds>,
    bitmap_width: Dimension,
    bitmap_height: Dimension,
    stats: DriverStats,
    closed: Arc<AtomicBool>,
}

impl AnimationDriver {
    /// Create a driver without background preparation.
    pub fn new(
        info: Arc<dyn AnimationInformation>,
        renderer: Arc<dyn FrameRenderer>,
        cache: Arc<dyn FrameCache>,
        allocator: Arc<dyn BufferAllocator>,
        opts: DriverOpts,
    ) -> Self {
        let mut driver = Self {
            info,
            renderer,
            allocator,
            cache,
            preparation: None,
            listener: None,
            opts,
            bounds: None,
            bitmap_width: Dimension::Unset,
            bitmap_height: Dimension::Unset,
            stats: DriverStats::default(),
            closed: Arc::new(AtomicBool::new(false)),
        };
        driver.update_bitmap_dimensions();
        driver
    }

    /// Run `strategy` through `preparer` after every draw.
    pub fn with_preparation(
        mut self,
        strategy: Arc<dyn FramePreparationStrategy>,
        preparer: Arc<dyn FramePreparer>,
    ) -> Self {
        self.preparation = Some(Preparation { strategy, preparer });
        self
    }

    /// Install `listener` for draw decisions.
    pub fn with_frame_listener(mut self, listener: Arc<dyn FrameListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Install or remove the draw listener.
    pub fn set_frame_listener(&mut self, listener: Option<Arc<dyn FrameListener>>) {
        self.listener = listener;
    }

    /// Set the destination rectangle, or clear it with `None`.
    pub fn set_bounds(&mut self, bounds: Option<Bounds>) {
        self.bounds = bounds;
        self.renderer.set_bounds(bounds);
        self.update_bitmap_dimensions();
    }

    /// Current destination rectangle.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Intrinsic width of the animation.
    pub fn intrinsic_width(&self) -> Dimension {
        self.info.width()
    }

    /// Intrinsic height of the animation.
    pub fn intrinsic_height(&self) -> Dimension {
        self.info.height()
    }

    /// Width of buffers the driver renders into: the renderer's intrinsic width, else the bounds.
    pub fn bitmap_width(&self) -> Dimension {
        self.bitmap_width
    }

    /// Height of buffers the driver renders into: the renderer's intrinsic height, else the bounds.
    pub fn bitmap_height(&self) -> Dimension {
        self.bitmap_height
    }

    /// Format of buffers the driver allocates.
    pub fn pixel_format(&self) -> PixelFormat {
        self.opts.pixel_format
    }

    /// Renderer shared with the preparer.
    pub fn renderer(&self) -> &Arc<dyn FrameRenderer> {
        &self.renderer
    }

    /// Allocator shared with the preparer.
    pub fn allocator(&self) -> &Arc<dyn BufferAllocator> {
        &self.allocator
    }

    /// Frame cache of this animation.
    pub fn cache(&self) -> &Arc<dyn FrameCache> {
        &self.cache
    }

    /// Draw counters since construction.
    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    /// Bytes retained on behalf of this animation.
    pub fn size_in_bytes(&self) -> usize {
        self.cache.size_in_bytes()
    }

    /// Return `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Flag raised by [`close`](Self::close), shared with background jobs of this animation.
    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Draw `frame` onto `canvas`.
    #[tracing::instrument(level = "trace", skip(self, canvas), fields(provenance))]
    pub fn draw_frame(&mut self, canvas: &mut dyn Canvas, frame: usize) -> DrawOutcome {
        if let Some(listener) = self.listener.clone() {
            listener.on_draw_frame_start(self, frame);
        }

        let closed = self.is_closed();
        let outcome = if closed {
            tracing::debug!(frame, "draw on closed driver dropped");
            DrawOutcome::Dropped
        } else if frame < self.frame_count() {
            self.draw_frame_or_fallback(canvas, frame)
        } else {
            tracing::warn!(frame, frame_count = self.frame_count(), "frame out of range");
            DrawOutcome::Dropped
        };
        self.stats.record(outcome);

        match outcome {
            DrawOutcome::Drawn(provenance) => {
                tracing::Span::current().record("provenance", provenance.as_str());
                if let Some(listener) = self.listener.clone() {
                    listener.on_frame_drawn(self, frame, provenance);
                }
            }
            DrawOutcome::Dropped => {
                if !closed {
                    self.cache.on_frame_dropped(frame);
                }
                if let Some(listener) = self.listener.clone() {
                    listener.on_frame_dropped(self, frame);
                }
            }
        }

        if let Some(prep) = &self.preparation
            && !closed
        {
            prep.strategy
                .prepare_frames(prep.preparer.as_ref(), &self.cache, self, frame);
        }
        outcome
    }

    /// Start preparing the opening frames before the first draw.
    pub fn preload_animation(&self) {
        if self.is_closed() {
            return;
        }
        if let Some(prep) = &self.preparation {
            prep.strategy
                .prepare_frames(prep.preparer.as_ref(), &self.cache, self, 0);
        }
    }

    /// Release every cached frame.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// The host stopped showing the animation; cached frames are released.
    pub fn on_inactive(&self) {
        tracing::debug!("animation inactive, clearing frame cache");
        self.clear();
    }

    /// Release every buffer held on behalf of this animation. Later draws are dropped, and
    /// preparation jobs still queued for it discard their frames instead of caching them.
    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cache.set_frame_cache_listener(None);
        self.clear();
    }

    fn update_bitmap_dimensions(&mut self) {
        let from_bounds = |px: fn(Bounds) -> u32| {
            self.bounds
                .map_or(Dimension::Unset, |b| Dimension::from_px(px(b)))
        };
        let width = self.renderer.intrinsic_width().or(from_bounds(Bounds::width));
        let height = self
            .renderer
            .intrinsic_height()
            .or(from_bounds(Bounds::height));
        self.bitmap_width = width;
        self.bitmap_height = height;
    }

    fn draw_frame_or_fallback(&mut self, canvas: &mut dyn Canvas, frame: usize) -> DrawOutcome {
        if let Some(cached) = self.cache.get_cached_frame(frame)
            && self.draw_buffer(canvas, &cached)
        {
            self.cache
                .on_frame_rendered(frame, &cached, FrameProvenance::Cached);
            return DrawOutcome::Drawn(FrameProvenance::Cached);
        }

        let width = self.bitmap_width.px_or_zero();
        let height = self.bitmap_height.px_or_zero();

        let reuse = self.cache.get_buffer_to_reuse_for_frame(frame, width, height);
        debug_assert!(
            reuse
                .as_ref()
                .is_none_or(|b| b.get().is_ok_and(|b| b.has_size(width, height))),
            "cache offered a reuse buffer of the wrong size"
        );
        if let Some(reuse) = reuse
            && let Some(outcome) =
                self.render_and_draw(canvas, frame, reuse, FrameProvenance::Reused)
        {
            return outcome;
        }

        match self
            .allocator
            .create_buffer(width, height, self.opts.pixel_format)
        {
            Ok(created) => {
                if let Some(outcome) =
                    self.render_and_draw(canvas, frame, created, FrameProvenance::Created)
                {
                    return outcome;
                }
            }
            Err(e) => {
                self.stats.allocation_failures += 1;
                tracing::warn!(frame, width, height, error = %e, "frame buffer allocation failed");
            }
        }

        if let Some(fallback) = self.cache.get_fallback_frame(frame)
            && self.draw_buffer(canvas, &fallback)
        {
            return DrawOutcome::Drawn(FrameProvenance::Fallback);
        }
        DrawOutcome::Dropped
    }

    /// Render `frame` into `buffer`, draw it and report it to the cache. `None` when rendering
    /// failed; `buffer` is closed either way.
    fn render_and_draw(
        &mut self,
        canvas: &mut dyn Canvas,
        frame: usize,
        mut buffer: OwnedRef<Bitmap>,
        provenance: FrameProvenance,
    ) -> Option<DrawOutcome> {
        if !self.render_into(frame, &mut buffer, provenance) || !self.draw_buffer(canvas, &buffer) {
            return None;
        }
        self.cache.on_frame_rendered(frame, &buffer, provenance);
        Some(DrawOutcome::Drawn(provenance))
    }

    fn render_into(
        &mut self,
        frame: usize,
        buffer: &mut OwnedRef<Bitmap>,
        provenance: FrameProvenance,
    ) -> bool {
        let source = provenance.as_str();
        let target = match buffer.get_mut() {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(frame, source, error = %e, "buffer not writable");
                self.stats.render_failures += 1;
                return false;
            }
        };
        match self.renderer.render_frame(frame, target) {
            Ok(true) => true,
            Ok(false) => {
                self.stats.render_failures += 1;
                tracing::debug!(frame, source, "renderer skipped frame");
                false
            }
            Err(e) => {
                self.stats.render_failures += 1;
                tracing::warn!(frame, source, error = %e, "render failed");
                false
            }
        }
    }

    fn draw_buffer(&self, canvas: &mut dyn Canvas, buffer: &OwnedRef<Bitmap>) -> bool {
        match buffer.get() {
            Ok(bitmap) => {
                canvas.draw_bitmap(bitmap, self.bounds);
                true
            }
            Err(_) => false,
        }
    }
}

impl AnimationInformation for AnimationDriver {
    fn frame_count(&self) -> usize {
        self.info.frame_count()
    }

    fn frame_duration_ms(&self, frame: usize) -> u32 {
        self.info.frame_duration_ms(frame)
    }

    fn loop_count(&self) -> LoopCount {
        self.opts
            .loop_count_override
            .map_or_else(|| self.info.loop_count(), LoopCountOverride::resolve)
    }

    fn width(&self) -> Dimension {
        self.intrinsic_width()
    }

    fn height(&self) -> Dimension {
        self.intrinsic_height()
    }
}

impl Drop for AnimationDriver {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for AnimationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationDriver")
            .field("frame_count", &self.info.frame_count())
            .field("bounds", &self.bounds)
            .field("bitmap_width", &self.bitmap_width)
            .field("bitmap_height", &self.bitmap_height)
            .field("stats", &self.stats)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/driver/animation_driver.rs"]
mod tests;
