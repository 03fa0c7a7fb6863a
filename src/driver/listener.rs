use crate::cache::frame_cache::FrameProvenance;
use crate::driver::animation_driver::AnimationDriver;

/// Observer of per-draw decisions made by an [`AnimationDriver`].
///
/// All methods default to no-ops so observers implement only what they need.
pub trait FrameListener: Send + Sync {
    /// A draw of `frame` is starting.
    fn on_draw_frame_start(&self, _driver: &AnimationDriver, _frame: usize) {}

    /// `frame` was drawn from a buffer obtained through `provenance`.
    fn on_frame_drawn(
        &self,
        _driver: &AnimationDriver,
        _frame: usize,
        _provenance: FrameProvenance,
    ) {
    }

    /// Nothing could be drawn for `frame`.
    fn on_frame_dropped(&self, _driver: &AnimationDriver, _frame: usize) {}
}
