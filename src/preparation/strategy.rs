use std::sync::Arc;

use crate::animation::information::AnimationInformation;
use crate::cache::frame_cache::FrameCache;
use crate::driver::animation_driver::AnimationDriver;
use crate::preparation::preparer::FramePreparer;

/// Decides which upcoming frames are worth rendering ahead of the draw path.
///
/// Called by the driver after every draw. Advisory only: a frame that is not prepared in time is
/// simply rendered synchronously later.
pub trait FramePreparationStrategy: Send + Sync {
    /// Hand frames following `last_drawn` to `preparer`.
    fn prepare_frames(
        &self,
        preparer: &dyn FramePreparer,
        cache: &Arc<dyn FrameCache>,
        driver: &AnimationDriver,
        last_drawn: usize,
    );
}

/// Strategy that never prepares anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpStrategy;

impl FramePreparationStrategy for NoOpStrategy {
    fn prepare_frames(
        &self,
        _preparer: &dyn FramePreparer,
        _cache: &Arc<dyn FrameCache>,
        _driver: &AnimationDriver,
        _last_drawn: usize,
    ) {
    }
}

/// Prepares the next `frames_to_prepare` frames after the one just drawn, wrapping around the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FixedNumberStrategy {
    /// Look-ahead distance in frames.
    pub frames_to_prepare: usize,
}

impl Default for FixedNumberStrategy {
    fn default() -> Self {
        Self {
            frames_to_prepare: 3,
        }
    }
}

impl FixedNumberStrategy {
    /// Strategy with the given look-ahead.
    pub fn new(frames_to_prepare: usize) -> Self {
        Self { frames_to_prepare }
    }

    /// Frames to prepare after `last_drawn` in an animation of `frame_count` frames.
    ///
    /// Never includes `last_drawn` itself, so the look-ahead is capped at `frame_count - 1`.
    pub fn frames_after(&self, last_drawn: usize, frame_count: usize) -> Vec<usize> {
        if frame_count == 0 {
            return Vec::new();
        }
        let ahead = self.frames_to_prepare.min(frame_count - 1);
        (1..=ahead)
            .map(|i| (last_drawn + i) % frame_count)
            .collect()
    }
}

impl FramePreparationStrategy for FixedNumberStrategy {
    fn prepare_frames(
        &self,
        preparer: &dyn FramePreparer,
        cache: &Arc<dyn FrameCache>,
        driver: &AnimationDriver,
        last_drawn: usize,
    ) {
        for frame in self.frames_after(last_drawn, driver.frame_count()) {
            if !preparer.prepare_frame(cache, driver, frame) {
                tracing::debug!(frame, "preparer refused frame, stopping look-ahead");
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/preparation/strategy.rs"]
mod tests;
