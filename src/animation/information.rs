use crate::foundation::core::{Dimension, LoopCount};
use crate::foundation::error::{ReelError, ReelResult};

/// Timing and size metadata of an animated image.
pub trait AnimationInformation: Send + Sync {
    /// Number of frames in one loop.
    fn frame_count(&self) -> usize;

    /// Display duration of `frame` in milliseconds. Out-of-range frames report `0`.
    fn frame_duration_ms(&self, frame: usize) -> u32;

    /// How many times the animation plays.
    fn loop_count(&self) -> LoopCount;

    /// Intrinsic width of the animation.
    fn width(&self) -> Dimension;

    /// Intrinsic height of the animation.
    fn height(&self) -> Dimension;

    /// Duration of one full loop (sum of all frame durations).
    fn loop_duration_ms(&self) -> u64 {
        (0..self.frame_count())
            .map(|f| u64::from(self.frame_duration_ms(f)))
            .sum()
    }
}

/// Plain-data [`AnimationInformation`], typically produced by a container decoder.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnimationMetadata {
    /// Per-frame durations in milliseconds; its length is the frame count.
    pub frame_durations_ms: Vec<u32>,
    /// Encoded loop count.
    pub loop_count: LoopCount,
    /// Intrinsic width.
    pub width: Dimension,
    /// Intrinsic height.
    pub height: Dimension,
}

impl AnimationMetadata {
    /// Metadata where every frame has the same duration.
    pub fn uniform(
        frame_count: usize,
        frame_duration_ms: u32,
        loop_count: LoopCount,
        width: Dimension,
        height: Dimension,
    ) -> Self {
        Self {
            frame_durations_ms: vec![frame_duration_ms; frame_count],
            loop_count,
            width,
            height,
        }
    }

    /// Reject metadata no scheduler can play.
    pub fn validate(&self) -> ReelResult<()> {
        if self.frame_durations_ms.is_empty() {
            return Err(ReelError::validation("animation must have at least one frame"));
        }
        if self.frame_durations_ms.iter().all(|&d| d == 0) {
            return Err(ReelError::validation(
                "animation must have at least one frame with a non-zero duration",
            ));
        }
        Ok(())
    }

    /// Parse metadata from JSON.
    pub fn from_json_str(json: &str) -> ReelResult<Self> {
        let meta: Self =
            serde_json::from_str(json).map_err(|e| ReelError::serde(e.to_string()))?;
        meta.validate()?;
        Ok(meta)
    }
}

impl AnimationInformation for AnimationMetadata {
    fn frame_count(&self) -> usize {
        self.frame_durations_ms.len()
    }

    fn frame_duration_ms(&self, frame: usize) -> u32 {
        self.frame_durations_ms.get(frame).copied().unwrap_or(0)
    }

    fn loop_count(&self) -> LoopCount {
        self.loop_count
    }

    fn width(&self) -> Dimension {
        self.width
    }

    fn height(&self) -> Dimension {
        self.height
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/information.rs"]
mod tests;
