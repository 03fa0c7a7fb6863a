use crate::animation::information::AnimationInformation;
use crate::foundation::core::LoopCount;

/// Maps elapsed animation time to the frame that should be on screen.
///
/// Frames whose display window was missed are skipped rather than shown late, so playback stays in
/// sync with wall-clock time on slow hosts. Timing is snapshotted at construction.
#[derive(Clone, Debug)]
pub struct DropFramesScheduler {
    frame_durations_ms: Vec<u32>,
    loop_count: LoopCount,
    loop_duration_ms: u64,
}

impl DropFramesScheduler {
    /// Snapshot timing from `info`.
    pub fn new(info: &dyn AnimationInformation) -> Self {
        let frame_durations_ms: Vec<u32> = (0..info.frame_count())
            .map(|f| info.frame_duration_ms(f))
            .collect();
        let loop_duration_ms = frame_durations_ms.iter().map(|&d| u64::from(d)).sum();
        Self {
            frame_durations_ms,
            loop_count: info.loop_count(),
            loop_duration_ms,
        }
    }

    /// Duration of one loop in milliseconds.
    pub fn loop_duration_ms(&self) -> u64 {
        self.loop_duration_ms
    }

    /// Return `true` when the animation never finishes.
    pub fn is_infinite_animation(&self) -> bool {
        self.loop_count.is_infinite()
    }

    fn is_done_at(&self, animation_time_ms: u64) -> bool {
        match self.loop_count {
            LoopCount::Infinite => false,
            LoopCount::Finite(loops) => {
                animation_time_ms / self.loop_duration_ms >= u64::from(loops)
            }
        }
    }

    /// Frame to render at `animation_time_ms`, or `None` once every loop has played.
    ///
    /// Animations without any duration always show frame 0.
    pub fn frame_number_to_render(&self, animation_time_ms: u64) -> Option<usize> {
        if self.loop_duration_ms == 0 {
            return Some(0);
        }
        if self.is_done_at(animation_time_ms) {
            return None;
        }
        Some(self.frame_number_within_loop(animation_time_ms % self.loop_duration_ms))
    }

    /// Frame shown at `time_in_loop_ms` into a single loop.
    pub fn frame_number_within_loop(&self, time_in_loop_ms: u64) -> usize {
        let mut elapsed = 0u64;
        for (frame, &d) in self.frame_durations_ms.iter().enumerate() {
            elapsed += u64::from(d);
            if time_in_loop_ms < elapsed {
                return frame;
            }
        }
        self.frame_durations_ms.len().saturating_sub(1)
    }

    /// Offset of `frame` from the start of its loop.
    pub fn target_render_time_ms(&self, frame: usize) -> u64 {
        self.frame_durations_ms
            .iter()
            .take(frame)
            .map(|&d| u64::from(d))
            .sum()
    }

    /// Absolute animation time at which the frame after the one shown at `animation_time_ms`
    /// starts, or `None` when nothing follows.
    pub fn target_render_time_for_next_frame_ms(&self, animation_time_ms: u64) -> Option<u64> {
        if self.loop_duration_ms == 0 || self.is_done_at(animation_time_ms) {
            return None;
        }
        let time_in_loop = animation_time_ms % self.loop_duration_ms;
        let mut next_frame_start = 0u64;
        for &d in &self.frame_durations_ms {
            if next_frame_start > time_in_loop {
                break;
            }
            next_frame_start += u64::from(d);
        }
        Some(animation_time_ms + (next_frame_start - time_in_loop))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/scheduler.rs"]
mod tests;
