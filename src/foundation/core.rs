use crate::foundation::error::{ReelError, ReelResult};

/// Intrinsic size along one axis: either unset or a positive pixel count.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// No intrinsic size; the natural size of whatever gets produced is used.
    #[default]
    Unset,
    /// Positive size in pixels.
    Px(u32),
}

impl Dimension {
    /// Build a dimension from a raw pixel count, mapping `0` to [`Dimension::Unset`].
    pub fn from_px(px: u32) -> Self {
        if px == 0 { Self::Unset } else { Self::Px(px) }
    }

    /// Pixel count, or `None` when unset.
    pub fn get(self) -> Option<u32> {
        match self {
            Self::Unset => None,
            Self::Px(px) => Some(px),
        }
    }

    /// Pixel count, or `0` when unset.
    pub fn px_or_zero(self) -> u32 {
        self.get().unwrap_or(0)
    }

    /// Return `true` when no size is set.
    pub fn is_unset(self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Return `self` when set, otherwise `other`.
    pub fn or(self, other: Dimension) -> Dimension {
        if self.is_unset() { other } else { self }
    }
}

/// Integer destination rectangle `[left, right) x [top, bottom)` in host coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Bounds {
    /// Left edge (inclusive).
    pub left: i32,
    /// Top edge (inclusive).
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Bounds {
    /// Create validated bounds with `left <= right` and `top <= bottom`.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> ReelResult<Self> {
        if left > right || top > bottom {
            return Err(ReelError::validation(
                "Bounds must satisfy left <= right and top <= bottom",
            ));
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Bounds anchored at the origin with the given size.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: i32::try_from(width).unwrap_or(i32::MAX),
            bottom: i32::try_from(height).unwrap_or(i32::MAX),
        }
    }

    /// Width in pixels.
    pub fn width(self) -> u32 {
        self.right.saturating_sub(self.left).max(0) as u32
    }

    /// Height in pixels.
    pub fn height(self) -> u32 {
        self.bottom.saturating_sub(self.top).max(0) as u32
    }

    /// Return `true` when the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Pixel layout of a frame buffer.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Premultiplied RGBA8 (r,g,b already multiplied by a).
    #[default]
    Rgba8Premul,
    /// Straight-alpha RGBA8.
    Rgba8,
    /// Single 8-bit alpha channel.
    Alpha8,
}

impl PixelFormat {
    /// Bytes used by one pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8Premul | Self::Rgba8 => 4,
            Self::Alpha8 => 1,
        }
    }

    /// Bytes needed by a `width x height` buffer, saturating on overflow.
    pub fn byte_len(self, width: u32, height: u32) -> usize {
        (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(self.bytes_per_pixel())
    }
}

/// How many times an animation plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopCount {
    /// Play the given number of loops.
    Finite(u32),
    /// Loop forever.
    #[default]
    Infinite,
}

impl LoopCount {
    /// Return `true` for [`LoopCount::Infinite`].
    pub fn is_infinite(self) -> bool {
        matches!(self, Self::Infinite)
    }
}

/// Caller override for the loop count encoded in the animation itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopCountOverride {
    /// Loop forever regardless of the encoded count.
    Infinite,
    /// Play exactly once.
    Static,
    /// Play the given number of loops.
    Finite(u32),
}

impl LoopCountOverride {
    /// Resolve the override into an effective [`LoopCount`].
    pub fn resolve(self) -> LoopCount {
        match self {
            Self::Infinite => LoopCount::Infinite,
            Self::Static => LoopCount::Finite(1),
            Self::Finite(n) => LoopCount::Finite(n),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
