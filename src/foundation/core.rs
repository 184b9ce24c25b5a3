use crate::foundation::error::{ScrubError, ScrubResult};

/// 1-based identifier of a still frame. Adjacent indices are visually adjacent.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u32);

impl FrameIndex {
    /// First frame of every sequence.
    pub const FIRST: FrameIndex = FrameIndex(1);

    /// Absolute index distance between two frames.
    pub fn distance(self, other: FrameIndex) -> u32 {
        self.0.abs_diff(other.0)
    }

    /// Clamp into `[1, total_frames]`.
    pub fn clamp_to(self, total_frames: u32) -> FrameIndex {
        FrameIndex(self.0.clamp(1, total_frames.max(1)))
    }
}

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive range of frame indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameWindow {
    /// First frame in the window.
    pub start: FrameIndex,
    /// Last frame in the window (inclusive).
    pub end: FrameIndex,
}

impl FrameWindow {
    /// Build a window, rejecting index 0 and reversed bounds.
    pub fn new(start: FrameIndex, end: FrameIndex) -> ScrubResult<Self> {
        if start.0 == 0 {
            return Err(ScrubError::validation("FrameWindow start must be >= 1"));
        }
        if start.0 > end.0 {
            return Err(ScrubError::validation("FrameWindow start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Symmetric window `[max(1, center - radius), min(total_frames, center + radius)]`.
    ///
    /// `center` is clamped into the sequence first, so the window never reaches index 0 or
    /// `total_frames + 1`.
    pub fn around(center: FrameIndex, radius: u32, total_frames: u32) -> Self {
        let total_frames = total_frames.max(1);
        let center = center.clamp_to(total_frames);
        Self {
            start: FrameIndex(center.0.saturating_sub(radius).max(1)),
            end: FrameIndex(center.0.saturating_add(radius).min(total_frames)),
        }
    }

    /// Number of frames covered.
    pub fn len_frames(self) -> u32 {
        self.end.0 - self.start.0 + 1
    }

    /// Whether `f` lies inside the window.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 <= self.end.0
    }

    /// Ascending iterator over the window.
    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..=self.end.0).map(FrameIndex)
    }
}

/// Drawing surface size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Build a viewport; both dimensions must be non-zero.
    pub fn new(width: u32, height: u32) -> ScrubResult<Self> {
        if width == 0 || height == 0 {
            return Err(ScrubError::validation("viewport width/height must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Width divided by height.
    pub fn aspect_ratio(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
