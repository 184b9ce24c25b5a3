use crate::fetch::dispatch::FrameDispatch;
use crate::foundation::core::FrameIndex;
use crate::schedule::scheduler::{DisplayFrame, FrameScheduler};

/// Map scroll progress in `[0, 1]` to a frame: `round(p * (total - 1)) + 1`.
///
/// Out-of-range progress is clamped; NaN and infinities map to the first frame.
pub fn frame_for_progress(progress: f64, total_frames: u32) -> FrameIndex {
    let total = total_frames.max(1);
    if !progress.is_finite() {
        return FrameIndex::FIRST;
    }
    let p = progress.clamp(0.0, 1.0);
    let idx = (p * f64::from(total - 1)).round() as u32 + 1;
    FrameIndex(idx).clamp_to(total)
}

/// What the caller should do with the canvas after a scroll or refresh.
#[derive(Clone, Debug)]
pub enum PaintDecision {
    /// Progress maps to the frame already targeted; nothing was requested.
    Unchanged,
    /// Paint this frame.
    Paint(DisplayFrame),
    /// The best available frame is already on the canvas.
    KeepCurrent,
    /// Nothing is cached yet.
    NothingToPaint,
}

impl PaintDecision {
    /// The frame to paint, if any.
    pub fn frame(&self) -> Option<&DisplayFrame> {
        match self {
            PaintDecision::Paint(f) => Some(f),
            _ => None,
        }
    }
}

/// Turns scroll positions into frame requests and paint decisions.
///
/// A [`PaintDecision::Paint`] is assumed to be painted by the caller; later decisions compare
/// against it.
#[derive(Debug)]
pub struct PlaybackDriver {
    total_frames: u32,
    current: Option<FrameIndex>,
    last_painted: Option<FrameIndex>,
}

impl PlaybackDriver {
    /// Driver for a sequence of `total_frames`.
    pub fn new(total_frames: u32) -> Self {
        Self {
            total_frames: total_frames.max(1),
            current: None,
            last_painted: None,
        }
    }

    /// Frame currently targeted.
    pub fn current(&self) -> Option<FrameIndex> {
        self.current
    }

    /// Frame last handed out for painting.
    pub fn last_painted(&self) -> Option<FrameIndex> {
        self.last_painted
    }

    /// Handle a scroll event. Requests a frame only when the mapped index changes.
    #[tracing::instrument(level = "trace", skip(self, scheduler, dispatch))]
    pub fn on_scroll(
        &mut self,
        progress: f64,
        scheduler: &mut FrameScheduler,
        dispatch: &mut dyn FrameDispatch,
    ) -> PaintDecision {
        let index = frame_for_progress(progress, self.total_frames);
        if self.current == Some(index) {
            return PaintDecision::Unchanged;
        }
        self.current = Some(index);
        let shown = scheduler.request_frame(index, dispatch);
        self.decide(shown)
    }

    /// Re-evaluate the current target after new frames arrived, without dispatching.
    pub fn refresh(&mut self, scheduler: &mut FrameScheduler) -> PaintDecision {
        let Some(index) = self.current else {
            return PaintDecision::NothingToPaint;
        };
        let shown = scheduler.displayable(index);
        self.decide(shown)
    }

    /// Forget the target and the painted frame.
    pub fn reset(&mut self) {
        self.current = None;
        self.last_painted = None;
    }

    fn decide(&mut self, shown: Option<DisplayFrame>) -> PaintDecision {
        match shown {
            None => PaintDecision::NothingToPaint,
            Some(f) if self.last_painted == Some(f.shown) => PaintDecision::KeepCurrent,
            Some(f) => {
                self.last_painted = Some(f.shown);
                PaintDecision::Paint(f)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/driver.rs"]
mod tests;
