use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::fetch::dispatch::FrameDispatch;
use crate::foundation::config::StreamConfig;
use crate::foundation::core::FrameIndex;
use crate::schedule::scheduler::FrameScheduler;

struct BulkBatch {
    due: Duration,
    frames: Vec<FrameIndex>,
}

/// Staggered background load of the whole sequence.
///
/// The sequence is cut into batches of `batch_size`; the batch starting at 0-based offset `o` is
/// due `o * stagger_per_frame` after `started`. Nothing runs on its own: the owner calls
/// [`BulkLoad::poll`] and due batches are handed to the scheduler, which drops frames that are
/// already cached or pending by then.
pub struct BulkLoad {
    started: Instant,
    batches: VecDeque<BulkBatch>,
    dispatched: usize,
    skipped: usize,
}

impl BulkLoad {
    /// Plan every batch up front.
    pub fn plan(
        total_frames: u32,
        batch_size: usize,
        stagger_per_frame: Duration,
        started: Instant,
    ) -> Self {
        // Batch sizes beyond the u32 index space collapse into a single batch.
        let batch_size = u32::try_from(batch_size).unwrap_or(u32::MAX).max(1);
        let batches = (0..total_frames)
            .step_by(batch_size as usize)
            .map(|offset| {
                let end = offset.saturating_add(batch_size).min(total_frames);
                BulkBatch {
                    due: stagger_per_frame.saturating_mul(offset),
                    frames: (offset + 1..=end).map(FrameIndex).collect(),
                }
            })
            .collect();
        Self {
            started,
            batches,
            dispatched: 0,
            skipped: 0,
        }
    }

    /// Plan from a session config.
    pub fn from_config(config: &StreamConfig, started: Instant) -> Self {
        Self::plan(
            config.total_frames,
            config.batch_size,
            config.stagger_per_frame(),
            started,
        )
    }

    /// Release every batch due at `now`. Returns how many batches were released.
    pub fn poll(
        &mut self,
        now: Instant,
        scheduler: &mut FrameScheduler,
        dispatch: &mut dyn FrameDispatch,
    ) -> usize {
        let elapsed = now.saturating_duration_since(self.started);
        let mut released = 0usize;
        while let Some(front) = self.batches.front()
            && front.due <= elapsed
        {
            let Some(batch) = self.batches.pop_front() else {
                break;
            };
            released += 1;
            let first = batch.frames.first().copied();
            match scheduler.dispatch_bulk(batch.frames, dispatch) {
                Some(id) => {
                    self.dispatched += 1;
                    debug!(batch = %id, ?first, "bulk batch released");
                }
                None => {
                    self.skipped += 1;
                    debug!(?first, "bulk batch had nothing left to fetch");
                }
            }
        }
        released
    }

    /// When the next batch becomes due.
    pub fn next_due_at(&self) -> Option<Instant> {
        self.batches.front().map(|b| self.started + b.due)
    }

    /// Whether every batch has been released.
    pub fn is_finished(&self) -> bool {
        self.batches.is_empty()
    }

    /// Batches not released yet.
    pub fn remaining(&self) -> usize {
        self.batches.len()
    }

    /// Released batches that produced a dispatch.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Released batches with nothing left to fetch.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/bulk.rs"]
mod tests;
