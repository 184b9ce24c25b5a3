use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::assets::decode::{FrameImage, decode_frame};
use crate::assets::source::{FrameSource, SourceTable};
use crate::cache::frame_cache::{CacheInsert, FrameCache};
use crate::fetch::dispatch::FrameDispatch;
use crate::fetch::protocol::{
    BatchError, BatchId, BlobsLoaded, LoadFrames, LoadedBlob, WorkerResponse,
};
use crate::foundation::config::StreamConfig;
use crate::foundation::core::{FrameIndex, FrameWindow};
use crate::foundation::error::ScrubResult;

/// Image chosen for a requested frame.
#[derive(Clone, Debug)]
pub struct DisplayFrame {
    /// Frame that was asked for.
    pub requested: FrameIndex,
    /// Frame actually returned (closest cached frame when `requested` is not cached yet).
    pub shown: FrameIndex,
    /// Decoded image of `shown`.
    pub image: Arc<FrameImage>,
}

impl DisplayFrame {
    /// Whether the requested frame itself is shown.
    pub fn is_exact(&self) -> bool {
        self.requested == self.shown
    }
}

/// Load progress for the whole sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Progress {
    /// Distinct frames loaded at least once.
    pub loaded: u32,
    /// Sequence length.
    pub total: u32,
}

impl Progress {
    /// Rounded percentage in `[0, 100]`.
    pub fn percent(self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (f64::from(self.loaded) / f64::from(self.total) * 100.0).round() as u32
    }

    /// Whether every frame has been loaded.
    pub fn is_complete(self) -> bool {
        self.total > 0 && self.loaded >= self.total
    }
}

/// Scheduler counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SchedulerStats {
    /// Batches accepted by the dispatch side.
    pub batches_dispatched: u64,
    /// Frames inside accepted batches.
    pub frames_dispatched: u64,
    /// Batches the dispatch side refused.
    pub dispatch_rejected: u64,
    /// Frames decoded and inserted.
    pub frames_inserted: u64,
    /// Fetch error reports plus decode failures.
    pub frames_failed: u64,
    /// Batches closed by an error report.
    pub batches_failed: u64,
    /// Cache entries evicted by the capacity policy.
    pub evictions: u64,
    /// Responses for unknown batches or received after teardown.
    pub stale_responses: u64,
}

/// Frames one `request_frame` call would dispatch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowPlan {
    /// The target itself, when neither cached nor pending.
    pub priority: Option<FrameIndex>,
    /// The rest of the window in ascending order.
    pub regular: Vec<FrameIndex>,
}

/// Frame cache and fetch scheduler.
///
/// Owns the cache, the pending set and the in-flight batch table. All mutation happens through
/// `&mut self` on the owning thread; the worker only ever sees [`LoadFrames`] messages.
pub struct FrameScheduler {
    total_frames: u32,
    buffer_radius: u32,
    sources: SourceTable,
    cache: FrameCache,
    pending: HashSet<FrameIndex>,
    in_flight: HashMap<BatchId, Vec<FrameIndex>>,
    next_batch: u64,
    ever_loaded: Vec<bool>,
    loaded: u32,
    target: Option<FrameIndex>,
    stats: SchedulerStats,
    torn_down: bool,
}

impl FrameScheduler {
    /// Build a scheduler from a validated config.
    pub fn new(config: &StreamConfig) -> ScrubResult<Self> {
        config.validate()?;
        let sources = SourceTable::build(&config.source, config.total_frames)?;
        Ok(Self {
            total_frames: config.total_frames,
            buffer_radius: config.buffer_radius,
            sources,
            cache: FrameCache::new(config.total_frames, config.cache_capacity()),
            pending: HashSet::new(),
            in_flight: HashMap::new(),
            next_batch: 0,
            ever_loaded: vec![false; config.total_frames as usize],
            loaded: 0,
            target: None,
            stats: SchedulerStats::default(),
            torn_down: false,
        })
    }

    /// Sequence length.
    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Preload radius.
    pub fn buffer_radius(&self) -> u32 {
        self.buffer_radius
    }

    /// Most recent target passed to [`FrameScheduler::request_frame`].
    pub fn target(&self) -> Option<FrameIndex> {
        self.target
    }

    /// Locator table for this session.
    pub fn sources(&self) -> &SourceTable {
        &self.sources
    }

    /// Read access to the cache.
    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    /// Whether `index` is cached.
    pub fn is_cached(&self, index: FrameIndex) -> bool {
        self.cache.contains(index)
    }

    /// Whether `index` is in flight.
    pub fn is_pending(&self, index: FrameIndex) -> bool {
        self.pending.contains(&index)
    }

    /// Number of frames in flight.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of batches still awaiting a response.
    pub fn in_flight_batches(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether [`FrameScheduler::teardown`] has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Preload window around `index` (clamped into the sequence).
    pub fn preload_window(&self, index: FrameIndex) -> FrameWindow {
        FrameWindow::around(index, self.buffer_radius, self.total_frames)
    }

    /// Split the window around `index` into the priority frame and the regular buffer, skipping
    /// frames already cached or pending.
    pub fn plan_window(&self, index: FrameIndex) -> WindowPlan {
        let index = index.clamp_to(self.total_frames);
        let mut plan = WindowPlan::default();
        for i in self.preload_window(index).iter() {
            if self.cache.contains(i) || self.pending.contains(&i) {
                continue;
            }
            if i == index {
                plan.priority = Some(i);
            } else {
                plan.regular.push(i);
            }
        }
        plan
    }

    /// Schedule `index` and its window, then return the best displayable frame.
    ///
    /// The exact frame goes out as its own batch before the window batch. Never blocks; returns
    /// `None` only when nothing is cached.
    #[tracing::instrument(level = "debug", skip(self, dispatch))]
    pub fn request_frame(
        &mut self,
        index: FrameIndex,
        dispatch: &mut dyn FrameDispatch,
    ) -> Option<DisplayFrame> {
        if self.torn_down {
            return None;
        }
        let index = index.clamp_to(self.total_frames);
        self.target = Some(index);

        let plan = self.plan_window(index);
        if let Some(p) = plan.priority {
            self.dispatch_indices(vec![p], dispatch);
        }
        if !plan.regular.is_empty() {
            self.dispatch_indices(plan.regular, dispatch);
        }

        self.displayable(index)
    }

    /// Best cached frame for `index` without scheduling anything.
    pub fn displayable(&mut self, index: FrameIndex) -> Option<DisplayFrame> {
        if self.torn_down {
            return None;
        }
        let index = index.clamp_to(self.total_frames);
        let (shown, image) = self.cache.nearest(index)?;
        self.cache.touch(shown);
        Some(DisplayFrame {
            requested: index,
            shown,
            image,
        })
    }

    /// Dispatch the given frames as one batch, skipping anything cached, pending or out of range.
    pub fn dispatch_bulk(
        &mut self,
        indices: impl IntoIterator<Item = FrameIndex>,
        dispatch: &mut dyn FrameDispatch,
    ) -> Option<BatchId> {
        if self.torn_down {
            return None;
        }
        let wanted: Vec<FrameIndex> = indices
            .into_iter()
            .filter(|i| i.0 >= 1 && i.0 <= self.total_frames)
            .filter(|i| !self.cache.contains(*i) && !self.pending.contains(i))
            .collect();
        if wanted.is_empty() {
            return None;
        }
        self.dispatch_indices(wanted, dispatch)
    }

    /// Route a worker response to the matching handler.
    pub fn handle_response(&mut self, resp: WorkerResponse) {
        match resp {
            WorkerResponse::BlobsLoaded(loaded) => self.on_batch_loaded(loaded),
            WorkerResponse::Error(failed) => self.on_batch_failed(failed),
        }
    }

    /// Decode and insert every payload of a batch, in reported order.
    pub fn on_batch_loaded(&mut self, loaded: BlobsLoaded) {
        let BlobsLoaded { batch, blobs } = loaded;
        if self.torn_down {
            self.stats.stale_responses += 1;
            debug!(%batch, "ignoring blobs after teardown");
            return;
        }
        if !self.in_flight.contains_key(&batch) {
            self.stats.stale_responses += 1;
            debug!(%batch, "blobs for unknown batch");
        }

        for LoadedBlob { blob, frame_path } in blobs {
            let Some(index) = self.sources.index_of(&frame_path) else {
                warn!(%batch, frame = %frame_path, "loaded blob has unknown locator");
                continue;
            };
            self.release(batch, index);

            match decode_frame(&blob) {
                Ok(image) => self.insert(index, image),
                Err(e) => {
                    self.stats.frames_failed += 1;
                    warn!(%batch, frame = index.0, error = %e, "frame decode failed");
                }
            }
        }
    }

    /// Record a failed batch: every still-outstanding frame of the batch, the named one included,
    /// leaves the pending set and becomes eligible for a later window request. Errors for a batch
    /// that is already closed only count as failures.
    pub fn on_batch_failed(&mut self, failed: BatchError) {
        let BatchError {
            batch,
            error,
            frame_path,
        } = failed;
        if self.torn_down {
            self.stats.stale_responses += 1;
            debug!(%batch, "ignoring batch error after teardown");
            return;
        }

        self.stats.frames_failed += 1;
        let failed_index = self.sources.index_of(&frame_path);

        // Only frames this batch still owns leave the pending set.
        let abandoned = match self.in_flight.remove(&batch) {
            Some(rest) => {
                self.stats.batches_failed += 1;
                for i in &rest {
                    self.pending.remove(i);
                }
                rest.iter().filter(|i| Some(**i) != failed_index).count()
            }
            None => 0,
        };

        warn!(%batch, frame = %frame_path, abandoned, error = %error, "frame batch failed");
    }

    /// Loaded/total counters.
    pub fn progress_snapshot(&self) -> Progress {
        Progress {
            loaded: self.loaded,
            total: self.total_frames,
        }
    }

    /// Counters since construction.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            evictions: self.cache.evictions(),
            ..self.stats
        }
    }

    /// Release every cached image and forget in-flight work. Later responses are ignored.
    pub fn teardown(&mut self) -> usize {
        let released = self.cache.clear();
        self.pending.clear();
        self.in_flight.clear();
        self.target = None;
        self.torn_down = true;
        info!(released, "frame scheduler torn down");
        released
    }

    fn dispatch_indices(
        &mut self,
        indices: Vec<FrameIndex>,
        dispatch: &mut dyn FrameDispatch,
    ) -> Option<BatchId> {
        let frames: Vec<FrameSource> = indices
            .iter()
            .filter_map(|i| self.sources.source(*i).cloned())
            .collect();
        if frames.is_empty() {
            return None;
        }

        let batch = BatchId(self.next_batch);
        self.next_batch += 1;
        let n = frames.len();

        match dispatch.dispatch(LoadFrames { batch, frames }) {
            Ok(()) => {
                self.pending.extend(indices.iter().copied());
                self.in_flight.insert(batch, indices);
                self.stats.batches_dispatched += 1;
                self.stats.frames_dispatched += n as u64;
                debug!(%batch, frames = n, "frame batch dispatched");
                Some(batch)
            }
            Err(e) => {
                self.stats.dispatch_rejected += 1;
                warn!(%batch, frames = n, error = %e, "frame batch dispatch rejected");
                None
            }
        }
    }

    fn release(&mut self, batch: BatchId, index: FrameIndex) {
        self.pending.remove(&index);
        if let Some(rest) = self.in_flight.get_mut(&batch) {
            rest.retain(|i| *i != index);
            if rest.is_empty() {
                self.in_flight.remove(&batch);
            }
        }
    }

    fn insert(&mut self, index: FrameIndex, image: FrameImage) {
        match self.cache.insert(index, Arc::new(image), self.target) {
            CacheInsert::Inserted { evicted } => {
                self.stats.frames_inserted += 1;
                if !evicted.is_empty() {
                    debug!(frame = index.0, ?evicted, "cache over capacity");
                }
                let seen = &mut self.ever_loaded[(index.0 - 1) as usize];
                if !*seen {
                    *seen = true;
                    self.loaded += 1;
                    if self.loaded == self.total_frames {
                        info!(total = self.total_frames, "all frames loaded");
                    }
                }
            }
            CacheInsert::AlreadyPresent => {
                debug!(frame = index.0, "frame already cached");
            }
            CacheInsert::OutOfRange => {
                warn!(frame = index.0, "decoded frame outside sequence");
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/scheduler.rs"]
mod tests;
