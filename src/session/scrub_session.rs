use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::fetch::transport::FrameFetcher;
use crate::fetch::worker::FetchWorker;
use crate::foundation::config::StreamConfig;
use crate::foundation::error::ScrubResult;
use crate::playback::driver::{PaintDecision, PlaybackDriver};
use crate::schedule::bulk::BulkLoad;
use crate::schedule::scheduler::{FrameScheduler, Progress, SchedulerStats};

/// One scrubbing session: fetch worker, scheduler, playback driver and optional bulk load.
///
/// Single-owner and poll-driven. Call [`ScrubSession::pump`] (or [`ScrubSession::pump_wait`])
/// to feed worker responses into the cache and [`ScrubSession::poll_bulk_load`] to release due
/// bulk batches.
pub struct ScrubSession {
    config: StreamConfig,
    worker: FetchWorker,
    scheduler: FrameScheduler,
    driver: PlaybackDriver,
    bulk: Option<BulkLoad>,
}

impl ScrubSession {
    /// Validate `config` and start the fetch worker on `fetcher`.
    #[tracing::instrument(skip(config, fetcher), fields(total_frames = config.total_frames))]
    pub fn new(config: StreamConfig, fetcher: Arc<dyn FrameFetcher>) -> ScrubResult<Self> {
        let scheduler = FrameScheduler::new(&config)?;
        let worker = FetchWorker::spawn(fetcher, config.worker_opts())?;
        let driver = PlaybackDriver::new(config.total_frames);
        Ok(Self {
            config,
            worker,
            scheduler,
            driver,
            bulk: None,
        })
    }

    /// Session config.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Read access to the scheduler.
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Read access to the playback driver.
    pub fn driver(&self) -> &PlaybackDriver {
        &self.driver
    }

    /// Plan the staggered bulk load starting now and release the first batch.
    pub fn start_bulk_load(&mut self) -> usize {
        let bulk = BulkLoad::from_config(&self.config, Instant::now());
        info!(batches = bulk.remaining(), "bulk load started");
        self.bulk = Some(bulk);
        self.poll_bulk_load()
    }

    /// Release bulk batches that are due. Returns how many were released.
    pub fn poll_bulk_load(&mut self) -> usize {
        match self.bulk.as_mut() {
            Some(bulk) => bulk.poll(Instant::now(), &mut self.scheduler, &mut self.worker),
            None => 0,
        }
    }

    /// The bulk load, once started.
    pub fn bulk_load(&self) -> Option<&BulkLoad> {
        self.bulk.as_ref()
    }

    /// Whether a started bulk load has released every batch.
    pub fn bulk_load_released(&self) -> bool {
        self.bulk.as_ref().is_some_and(BulkLoad::is_finished)
    }

    /// Feed every ready worker response into the scheduler. Never blocks.
    pub fn pump(&mut self) -> usize {
        let mut ready = Vec::new();
        let n = self.worker.drain_into(&mut ready);
        for resp in ready {
            self.scheduler.handle_response(resp);
        }
        n
    }

    /// Wait up to `timeout` for one response, then drain whatever else is ready.
    pub fn pump_wait(&mut self, timeout: Duration) -> usize {
        match self.worker.recv_timeout(timeout) {
            Some(resp) => {
                self.scheduler.handle_response(resp);
                1 + self.pump()
            }
            None => 0,
        }
    }

    /// Whether any dispatched frame is still awaiting a response.
    pub fn has_pending(&self) -> bool {
        self.scheduler.pending_len() > 0
    }

    /// Scroll to `progress` in `[0, 1]`.
    pub fn scroll_to(&mut self, progress: f64) -> PaintDecision {
        self.driver
            .on_scroll(progress, &mut self.scheduler, &mut self.worker)
    }

    /// Re-evaluate the current target against the cache.
    pub fn refresh(&mut self) -> PaintDecision {
        self.driver.refresh(&mut self.scheduler)
    }

    /// Load progress.
    pub fn progress(&self) -> Progress {
        self.scheduler.progress_snapshot()
    }

    /// Scheduler counters.
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Stop the worker, drop the bulk load and release every cached frame. Returns the number of
    /// frames released. Idempotent.
    pub fn teardown(&mut self) -> usize {
        self.worker.shutdown();
        self.bulk = None;
        self.driver.reset();
        if self.scheduler.is_torn_down() {
            return 0;
        }
        self.scheduler.teardown()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/scrub_session.rs"]
mod tests;
