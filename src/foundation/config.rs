use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

use crate::assets::source::FrameSourceTemplate;
use crate::fetch::worker::{FailurePolicy, FetchWorkerOpts};
use crate::foundation::error::{ScrubError, ScrubResult};

/// Configuration for one scrubbing session.
///
/// Defaults follow the observed deployment: 841 frames, a 30-frame preload radius, bulk batches of
/// 50 frames staggered by 10 ms per frame offset, and `assets/frames/frame-NNNN.webp` locators.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Number of frames in the sequence (`>= 1`).
    pub total_frames: u32,
    /// Preload radius around the target frame.
    pub buffer_radius: u32,
    /// Frames per bulk-load batch (`>= 1`).
    pub batch_size: usize,
    /// Bulk-load stagger: the batch starting at 0-based offset `o` is due `o * stagger` after start.
    pub stagger_per_frame_ms: u64,
    /// Cache capacity. `None` keeps every frame (capacity = `total_frames`).
    pub max_cached_frames: Option<u32>,
    /// Fetch worker threads. `None` uses rayon defaults.
    pub fetch_threads: Option<usize>,
    /// How a failing locator affects the rest of its batch.
    pub failure_policy: FailurePolicy,
    /// Locator template.
    pub source: FrameSourceTemplate,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            total_frames: 841,
            buffer_radius: 30,
            batch_size: 50,
            stagger_per_frame_ms: 10,
            max_cached_frames: None,
            fetch_threads: None,
            failure_policy: FailurePolicy::FailFast,
            source: FrameSourceTemplate::default(),
        }
    }
}

impl StreamConfig {
    /// Parse a config from a JSON reader and validate it.
    pub fn from_reader(r: impl Read) -> ScrubResult<Self> {
        let cfg: StreamConfig = serde_json::from_reader(r)
            .map_err(|e| ScrubError::serde(format!("parse stream config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ScrubResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ScrubError::validation(format!("open stream config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check field ranges and the locator template.
    pub fn validate(&self) -> ScrubResult<()> {
        if self.total_frames == 0 {
            return Err(ScrubError::validation("total_frames must be >= 1"));
        }
        if self.batch_size == 0 {
            return Err(ScrubError::validation("batch_size must be >= 1"));
        }
        if let Some(cap) = self.max_cached_frames {
            let window = self.window_len();
            if u64::from(cap) < window {
                return Err(ScrubError::validation(format!(
                    "max_cached_frames ({cap}) must hold a full preload window ({window} frames)"
                )));
            }
        }
        if let Some(0) = self.fetch_threads {
            return Err(ScrubError::validation(
                "fetch_threads must be >= 1 when set",
            ));
        }
        self.source.validate()
    }

    /// Frames in a full preload window: `min(2 * buffer_radius + 1, total_frames)`.
    pub fn window_len(&self) -> u64 {
        (u64::from(self.buffer_radius) * 2 + 1).min(u64::from(self.total_frames))
    }

    /// Effective cache capacity, never above `total_frames`.
    pub fn cache_capacity(&self) -> u32 {
        self.max_cached_frames
            .unwrap_or(self.total_frames)
            .min(self.total_frames)
    }

    /// Bulk-load delay per frame offset.
    pub fn stagger_per_frame(&self) -> Duration {
        Duration::from_millis(self.stagger_per_frame_ms)
    }

    /// Options for spawning the fetch worker.
    pub fn worker_opts(&self) -> FetchWorkerOpts {
        FetchWorkerOpts {
            threads: self.fetch_threads,
            failure_policy: self.failure_policy,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
