//! framescrub streams a numbered still-frame sequence for scroll-driven playback.
//!
//! Frames are fetched off-thread in batches, decoded into an in-memory cache and painted on demand.
//! The API is poll-driven and single-owner:
//!
//! - Load and validate a [`StreamConfig`]
//! - Create a [`ScrubSession`] over a [`FrameFetcher`]
//! - Scroll with [`ScrubSession::scroll_to`], pump responses, and paint with [`paint_frame`]
//!
//! The lower layers ([`FrameScheduler`], [`FetchWorker`], [`PlaybackDriver`]) are usable on their
//! own; [`InMemoryDispatch`] records batches without any worker for deterministic tests.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod cache;
mod foundation;

/// Off-thread frame fetching and the worker wire protocol.
pub mod fetch;
/// Scroll mapping and canvas painting.
pub mod playback;
/// Frame scheduling and bulk loading.
pub mod schedule;
/// Session-oriented scrubbing API.
pub mod session;

pub use crate::assets::decode::{FrameImage, decode_frame};
pub use crate::assets::source::{
    FrameSource, FrameSourceTemplate, SourceTable, normalize_locator,
};
pub use crate::cache::frame_cache::{CacheInsert, FrameCache};
pub use crate::foundation::config::StreamConfig;
pub use crate::foundation::core::{FrameIndex, FrameWindow, Viewport};
pub use crate::foundation::error::{ScrubError, ScrubResult};

pub use crate::fetch::dispatch::{FrameDispatch, InMemoryDispatch};
pub use crate::fetch::protocol::{
    BatchError, BatchId, BlobsLoaded, LoadFrames, LoadedBlob, WorkerRequest, WorkerResponse,
};
pub use crate::fetch::transport::{FrameFetcher, FsFetcher};
pub use crate::fetch::worker::{FailurePolicy, FetchWorker, FetchWorkerOpts};
pub use crate::playback::driver::{PaintDecision, PlaybackDriver, frame_for_progress};
pub use crate::playback::paint::{CANVAS_BACKGROUND, CanvasFrame, FitMode, fit_rect, paint_frame};
pub use crate::schedule::bulk::BulkLoad;
pub use crate::schedule::scheduler::{
    DisplayFrame, FrameScheduler, Progress, SchedulerStats, WindowPlan,
};
pub use crate::session::scrub_session::ScrubSession;
