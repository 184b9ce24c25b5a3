//! Messages exchanged with the fetch worker.
//!
//! The JSON form uses a `type`/`payload` envelope:
//!
//! - `{"type":"loadFrames","payload":{"batch":7,"frames":["assets/frames/frame-0001.webp"]}}`
//! - `{"type":"blobsLoaded","payload":{"batch":7,"blobs":[{"blob":[..],"framePath":"..."}]}}`
//! - `{"type":"error","payload":{"batch":7,"error":"...","framePath":"..."}}`

use crate::assets::source::FrameSource;

/// Identifier of one dispatched batch, unique within a scheduler.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct BatchId(pub u64);

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Request sent to the worker.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum WorkerRequest {
    /// Fetch an ordered list of frames as one batch.
    LoadFrames(LoadFrames),
}

/// Payload of [`WorkerRequest::LoadFrames`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoadFrames {
    /// Batch identity echoed back in every response for this batch.
    pub batch: BatchId,
    /// Locators in fetch/report order.
    pub frames: Vec<FrameSource>,
}

/// Response emitted by the worker.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum WorkerResponse {
    /// Fetched payloads, in the order the locators were requested.
    BlobsLoaded(BlobsLoaded),
    /// A locator failed. No further successes follow for the same batch.
    Error(BatchError),
}

impl WorkerResponse {
    /// Batch the response belongs to.
    pub fn batch(&self) -> BatchId {
        match self {
            WorkerResponse::BlobsLoaded(b) => b.batch,
            WorkerResponse::Error(e) => e.batch,
        }
    }
}

/// Payload of [`WorkerResponse::BlobsLoaded`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlobsLoaded {
    /// Originating batch.
    pub batch: BatchId,
    /// One entry per fetched locator.
    pub blobs: Vec<LoadedBlob>,
}

/// Raw bytes of one frame plus the locator they came from.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedBlob {
    /// Encoded image bytes.
    pub blob: Vec<u8>,
    /// Locator as requested.
    pub frame_path: FrameSource,
}

impl std::fmt::Debug for LoadedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedBlob")
            .field("blob_len", &self.blob.len())
            .field("frame_path", &self.frame_path)
            .finish()
    }
}

/// Payload of [`WorkerResponse::Error`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchError {
    /// Originating batch.
    pub batch: BatchId,
    /// Human-readable failure.
    pub error: String,
    /// Locator that failed.
    pub frame_path: FrameSource,
}

#[cfg(test)]
#[path = "../../tests/unit/fetch/protocol.rs"]
mod tests;
