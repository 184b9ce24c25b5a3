use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::assets::source::FrameSource;
use crate::fetch::dispatch::FrameDispatch;
use crate::fetch::protocol::{
    BatchError, BatchId, BlobsLoaded, LoadFrames, LoadedBlob, WorkerRequest, WorkerResponse,
};
use crate::fetch::transport::FrameFetcher;
use crate::foundation::error::{ScrubError, ScrubResult};

/// How one failing locator affects the rest of its batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// First failure aborts the batch: one `error` response, nothing else for that batch.
    #[default]
    FailFast,
    /// Every locator is attempted: one `blobsLoaded` with the successes (if any), then one `error`
    /// per failing locator.
    PerItem,
}

/// Options for [`FetchWorker::spawn`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchWorkerOpts {
    /// Fetch pool threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Batch failure behavior.
    pub failure_policy: FailurePolicy,
}

/// Off-thread frame fetcher.
///
/// A dispatcher thread receives [`WorkerRequest`]s and hands every batch to a dedicated rayon pool,
/// so independent batches run concurrently and nothing is queued behind a slow batch. Results come
/// back as [`WorkerResponse`]s through [`FetchWorker::try_recv`] and friends. The worker shares no
/// state with its caller beyond the two channels.
pub struct FetchWorker {
    requests: Option<mpsc::Sender<WorkerRequest>>,
    responses: mpsc::Receiver<WorkerResponse>,
    dispatcher: Option<JoinHandle<()>>,
}

impl FetchWorker {
    /// Start the dispatcher thread and fetch pool.
    pub fn spawn(fetcher: Arc<dyn FrameFetcher>, opts: FetchWorkerOpts) -> ScrubResult<Self> {
        let pool = build_thread_pool(opts.threads)?;
        let (req_tx, req_rx) = mpsc::channel::<WorkerRequest>();
        let (resp_tx, resp_rx) = mpsc::channel::<WorkerResponse>();
        let policy = opts.failure_policy;

        let dispatcher = std::thread::Builder::new()
            .name("framescrub-fetch".to_string())
            .spawn(move || run_dispatcher(req_rx, resp_tx, fetcher, pool, policy))
            .context("spawn fetch worker thread")?;

        Ok(Self {
            requests: Some(req_tx),
            responses: resp_rx,
            dispatcher: Some(dispatcher),
        })
    }

    /// Send a raw request.
    pub fn send(&self, req: WorkerRequest) -> ScrubResult<()> {
        let tx = self
            .requests
            .as_ref()
            .ok_or_else(|| ScrubError::worker("fetch worker has been shut down"))?;
        tx.send(req)
            .map_err(|_| ScrubError::worker("fetch worker is not accepting requests"))
    }

    /// Next response, if one is ready.
    pub fn try_recv(&self) -> Option<WorkerResponse> {
        self.responses.try_recv().ok()
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerResponse> {
        self.responses.recv_timeout(timeout).ok()
    }

    /// Move every ready response into `out`, returning how many were moved.
    pub fn drain_into(&self, out: &mut Vec<WorkerResponse>) -> usize {
        let mut n = 0usize;
        while let Ok(resp) = self.responses.try_recv() {
            out.push(resp);
            n += 1;
        }
        n
    }

    /// Whether requests are still accepted.
    pub fn is_running(&self) -> bool {
        self.requests.is_some()
    }

    /// Stop accepting requests and join the dispatcher. Batches already handed to the pool still
    /// complete; their responses stay readable. Idempotent.
    pub fn shutdown(&mut self) {
        self.requests.take();
        if let Some(handle) = self.dispatcher.take()
            && handle.join().is_err()
        {
            warn!("fetch worker dispatcher panicked");
        }
    }
}

impl FrameDispatch for FetchWorker {
    fn dispatch(&mut self, req: LoadFrames) -> ScrubResult<()> {
        self.send(WorkerRequest::LoadFrames(req))
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_dispatcher(
    requests: mpsc::Receiver<WorkerRequest>,
    responses: mpsc::Sender<WorkerResponse>,
    fetcher: Arc<dyn FrameFetcher>,
    pool: rayon::ThreadPool,
    policy: FailurePolicy,
) {
    while let Ok(req) = requests.recv() {
        match req {
            WorkerRequest::LoadFrames(load) => {
                debug!(batch = %load.batch, frames = load.frames.len(), "fetch batch queued");
                let fetcher = Arc::clone(&fetcher);
                let responses = responses.clone();
                pool.spawn(move || {
                    for resp in fetch_batch(fetcher.as_ref(), load, policy) {
                        if responses.send(resp).is_err() {
                            break;
                        }
                    }
                });
            }
        }
    }
    debug!("fetch worker request channel closed");
}

/// Fetch one batch and build its responses.
///
/// Locators are fetched in parallel; reported order always matches request order.
pub(crate) fn fetch_batch(
    fetcher: &dyn FrameFetcher,
    load: LoadFrames,
    policy: FailurePolicy,
) -> Vec<WorkerResponse> {
    let LoadFrames { batch, frames } = load;
    match policy {
        FailurePolicy::FailFast => {
            let res: Result<Vec<LoadedBlob>, BatchError> = frames
                .par_iter()
                .map(|src| fetch_one(fetcher, batch, src))
                .collect();
            match res {
                Ok(blobs) => vec![WorkerResponse::BlobsLoaded(BlobsLoaded { batch, blobs })],
                Err(e) => vec![WorkerResponse::Error(e)],
            }
        }
        FailurePolicy::PerItem => {
            let results: Vec<Result<LoadedBlob, BatchError>> = frames
                .par_iter()
                .map(|src| fetch_one(fetcher, batch, src))
                .collect();

            let mut blobs = Vec::new();
            let mut errors = Vec::new();
            for r in results {
                match r {
                    Ok(b) => blobs.push(b),
                    Err(e) => errors.push(WorkerResponse::Error(e)),
                }
            }

            let mut out = Vec::with_capacity(errors.len() + 1);
            if !blobs.is_empty() {
                out.push(WorkerResponse::BlobsLoaded(BlobsLoaded { batch, blobs }));
            }
            out.extend(errors);
            out
        }
    }
}

fn fetch_one(
    fetcher: &dyn FrameFetcher,
    batch: BatchId,
    source: &FrameSource,
) -> Result<LoadedBlob, BatchError> {
    match fetcher.fetch(source) {
        Ok(blob) => Ok(LoadedBlob {
            blob,
            frame_path: source.clone(),
        }),
        Err(e) => Err(BatchError {
            batch,
            error: e.to_string(),
            frame_path: source.clone(),
        }),
    }
}

fn build_thread_pool(threads: Option<usize>) -> ScrubResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ScrubError::validation(
            "fetch worker 'threads' must be >= 1 when set",
        ));
    }
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("framescrub-fetch-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ScrubError::worker(format!("failed to build fetch thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/fetch/worker.rs"]
mod tests;
