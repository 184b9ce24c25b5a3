use crate::fetch::protocol::LoadFrames;
use crate::foundation::error::ScrubResult;

/// Destination for batches produced by the scheduler.
///
/// Ordering contract: batches reach the fetch side in the order `dispatch` is called. The scheduler
/// relies on this to put a priority batch ahead of the window batch from the same request.
pub trait FrameDispatch {
    /// Hand one batch to the fetch side. An error means the batch was not accepted.
    fn dispatch(&mut self, req: LoadFrames) -> ScrubResult<()>;
}

/// In-memory dispatch for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemoryDispatch {
    /// Batches in dispatch order.
    pub requests: Vec<LoadFrames>,
}

impl InMemoryDispatch {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&mut self) -> Vec<LoadFrames> {
        std::mem::take(&mut self.requests)
    }
}

impl FrameDispatch for InMemoryDispatch {
    fn dispatch(&mut self, req: LoadFrames) -> ScrubResult<()> {
        self.requests.push(req);
        Ok(())
    }
}
