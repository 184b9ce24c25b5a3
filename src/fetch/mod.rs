//! Fetch side of the pipeline: wire messages, the dispatch seam, transports and the off-thread
//! worker.

/// Dispatch seam between scheduler and worker.
pub mod dispatch;
/// Worker request/response messages.
pub mod protocol;
/// Byte transports.
pub mod transport;
/// Off-thread batch fetcher.
pub mod worker;
