use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::assets::source::{FrameSource, normalize_locator};
use crate::foundation::error::{ScrubError, ScrubResult};

/// Retrieves the encoded bytes behind a locator.
///
/// Implementations are called concurrently from the worker pool.
pub trait FrameFetcher: Send + Sync {
    /// Fetch one frame. Missing resources and transport failures are errors.
    fn fetch(&self, source: &FrameSource) -> ScrubResult<Vec<u8>>;
}

/// Fetches frames from a directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    /// Resolve locators relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory locators are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FrameFetcher for FsFetcher {
    fn fetch(&self, source: &FrameSource) -> ScrubResult<Vec<u8>> {
        let rel = normalize_locator(source.as_str())?;
        let path = self.root.join(Path::new(&rel));
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScrubError::fetch(format!(
                "Failed to load frame: {source} (not found)"
            ))),
            Err(e) => Err(e)
                .with_context(|| format!("read frame bytes from '{}'", path.display()))
                .map_err(ScrubError::from),
        }
    }
}
