use std::collections::HashMap;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ScrubError, ScrubResult};

/// Opaque locator for one frame, derived deterministically from its [`FrameIndex`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FrameSource(String);

impl FrameSource {
    /// Wrap a raw locator string.
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Borrow the locator string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Zero-padded sequential filename template under a base path.
///
/// Frame `7` with the default template becomes `assets/frames/frame-0007.webp`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameSourceTemplate {
    /// Relative directory holding the frames. Empty means the fetch root itself.
    pub base_path: String,
    /// Filename prefix before the padded index.
    pub prefix: String,
    /// Minimum digit count of the index (zero-padded).
    pub pad_width: usize,
    /// File extension without the leading dot.
    pub extension: String,
}

impl Default for FrameSourceTemplate {
    fn default() -> Self {
        Self {
            base_path: "assets/frames".to_string(),
            prefix: "frame-".to_string(),
            pad_width: 4,
            extension: "webp".to_string(),
        }
    }
}

impl FrameSourceTemplate {
    /// Validate the template fields.
    pub fn validate(&self) -> ScrubResult<()> {
        self.normalized_base()?;
        if self.prefix.contains(['/', '\\']) {
            return Err(ScrubError::validation(
                "frame source prefix must not contain path separators",
            ));
        }
        let ext = self.extension.trim_start_matches('.');
        if ext.is_empty() {
            return Err(ScrubError::validation(
                "frame source extension must be non-empty",
            ));
        }
        if ext.contains(['/', '\\']) {
            return Err(ScrubError::validation(
                "frame source extension must not contain path separators",
            ));
        }
        if self.pad_width > 10 {
            return Err(ScrubError::validation("frame source pad_width must be <= 10"));
        }
        Ok(())
    }

    /// Locator for one frame.
    pub fn locator_for(&self, index: FrameIndex) -> ScrubResult<FrameSource> {
        let base = self.normalized_base()?;
        Ok(self.locator_with_base(&base, index))
    }

    fn locator_with_base(&self, base: &str, index: FrameIndex) -> FrameSource {
        let ext = self.extension.trim_start_matches('.');
        let file = format!(
            "{}{:0width$}.{ext}",
            self.prefix,
            index.0,
            width = self.pad_width
        );
        if base.is_empty() {
            FrameSource(file)
        } else {
            FrameSource(format!("{base}/{file}"))
        }
    }

    fn normalized_base(&self) -> ScrubResult<String> {
        if self.base_path.trim().is_empty() {
            return Ok(String::new());
        }
        normalize_locator(&self.base_path)
    }
}

/// Two-way mapping between frame indices and locators, built once per session.
#[derive(Clone, Debug)]
pub struct SourceTable {
    sources: Vec<FrameSource>,
    index_by_source: HashMap<FrameSource, FrameIndex>,
}

impl SourceTable {
    /// Build locators for frames `1..=total_frames`.
    pub fn build(template: &FrameSourceTemplate, total_frames: u32) -> ScrubResult<Self> {
        template.validate()?;
        if total_frames == 0 {
            return Err(ScrubError::validation("total_frames must be >= 1"));
        }

        let base = template.normalized_base()?;
        let mut sources = Vec::with_capacity(total_frames as usize);
        let mut index_by_source = HashMap::with_capacity(total_frames as usize);
        for i in 1..=total_frames {
            let src = template.locator_with_base(&base, FrameIndex(i));
            index_by_source.insert(src.clone(), FrameIndex(i));
            sources.push(src);
        }

        Ok(Self {
            sources,
            index_by_source,
        })
    }

    /// Number of frames in the sequence.
    pub fn total_frames(&self) -> u32 {
        self.sources.len() as u32
    }

    /// Locator for `index`, if it is inside the sequence.
    pub fn source(&self, index: FrameIndex) -> Option<&FrameSource> {
        let i = index.0.checked_sub(1)?;
        self.sources.get(i as usize)
    }

    /// Resolve a locator back to its frame index.
    pub fn index_of(&self, source: &FrameSource) -> Option<FrameIndex> {
        self.index_by_source.get(source).copied()
    }

    /// All locators in frame order.
    pub fn sources(&self) -> &[FrameSource] {
        &self.sources
    }
}

/// Canonical `/`-separated form of a fetch-root-relative frame locator.
///
/// Empty and `.` segments drop out. Rooted locators, drive prefixes and `..` are rejected.
pub fn normalize_locator(locator: &str) -> ScrubResult<String> {
    let unified = locator.replace('\\', "/");
    let rooted = unified.starts_with('/')
        || unified.split('/').next().is_some_and(|s| s.contains(':'));
    let segments: Vec<&str> = unified
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if rooted || segments.contains(&"..") || segments.is_empty() {
        return Err(ScrubError::validation(format!(
            "frame locator '{locator}' must be a relative path below the fetch root"
        )));
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
