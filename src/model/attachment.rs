//! Materialized attachments and the content-id lookup built from them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// An attachment written to the scratch directory.
///
/// This is the only attachment form exposed to the presentation shell.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SavedAttachment {
    /// Sanitized filename, unique within the scratch directory.
    pub filename: String,

    /// Absolute path of the written file.
    pub path: PathBuf,

    /// Size in bytes.
    pub size: u64,
}

/// Maps content-ids to the scratch path of the attachment carrying them.
///
/// Keys are stored without surrounding whitespace or angle brackets, so
/// `<image001.png@01D0>` and `image001.png@01D0` resolve alike.
#[derive(Debug, Clone, Default)]
pub struct ContentIdMap {
    entries: HashMap<String, PathBuf>,
}

impl ContentIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `content_id → path`. Empty ids are ignored.
    pub fn insert(&mut self, content_id: &str, path: impl Into<PathBuf>) {
        let key = normalize(content_id);
        if !key.is_empty() {
            self.entries.insert(key.to_string(), path.into());
        }
    }

    /// Look up the path for a content-id taken from a `cid:` reference.
    pub fn resolve(&self, content_id: &str) -> Option<&Path> {
        self.entries.get(normalize(content_id)).map(PathBuf::as_path)
    }

    /// Iterate over `(content_id, path)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(cid, path)| (cid.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strip whitespace and angle brackets around a content-id.
pub fn normalize(content_id: &str) -> &str {
    content_id
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
}
