//! The single scratch directory holding the current message's files.
//!
//! At most one message's files exist here at a time: the directory is wiped
//! and recreated before every load. A marker file records that msgreader
//! created the directory; a non-empty directory without it is never wiped.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{MsgReaderError, Result};

/// Longest filename produced by [`safe_filename`], in characters.
const MAX_FILENAME_CHARS: usize = 150;

/// Written into every scratch directory msgreader creates. [`safe_filename`]
/// strips leading dots, so no attachment can take this name.
pub const SCRATCH_MARKER: &str = ".msgreader-scratch";

/// A well-known working directory, cleared on every load.
#[derive(Debug, Clone)]
pub struct ScratchDirectory {
    root: PathBuf,
}

impl ScratchDirectory {
    /// Use `root` as the scratch directory. Nothing is created until [`reset`](Self::reset)
    /// or [`ensure`](Self::ensure).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist, keeping its contents.
    pub fn ensure(&self) -> Result<()> {
        if self.root.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.root).map_err(|e| MsgReaderError::io(&self.root, e))?;
        self.write_marker()
    }

    /// Delete everything in the directory and recreate it empty.
    ///
    /// Refuses with [`MsgReaderError::ScratchNotOwned`] when the directory has
    /// content but no [`SCRATCH_MARKER`], leaving it untouched.
    pub fn reset(&self) -> Result<()> {
        if !self.is_owned()? {
            return Err(MsgReaderError::ScratchNotOwned(self.root.clone()));
        }
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(MsgReaderError::io(&self.root, e)),
        }
        self.ensure()?;
        info!(path = %self.root.display(), "Scratch directory reset");
        Ok(())
    }

    /// `true` if the directory is missing, empty, or carries the marker.
    fn is_owned(&self) -> Result<bool> {
        let mut entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(MsgReaderError::io(&self.root, e)),
        };
        if entries.next().is_none() {
            return Ok(true);
        }
        Ok(self.root.join(SCRATCH_MARKER).is_file())
    }

    fn write_marker(&self) -> Result<()> {
        let marker = self.root.join(SCRATCH_MARKER);
        std::fs::write(&marker, b"msgreader scratch directory, wiped on every load\n")
            .map_err(|e| MsgReaderError::io(&marker, e))
    }

    /// Path for `filename` in the directory, suffixed `_1`, `_2`, … if taken.
    pub fn unique_path(&self, filename: &str) -> PathBuf {
        unique_path(&self.root.join(filename))
    }

    /// Path of an existing regular file named `filename` (after sanitizing).
    pub fn existing_file(&self, filename: &str) -> Result<PathBuf> {
        let safe = safe_filename(filename)
            .ok_or_else(|| MsgReaderError::InvalidFilename(filename.to_string()))?;
        let path = self.root.join(&safe);
        if path.is_file() {
            Ok(path)
        } else {
            Err(MsgReaderError::AttachmentNotFound(safe))
        }
    }

    /// Write `data` to a fresh file named after `filename`.
    ///
    /// The file is created exclusively, so an entry already at the chosen path
    /// (including a symlink) makes the write fail instead of being followed.
    /// On failure no file is left behind.
    pub fn write_unique(&self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.unique_path(filename);
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| MsgReaderError::io(&path, e))?;
        if let Err(e) = file.write_all(data).and_then(|()| file.flush()) {
            drop(file);
            let _ = std::fs::remove_file(&path);
            return Err(MsgReaderError::io(&path, e));
        }
        debug!(path = %path.display(), len = data.len(), "Wrote scratch file");
        Ok(path)
    }
}

/// Reduce an untrusted filename to a safe single path component.
///
/// Directory components are dropped, characters other than ASCII
/// alphanumerics, `-`, `_` and `.` become `_`, leading dots are removed and
/// the result is capped at 150 characters. Returns `None` if nothing usable
/// remains.
pub fn safe_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");

    let replaced: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = replaced.trim_start_matches('.');
    let mut result: String = trimmed.chars().take(MAX_FILENAME_CHARS).collect();
    if result.len() < trimmed.len() {
        result = keep_extension(trimmed, MAX_FILENAME_CHARS);
    }

    if result.chars().all(|c| c == '_' || c == '.') {
        None
    } else {
        Some(result)
    }
}

/// Truncate `name` to `max` characters while keeping its extension.
fn keep_extension(name: &str, max: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if ext.len() < 16 && ext.len() + 1 < max => {
            let stem: String = stem.chars().take(max - ext.len() - 1).collect();
            format!("{stem}.{ext}")
        }
        _ => name.chars().take(max).collect(),
    }
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    parent.join(format!("{stem}_{}.{ext}", uuid::Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename_strips_directories() {
        assert_eq!(safe_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(
            safe_filename("C:\\Users\\me\\report.pdf").as_deref(),
            Some("report.pdf")
        );
    }

    #[test]
    fn test_safe_filename_replaces_hostile_characters() {
        assert_eq!(
            safe_filename("my report (final).pdf").as_deref(),
            Some("my_report__final_.pdf")
        );
        assert_eq!(safe_filename("a:b*c?.txt").as_deref(), Some("a_b_c_.txt"));
        assert_eq!(safe_filename(".hidden").as_deref(), Some("hidden"));
    }

    #[test]
    fn test_safe_filename_rejects_empty() {
        assert_eq!(safe_filename(""), None);
        assert_eq!(safe_filename("../"), None);
        assert_eq!(safe_filename("***"), None);
    }

    #[test]
    fn test_safe_filename_truncates_keeping_extension() {
        let long = format!("{}.pdf", "x".repeat(300));
        let safe = safe_filename(&long).unwrap();
        assert_eq!(safe.chars().count(), MAX_FILENAME_CHARS);
        assert!(safe.ends_with(".pdf"));
    }

    #[test]
    fn test_reset_clears_previous_files() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDirectory::new(tmp.path().join("scratch"));
        scratch.reset().unwrap();
        std::fs::write(scratch.path().join("old.txt"), b"old").unwrap();
        std::fs::create_dir(scratch.path().join("nested")).unwrap();

        scratch.reset().unwrap();
        assert!(scratch.path().is_dir());
        let names: Vec<_> = std::fs::read_dir(scratch.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, [SCRATCH_MARKER]);
    }

    #[test]
    fn test_reset_refuses_foreign_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("thesis.docx"), b"years of work").unwrap();
        let scratch = ScratchDirectory::new(tmp.path());

        let err = scratch.reset().unwrap_err();
        assert!(matches!(err, MsgReaderError::ScratchNotOwned(_)));
        assert_eq!(
            std::fs::read(tmp.path().join("thesis.docx")).unwrap(),
            b"years of work"
        );
        assert!(!tmp.path().join(SCRATCH_MARKER).exists());
    }

    #[test]
    fn test_reset_adopts_empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDirectory::new(tmp.path());
        scratch.reset().unwrap();
        assert!(tmp.path().join(SCRATCH_MARKER).is_file());

        std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        scratch.reset().unwrap();
        assert!(!tmp.path().join("a.txt").exists());
    }

    #[test]
    fn test_marker_name_is_unreachable_for_attachments() {
        assert_eq!(safe_filename(SCRATCH_MARKER).as_deref(), Some("msgreader-scratch"));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_unique_does_not_follow_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().join("outside.txt");
        std::fs::write(&outside, b"keep").unwrap();
        let scratch = ScratchDirectory::new(tmp.path().join("scratch"));
        scratch.reset().unwrap();
        std::os::unix::fs::symlink(&outside, scratch.path().join("link.txt")).unwrap();

        // exists() follows the link, so the name is taken and a suffix is used
        let path = scratch.write_unique("link.txt", b"new").unwrap();
        assert_eq!(path.file_name().unwrap(), "link_1.txt");
        assert_eq!(std::fs::read(&outside).unwrap(), b"keep");
    }

    #[test]
    fn test_write_unique_suffixes_collisions() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDirectory::new(tmp.path());
        let first = scratch.write_unique("photo.png", b"1").unwrap();
        let second = scratch.write_unique("photo.png", b"2").unwrap();
        let third = scratch.write_unique("photo.png", b"3").unwrap();
        assert_eq!(first.file_name().unwrap(), "photo.png");
        assert_eq!(second.file_name().unwrap(), "photo_1.png");
        assert_eq!(third.file_name().unwrap(), "photo_2.png");
        assert_eq!(std::fs::read(&first).unwrap(), b"1");
    }

    #[test]
    fn test_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDirectory::new(tmp.path());
        std::fs::write(tmp.path().join("doc.pdf"), b"%PDF").unwrap();
        assert!(scratch.existing_file("doc.pdf").is_ok());
        assert!(matches!(
            scratch.existing_file("missing.pdf"),
            Err(MsgReaderError::AttachmentNotFound(_))
        ));
        assert!(matches!(
            scratch.existing_file("../"),
            Err(MsgReaderError::InvalidFilename(_))
        ));
    }
}
