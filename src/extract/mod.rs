//! Per-kind metadata extraction and directory scanning.
//!
//! An [`Extractor`] turns one file into one [`MediaRecord`]. The scan walks a
//! kind directory (non-recursively), keeps the files the [`Classifier`] admits
//! for that kind, runs the extractor over them on the rayon pool, and returns
//! the records sorted by filename.
//!
//! A file that fails extraction is logged and left out, and so is one whose
//! extractor panics. Neither aborts the rest of the scan.
//!
//! ```text
//! music/      → AudioExtractor    → AudioRecord    (lofty tags + duration)
//! images/     → ImageExtractor    → ImageRecord    (dimensions, EXIF/IPTC, thumbnail)
//! documents/  → DocumentExtractor → DocumentRecord (stat only)
//! ```

mod documents;
mod images;
mod music;

pub use documents::DocumentExtractor;
pub use images::{ImageExtractor, thumbnail_path};
pub use music::AudioExtractor;

use crate::imaging::BackendError;
use crate::media::{Classifier, MediaKind, MediaRecord};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("audio container: {0}")]
    Audio(#[from] lofty::error::LoftyError),
    #[error("image: {0}")]
    Image(#[from] BackendError),
}

/// Read one file, produce its normalized record.
///
/// `Sync` because scans fan files out over the rayon pool.
pub trait Extractor: Sync {
    fn kind(&self) -> MediaKind;

    fn extract(&self, path: &Path) -> Result<MediaRecord, ExtractError>;
}

/// Rebuild one collection from a live directory listing.
///
/// A missing directory is created and yields an empty collection. Directory
/// read errors are logged and yield whatever could be listed.
pub fn scan_collection(
    dir: &Path,
    extractor: &dyn Extractor,
    classifier: &Classifier,
) -> Vec<MediaRecord> {
    let kind = extractor.kind();

    if !dir.is_dir() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(%kind, dir = %dir.display(), error = %e, "cannot create collection directory");
        }
        return Vec::new();
    }

    let candidates = collect_candidates(dir, kind, classifier);

    let mut records: Vec<MediaRecord> = candidates
        .par_iter()
        .filter_map(|path| {
            match panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(path))) {
                Ok(Ok(record)) => Some(record),
                Ok(Err(e)) => {
                    warn!(%kind, file = %path.display(), error = %e, "skipping file");
                    None
                }
                Err(_) => {
                    warn!(%kind, file = %path.display(), "extractor panicked, skipping file");
                    None
                }
            }
        })
        .collect();

    records.sort_by(|a, b| a.filename().cmp(b.filename()));
    info!(%kind, count = records.len(), "collection rebuilt");
    records
}

/// Regular files directly inside `dir` that belong to `kind`.
fn collect_candidates(dir: &Path, kind: MediaKind, classifier: &Classifier) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(%kind, error = %e, "directory entry unreadable");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| classifier.accepts(kind, name))
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// File name as UTF-8, or an IO error for names that are not.
pub(crate) fn file_name(path: &Path) -> Result<String, ExtractError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| {
            ExtractError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a UTF-8 file name: {}", path.display()),
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::DocumentRecord;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Builds document-shaped records from the name alone; fails on names
    /// containing "bad".
    struct NameOnly {
        calls: AtomicUsize,
    }

    impl NameOnly {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Extractor for NameOnly {
        fn kind(&self) -> MediaKind {
            MediaKind::Documents
        }

        fn extract(&self, path: &Path) -> Result<MediaRecord, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let filename = file_name(path)?;
            if filename.contains("bad") {
                return Err(ExtractError::Io(std::io::Error::other("corrupt")));
            }
            Ok(MediaRecord::Document(DocumentRecord {
                filename,
                size: 0,
                doc_type: String::new(),
                url: String::new(),
                created: String::new(),
                modified: String::new(),
            }))
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(&["mp3"], &["png"])
    }

    fn names(records: &[MediaRecord]) -> Vec<&str> {
        records.iter().map(MediaRecord::filename).collect()
    }

    #[test]
    fn scan_sorts_and_filters() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.txt", "a.pdf", ".hidden", "song.mp3", "pic.png", "C.md"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }
        fs::create_dir(tmp.path().join("subdir.txt")).unwrap();
        fs::write(tmp.path().join("subdir.txt").join("nested.txt"), b"x").unwrap();

        let records = scan_collection(tmp.path(), &NameOnly::new(), &classifier());
        assert_eq!(names(&records), vec!["C.md", "a.pdf", "b.txt"]);
    }

    #[test]
    fn failing_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        for name in ["ok1.txt", "bad.txt", "ok2.txt"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }

        let extractor = NameOnly::new();
        let records = scan_collection(tmp.path(), &extractor, &classifier());

        assert_eq!(names(&records), vec!["ok1.txt", "ok2.txt"]);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 3);
    }

    /// Panics on names containing "bad", the way a parser can on hostile
    /// input.
    struct Panicky;

    impl Extractor for Panicky {
        fn kind(&self) -> MediaKind {
            MediaKind::Documents
        }

        fn extract(&self, path: &Path) -> Result<MediaRecord, ExtractError> {
            let filename = file_name(path)?;
            if filename.contains("bad") {
                panic!("malformed header in {filename}");
            }
            NameOnly::new().extract(path)
        }
    }

    #[test]
    fn panicking_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        for name in ["ok1.txt", "bad.txt", "ok2.txt"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }

        let records = scan_collection(tmp.path(), &Panicky, &classifier());
        assert_eq!(names(&records), vec!["ok1.txt", "ok2.txt"]);
    }

    #[test]
    fn missing_directory_is_created_and_empty() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("documents");

        let records = scan_collection(&dir, &NameOnly::new(), &classifier());

        assert!(records.is_empty());
        assert!(dir.is_dir());
    }

    #[test]
    fn empty_directory_gives_empty_collection() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_collection(tmp.path(), &NameOnly::new(), &classifier()).is_empty());
    }
}
