//! The media library: three collection caches behind one lock.
//!
//! [`MediaLibrary`] owns the caches and is shared (as an `Arc`) by the HTTP
//! handlers and the change watcher. Every read and every rebuild holds the
//! same mutex for its whole duration, so a rebuild is never observed half
//! done and two rebuilds of one collection are always ordered.
//!
//! ```text
//! list_collection(kind) ─┐
//! force_refresh()       ─┼──▶ lock ──▶ scan dir(s) ──▶ replace ──▶ unlock
//! remove_file(kind, f)  ─┤
//! watcher trigger       ─┘
//! ```
//!
//! Readers get an `Arc` snapshot out of the lock. Holding it after the lock
//! is released is fine: rebuilds swap in new lists and never mutate old
//! ones.
//!
//! A read against an empty collection rebuilds it first. An empty directory
//! therefore rescans on every read, which is cheap for an empty directory.

use crate::cache::{Collection, CollectionCounts, Collections};
use crate::config::{LibraryConfig, ServerConfig};
use crate::extract::{
    AudioExtractor, DocumentExtractor, ImageExtractor, scan_collection, thumbnail_path,
};
use crate::imaging::{ImageBackend, RustBackend, ThumbnailConfig};
use crate::media::{Classifier, MediaKind, MediaRecord};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("invalid filename '{0}'")]
    InvalidFilename(String),
    #[error("{kind} file not found: {filename}")]
    NotFound { kind: MediaKind, filename: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolved directories, one per kind plus thumbnails.
#[derive(Debug, Clone)]
pub struct LibraryPaths {
    pub music: PathBuf,
    pub images: PathBuf,
    pub documents: PathBuf,
    pub thumbnails: PathBuf,
}

impl LibraryPaths {
    pub fn from_config(config: &LibraryConfig) -> Self {
        Self {
            music: config.dir(MediaKind::Music),
            images: config.dir(MediaKind::Images),
            documents: config.dir(MediaKind::Documents),
            thumbnails: config.thumbnails(),
        }
    }

    pub fn dir(&self, kind: MediaKind) -> &Path {
        match kind {
            MediaKind::Music => &self.music,
            MediaKind::Images => &self.images,
            MediaKind::Documents => &self.documents,
        }
    }
}

pub struct MediaLibrary<B: ImageBackend = RustBackend> {
    backend: B,
    paths: LibraryPaths,
    classifier: Classifier,
    thumbnails: ThumbnailConfig,
    collections: Mutex<Collections>,
}

impl MediaLibrary<RustBackend> {
    /// Library over the configured directories with the pure-Rust backend.
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_backend(
            RustBackend::new(),
            &config.library,
            ThumbnailConfig::from(&config.thumbnails),
        )
    }
}

impl<B: ImageBackend> MediaLibrary<B> {
    pub fn with_backend(backend: B, library: &LibraryConfig, thumbnails: ThumbnailConfig) -> Self {
        Self {
            backend,
            paths: LibraryPaths::from_config(library),
            classifier: library.classifier(),
            thumbnails,
            collections: Mutex::new(Collections::new()),
        }
    }

    pub fn paths(&self) -> &LibraryPaths {
        &self.paths
    }

    pub fn dir(&self, kind: MediaKind) -> &Path {
        self.paths.dir(kind)
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Collections are only ever swapped whole, so a panic while the lock
    /// was held cannot leave one half-written.
    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn scan(&self, kind: MediaKind) -> Vec<MediaRecord> {
        let dir = self.dir(kind);
        match kind {
            MediaKind::Music => scan_collection(dir, &AudioExtractor, &self.classifier),
            MediaKind::Images => {
                let extractor = ImageExtractor::new(
                    &self.backend,
                    &self.paths.thumbnails,
                    self.thumbnails.clone(),
                );
                scan_collection(dir, &extractor, &self.classifier)
            }
            MediaKind::Documents => scan_collection(dir, &DocumentExtractor, &self.classifier),
        }
    }

    fn rebuild(&self, collections: &mut Collections, kind: MediaKind) {
        let records = self.scan(kind);
        collections.cache_mut(kind).replace(records);
    }

    /// Current collection for `kind`, sorted by filename.
    ///
    /// An empty collection is rebuilt before returning.
    pub fn list_collection(&self, kind: MediaKind) -> Collection {
        let mut collections = self.lock();
        if collections.cache(kind).is_empty() {
            self.rebuild(&mut collections, kind);
        }
        collections.cache(kind).get()
    }

    /// Rebuild all three collections under one hold of the lock.
    pub fn force_refresh(&self) -> CollectionCounts {
        let mut collections = self.lock();
        for kind in MediaKind::ALL {
            self.rebuild(&mut collections, kind);
        }
        let counts = collections.counts();
        info!(%counts, "library refreshed");
        counts
    }

    /// Counts of what is cached now. Never triggers a rebuild.
    pub fn counts(&self) -> CollectionCounts {
        self.lock().counts()
    }

    /// Delete one file from a kind directory, then rebuild that collection.
    ///
    /// Names containing a path separator (or naming `.`/`..`) are rejected.
    /// Hidden names, names of another kind and files that do not exist are
    /// all [`LibraryError::NotFound`]. Deleting an image also deletes its
    /// thumbnail.
    pub fn remove_file(&self, kind: MediaKind, filename: &str) -> Result<(), LibraryError> {
        validate_filename(filename)?;
        let not_found = || LibraryError::NotFound {
            kind,
            filename: filename.to_string(),
        };
        if !self.classifier.accepts(kind, filename) {
            return Err(not_found());
        }

        let mut collections = self.lock();
        let path = self.dir(kind).join(filename);
        if !path.is_file() {
            return Err(not_found());
        }

        match std::fs::remove_file(&path) {
            Ok(()) => info!(%kind, filename, "file deleted"),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                error!(%kind, filename, error = %e, "delete failed");
                return Err(e.into());
            }
        }

        if kind == MediaKind::Images {
            let thumb = thumbnail_path(&self.paths.thumbnails, filename);
            if let Err(e) = std::fs::remove_file(&thumb)
                && e.kind() != ErrorKind::NotFound
            {
                warn!(thumbnail = %thumb.display(), error = %e, "cannot delete thumbnail");
            }
        }

        self.rebuild(&mut collections, kind);
        Ok(())
    }
}

/// A bare file name: no separators, no traversal, no NUL.
fn validate_filename(filename: &str) -> Result<(), LibraryError> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0']);
    if invalid {
        return Err(LibraryError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}
