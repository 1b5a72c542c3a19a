//! In-memory collection caches.
//!
//! Each media kind has one [`CollectionCache`] holding the current sorted
//! list of records behind an `Arc`. Readers take a [`Collection`] (a cheap
//! `Arc` clone) and keep it as long as they like. A rebuild never touches
//! that list: it builds a new one and swaps the pointer, so an old snapshot
//! stays internally consistent after the swap.
//!
//! ```text
//! reader A ──get()──▶ Arc(v1) ──────────────────────────▶ still v1
//! rebuild  ─────────────────── replace(v2) ──▶ cache = Arc(v2)
//! reader B ────────────────────────────────── get() ──▶ v2
//! ```
//!
//! The caches themselves hold no lock. [`Collections`] groups the three of
//! them so the library can guard all of them with a single mutex.

use crate::media::{MediaKind, MediaRecord};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Immutable snapshot of one collection, sorted by filename.
pub type Collection = Arc<Vec<MediaRecord>>;

#[derive(Debug, Default)]
pub struct CollectionCache {
    current: Collection,
}

impl CollectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot; may be empty.
    pub fn get(&self) -> Collection {
        Arc::clone(&self.current)
    }

    /// Swap in a freshly built collection. `records` must already be sorted.
    pub fn replace(&mut self, records: Vec<MediaRecord>) {
        debug_assert!(
            records
                .windows(2)
                .all(|pair| pair[0].filename() < pair[1].filename()),
            "collection must be sorted by unique filename"
        );
        self.current = Arc::new(records);
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }
}

/// The three caches, addressed by kind.
#[derive(Debug, Default)]
pub struct Collections {
    music: CollectionCache,
    images: CollectionCache,
    documents: CollectionCache,
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self, kind: MediaKind) -> &CollectionCache {
        match kind {
            MediaKind::Music => &self.music,
            MediaKind::Images => &self.images,
            MediaKind::Documents => &self.documents,
        }
    }

    pub fn cache_mut(&mut self, kind: MediaKind) -> &mut CollectionCache {
        match kind {
            MediaKind::Music => &mut self.music,
            MediaKind::Images => &mut self.images,
            MediaKind::Documents => &mut self.documents,
        }
    }

    pub fn counts(&self) -> CollectionCounts {
        CollectionCounts {
            music: self.music.len(),
            images: self.images.len(),
            documents: self.documents.len(),
        }
    }
}

/// Record counts per kind, as reported after a refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionCounts {
    pub music: usize,
    pub images: usize,
    pub documents: usize,
}

impl CollectionCounts {
    pub fn get(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Music => self.music,
            MediaKind::Images => self.images,
            MediaKind::Documents => self.documents,
        }
    }

    pub fn total(&self) -> usize {
        self.music + self.images + self.documents
    }
}

impl fmt::Display for CollectionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} music, {} images, {} documents",
            self.music, self.images, self.documents
        )
    }
}
