//! # Mediashelf
//!
//! A small media server for the local network. Three directories (music,
//! images, documents) are each indexed into an in-memory collection of
//! metadata records, and those collections are kept current as files come
//! and go.
//!
//! # Architecture
//!
//! ```text
//!   filesystem ──notify──▶ watcher ──debounce──▶ force_refresh ─┐
//!                                                               ▼
//!   HTTP / CLI ──▶ list_collection / remove_file ──▶ MediaLibrary (one mutex)
//!                                                       │
//!                                      scan ◀───────────┘
//!                                        │  rayon, one file per task
//!                                        ▼
//!                  extract: lofty (audio) · EXIF/IPTC + thumbnails (images) · stat (documents)
//!                                        │
//!                                        ▼
//!                          CollectionCache::replace (Arc swap)
//! ```
//!
//! Every rebuild and every read go through the same lock, so readers never
//! see a half-built collection. What they get back is an `Arc` snapshot that
//! stays valid after later rebuilds.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`media`] | Media kinds, filename classification, record types |
//! | [`text_decode`] | Salvages readable text from garbled ASCII/UTF-16 tag fields |
//! | [`metadata`] | Field priority resolution and timestamp formatting |
//! | [`imaging`] | Image backend trait, embedded metadata parsing, thumbnails |
//! | [`extract`] | Per-kind extractors and the parallel directory scan |
//! | [`cache`] | Copy-on-write collection snapshots |
//! | [`library`] | The coordinator: lazy load, refresh, delete |
//! | [`watcher`] | Filesystem change watching with a per-root debounce |
//! | [`server`] | axum routes over the library |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`output`] | CLI listing formatting |
//!
//! # Failure Model
//!
//! Nothing about one bad file takes down a collection. A file that cannot
//! be read is logged and skipped; a file with bad tags keeps its defaults;
//! an image whose size cannot be read is listed as 0x0 without a thumbnail.

pub mod cache;
pub mod config;
pub mod extract;
pub mod imaging;
pub mod library;
pub mod media;
pub mod metadata;
pub mod output;
pub mod server;
pub mod text_decode;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_helpers;
