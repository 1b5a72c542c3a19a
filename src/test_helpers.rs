//! Shared test utilities for the mediashelf test suite.
//!
//! Provides a throwaway library layout, tiny real media files, and lookup
//! helpers over collections.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fx = LibraryFixture::new();
//! fx.write(MediaKind::Documents, "notes.txt", b"hello");
//! let library = fx.mock_library(MockBackend::with_dimensions(10, 10));
//!
//! assert_eq!(filenames(&library.list_collection(MediaKind::Documents)), ["notes.txt"]);
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::LibraryConfig;
use crate::imaging::ThumbnailConfig;
use crate::imaging::backend::tests::MockBackend;
use crate::library::MediaLibrary;
use crate::media::{MediaKind, MediaRecord};

// =========================================================================
// Fixture setup
// =========================================================================

/// A temp media root with the three kind directories created.
pub struct LibraryFixture {
    pub tmp: TempDir,
    pub config: LibraryConfig,
}

impl LibraryFixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let config = LibraryConfig {
            root: tmp.path().to_path_buf(),
            ..LibraryConfig::default()
        };
        for kind in MediaKind::ALL {
            std::fs::create_dir_all(config.dir(kind)).unwrap();
        }
        Self { tmp, config }
    }

    pub fn path(&self, kind: MediaKind, name: &str) -> PathBuf {
        self.config.dir(kind).join(name)
    }

    pub fn write(&self, kind: MediaKind, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path(kind, name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub fn thumbnail(&self, image_name: &str) -> PathBuf {
        self.config.thumbnails().join(format!("{image_name}.jpg"))
    }

    pub fn mock_library(&self, backend: MockBackend) -> MediaLibrary<MockBackend> {
        MediaLibrary::with_backend(backend, &self.config, ThumbnailConfig::default())
    }
}

// =========================================================================
// Media files
// =========================================================================

/// Write a solid-color PNG.
pub fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([40, 90, 160]))
        .save(path)
        .unwrap();
}

/// Write a PCM WAV (8 kHz, mono, 8-bit, so `data_len` bytes = `data_len / 8000`
/// seconds) with an optional RIFF INFO list of `(id, text)` entries.
///
/// INFO text is written without a terminator; keep it even-length so no pad
/// byte is needed.
pub fn write_wav(path: &Path, data_len: u32, info: &[([u8; 4], &str)]) {
    let mut body = b"WAVE".to_vec();

    body.extend(b"fmt ");
    body.extend(16u32.to_le_bytes());
    body.extend(1u16.to_le_bytes()); // PCM
    body.extend(1u16.to_le_bytes()); // channels
    body.extend(8000u32.to_le_bytes()); // sample rate
    body.extend(8000u32.to_le_bytes()); // byte rate
    body.extend(1u16.to_le_bytes()); // block align
    body.extend(8u16.to_le_bytes()); // bits per sample

    body.extend(b"data");
    body.extend(data_len.to_le_bytes());
    body.extend(std::iter::repeat_n(128u8, data_len as usize));
    if data_len % 2 == 1 {
        body.push(0);
    }

    if !info.is_empty() {
        let mut list = b"INFO".to_vec();
        for (id, text) in info {
            assert!(text.len() % 2 == 0, "keep INFO text even-length");
            list.extend(id);
            list.extend((text.len() as u32).to_le_bytes());
            list.extend(text.as_bytes());
        }
        body.extend(b"LIST");
        body.extend((list.len() as u32).to_le_bytes());
        body.extend(list);
    }

    let mut file = b"RIFF".to_vec();
    file.extend((body.len() as u32).to_le_bytes());
    file.extend(body);
    std::fs::write(path, file).unwrap();
}

/// Write an MPEG-1 Layer III file of silent 128 kbps frames behind an ID3v2.3
/// tag holding `frames` as `(id, body)` pairs. Bodies are written as given,
/// encoding byte included.
pub fn write_mp3(path: &Path, frames: &[([u8; 4], Vec<u8>)]) {
    let mut tag = Vec::new();
    for (id, content) in frames {
        tag.extend(id);
        tag.extend((content.len() as u32).to_be_bytes());
        tag.extend([0u8, 0]); // flags
        tag.extend(content);
    }

    let size = tag.len() as u32;
    let mut file = b"ID3".to_vec();
    file.extend([3, 0, 0]); // v2.3, no flags
    file.extend([size >> 21, size >> 14, size >> 7, size].map(|b| (b & 0x7f) as u8));
    file.extend(tag);

    // 44.1 kHz stereo: 417 bytes per frame
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    for _ in 0..40 {
        file.extend(&frame);
    }
    std::fs::write(path, file).unwrap();
}

// =========================================================================
// Lookups
// =========================================================================

/// Filenames of a collection, in order.
pub fn filenames(records: &[MediaRecord]) -> Vec<String> {
    records.iter().map(|r| r.filename().to_string()).collect()
}

/// Whether a collection is strictly ascending by filename.
pub fn is_sorted_unique(records: &[MediaRecord]) -> bool {
    records
        .windows(2)
        .all(|pair| pair[0].filename() < pair[1].filename())
}
