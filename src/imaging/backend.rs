//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the three things the image extractor
//! needs from pixels and containers: identify (dimensions), read_metadata
//! (embedded EXIF/IPTC fields), and thumbnail. The production implementation
//! is [`RustBackend`](super::rust_backend::RustBackend).

use super::params::ThumbnailParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Embedded metadata found in an image container.
///
/// IPTC values are already text (the IIM record is UTF-8/ASCII). EXIF values
/// are kept as raw bytes because their declared encodings are unreliable;
/// the extractor runs them through the tag text decoder.
///
/// | Field | Source |
/// |---|---|
/// | `iptc_title` | IPTC 2:05 ObjectName |
/// | `iptc_caption` | IPTC 2:120 Caption-Abstract |
/// | `xp_title` | EXIF 0x9C9B XPTitle (UTF-16LE, terminator stripped) |
/// | `xp_comment` | EXIF 0x9C9C XPComment (UTF-16LE, terminator stripped) |
/// | `document_name` | EXIF 0x010D DocumentName |
/// | `image_description` | EXIF 0x010E ImageDescription |
/// | `date_time_original` | EXIF 0x9003 DateTimeOriginal |
/// | `date_time` | EXIF 0x0132 DateTime |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    pub iptc_title: Option<String>,
    pub iptc_caption: Option<String>,
    pub xp_title: Option<Vec<u8>>,
    pub xp_comment: Option<Vec<u8>>,
    pub document_name: Option<Vec<u8>>,
    pub image_description: Option<Vec<u8>>,
    pub date_time_original: Option<Vec<u8>>,
    pub date_time: Option<Vec<u8>>,
}

/// Trait for image backends.
///
/// `Sync` because extraction runs on the rayon pool.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Read embedded EXIF/IPTC metadata.
    fn read_metadata(&self, path: &Path) -> Result<ImageMetadata, BackendError>;

    /// Write a thumbnail for `params.source` to `params.output`.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;
}
