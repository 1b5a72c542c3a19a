//! High-level image operations.
//!
//! These functions take configuration, build parameters, and call the
//! backend. They decide *whether* work is needed; the backend does it.

use super::backend::ImageBackend;
use super::params::{Quality, ThumbnailParams};
use std::path::Path;
use tracing::{debug, warn};

/// Configuration for thumbnail generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailConfig {
    /// Longest edge in pixels.
    pub max_edge: u32,
    pub quality: Quality,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_edge: 300,
            quality: Quality::default(),
        }
    }
}

/// Plan a thumbnail operation without executing it.
pub fn plan_thumbnail(source: &Path, output: &Path, config: &ThumbnailConfig) -> ThumbnailParams {
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        max_edge: config.max_edge,
        quality: config.quality,
    }
}

/// Make sure a thumbnail for `source` exists at `output`.
///
/// An existing file is reused as-is, whatever its age. Failures are logged
/// and reported as `false`; a missing thumbnail never fails extraction.
pub fn ensure_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    config: &ThumbnailConfig,
) -> bool {
    if output.exists() {
        return true;
    }

    let params = plan_thumbnail(source, output, config);
    if let Some(parent) = output.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(dir = %parent.display(), error = %e, "cannot create thumbnail directory");
        return false;
    }

    match backend.thumbnail(&params) {
        Ok(()) => {
            debug!(thumbnail = %output.display(), "thumbnail created");
            true
        }
        Err(e) => {
            warn!(source = %source.display(), error = %e, "thumbnail generation failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    #[test]
    fn plan_thumbnail_copies_config() {
        let config = ThumbnailConfig {
            max_edge: 150,
            quality: Quality::new(60),
        };
        let params = plan_thumbnail(Path::new("/a.jpg"), Path::new("/t/a.jpg.jpg"), &config);

        assert_eq!(params.max_edge, 150);
        assert_eq!(params.quality.value(), 60);
        assert_eq!(params.output, Path::new("/t/a.jpg.jpg"));
    }

    #[test]
    fn ensure_thumbnail_creates_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("thumbs").join("a.jpg.jpg");
        let backend = MockBackend::new();

        assert!(ensure_thumbnail(
            &backend,
            Path::new("/images/a.jpg"),
            &output,
            &ThumbnailConfig::default()
        ));

        assert!(output.exists());
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Thumbnail { max_edge: 300, quality: 80, .. }
        ));
    }

    #[test]
    fn ensure_thumbnail_reuses_existing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("a.jpg.jpg");
        std::fs::write(&output, b"old").unwrap();
        let backend = MockBackend::new();

        assert!(ensure_thumbnail(
            &backend,
            Path::new("/images/a.jpg"),
            &output,
            &ThumbnailConfig::default()
        ));

        assert_eq!(backend.thumbnail_count(), 0);
        assert_eq!(std::fs::read(&output).unwrap(), b"old");
    }

    #[test]
    fn ensure_thumbnail_reports_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("a.jpg.jpg");
        let backend = MockBackend {
            fail_thumbnails: true,
            ..MockBackend::default()
        };

        assert!(!ensure_thumbnail(
            &backend,
            Path::new("/images/a.jpg"),
            &output,
            &ThumbnailConfig::default()
        ));
        assert!(!output.exists());
    }
}
