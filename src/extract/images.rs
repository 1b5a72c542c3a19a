use super::{ExtractError, Extractor, file_name};
use crate::imaging::{Dimensions, ImageBackend, ImageMetadata, ThumbnailConfig, ensure_thumbnail};
use crate::media::{ImageRecord, MediaKind, MediaRecord, stem_of};
use crate::metadata::{exif_timestamp, file_times, resolve};
use crate::text_decode::decode_tag_bytes;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

/// Image metadata plus a thumbnail side effect.
///
/// Dimensions are read first. When they cannot be read the record is still
/// produced, as 0x0, and no thumbnail is attempted.
pub struct ImageExtractor<'a, B: ImageBackend> {
    backend: &'a B,
    thumbnails_dir: PathBuf,
    thumbnail_config: ThumbnailConfig,
}

impl<'a, B: ImageBackend> ImageExtractor<'a, B> {
    pub fn new(backend: &'a B, thumbnails_dir: &Path, thumbnail_config: ThumbnailConfig) -> Self {
        Self {
            backend,
            thumbnails_dir: thumbnails_dir.to_path_buf(),
            thumbnail_config,
        }
    }
}

/// Where the thumbnail for `filename` lives: `<dir>/<filename>.jpg`.
pub fn thumbnail_path(thumbnails_dir: &Path, filename: &str) -> PathBuf {
    thumbnails_dir.join(format!("{filename}.jpg"))
}

impl<B: ImageBackend> Extractor for ImageExtractor<'_, B> {
    fn kind(&self) -> MediaKind {
        MediaKind::Images
    }

    fn extract(&self, path: &Path) -> Result<MediaRecord, ExtractError> {
        let filename = file_name(path)?;
        let stat = std::fs::metadata(path)?;
        let (created, modified) = file_times(&stat);

        let dimensions = match self.backend.identify(path) {
            Ok(dims) => Some(dims),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "cannot read image dimensions");
                None
            }
        };

        let embedded = self.backend.read_metadata(path)?;
        let fields = resolve_fields(&embedded);

        if dimensions.is_some() {
            let thumb = thumbnail_path(&self.thumbnails_dir, &filename);
            ensure_thumbnail(self.backend, path, &thumb, &self.thumbnail_config);
        }

        let Dimensions { width, height } = dimensions.unwrap_or_default();
        let mtime = stat.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        Ok(MediaRecord::Image(ImageRecord {
            title: fields.title.unwrap_or_else(|| stem_of(&filename)),
            caption: fields.caption.unwrap_or_default(),
            width,
            height,
            date_taken: fields.date_taken.unwrap_or_else(|| exif_timestamp(mtime)),
            url: format!("/images/{filename}"),
            thumbnail_url: format!("/thumbnails/{filename}.jpg"),
            filename,
            created,
            modified,
        }))
    }
}

#[derive(Debug, Default, PartialEq)]
struct ImageFields {
    title: Option<String>,
    caption: Option<String>,
    date_taken: Option<String>,
}

fn resolve_fields(meta: &ImageMetadata) -> ImageFields {
    let decode = |raw: &Option<Vec<u8>>| raw.as_deref().map(decode_tag_bytes);

    let xp_title = decode(&meta.xp_title);
    let document_name = decode(&meta.document_name);
    let xp_comment = decode(&meta.xp_comment);
    let description = decode(&meta.image_description);
    let original = decode(&meta.date_time_original);
    let date_time = decode(&meta.date_time);

    ImageFields {
        title: resolve(&[
            meta.iptc_title.as_deref(),
            xp_title.as_deref(),
            document_name.as_deref(),
        ]),
        caption: resolve(&[
            meta.iptc_caption.as_deref(),
            xp_comment.as_deref(),
            description.as_deref(),
        ]),
        date_taken: resolve(&[original.as_deref(), date_time.as_deref()]),
    }
}
