use super::{ExtractError, Extractor, file_name};
use crate::media::{DocumentRecord, MediaKind, MediaRecord, extension_of};
use crate::metadata::file_times;
use std::path::Path;

/// Documents are never opened; the record is built from `stat` alone.
pub struct DocumentExtractor;

impl Extractor for DocumentExtractor {
    fn kind(&self) -> MediaKind {
        MediaKind::Documents
    }

    fn extract(&self, path: &Path) -> Result<MediaRecord, ExtractError> {
        let filename = file_name(path)?;
        let stat = std::fs::metadata(path)?;
        let (created, modified) = file_times(&stat);

        Ok(MediaRecord::Document(DocumentRecord {
            size: stat.len(),
            doc_type: extension_of(&filename),
            url: format!("/documents/{filename}"),
            filename,
            created,
            modified,
        }))
    }
}
