//! Media kinds, filename classification, and the records served per kind.
//!
//! Every file in a watched directory is classified purely by name:
//!
//! - names starting with `.` are hidden and never classified
//! - a music extension makes it [`MediaKind::Music`]
//! - an image extension makes it [`MediaKind::Images`]
//! - anything else is a [`MediaKind::Documents`] entry
//!
//! The document rule is a catch-all, so partially written files, editor
//! swap files without a leading dot and unknown formats all show up as
//! documents. Each kind directory only admits files of its own kind, so a
//! stray `.mp3` in the documents directory is ignored rather than listed.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// One of the three independently cached collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Music,
    Images,
    Documents,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Music, MediaKind::Images, MediaKind::Documents];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Music => "music",
            MediaKind::Images => "images",
            MediaKind::Documents => "documents",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown media kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for MediaKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "music" => Ok(MediaKind::Music),
            "images" => Ok(MediaKind::Images),
            "documents" => Ok(MediaKind::Documents),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Extension lists that drive classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    music: Vec<String>,
    images: Vec<String>,
}

impl Classifier {
    /// Build from configured extension lists. Entries are normalized to
    /// lowercase without a leading dot; empty entries are dropped.
    pub fn new<S: AsRef<str>>(music: &[S], images: &[S]) -> Self {
        Self {
            music: normalize_extensions(music),
            images: normalize_extensions(images),
        }
    }

    /// Classify a file name. `None` for hidden names.
    pub fn classify_name(&self, name: &str) -> Option<MediaKind> {
        if name.is_empty() || is_hidden(name) {
            return None;
        }
        let ext = extension_of(name);
        if self.music.iter().any(|e| *e == ext) {
            Some(MediaKind::Music)
        } else if self.images.iter().any(|e| *e == ext) {
            Some(MediaKind::Images)
        } else {
            Some(MediaKind::Documents)
        }
    }

    /// Classify by the final path component.
    pub fn classify(&self, path: &Path) -> Option<MediaKind> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| self.classify_name(n))
    }

    /// Whether `name` belongs in the collection for `kind`.
    pub fn accepts(&self, kind: MediaKind, name: &str) -> bool {
        self.classify_name(name) == Some(kind)
    }
}

fn normalize_extensions<S: AsRef<str>>(exts: &[S]) -> Vec<String> {
    exts.iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Lowercased extension without the dot, or `""` when there is none.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Filename without its extension.
pub fn stem_of(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Metadata for one audio file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioRecord {
    pub filename: String,
    pub title: String,
    pub artist: String,
    pub lyrics: String,
    /// Seconds.
    pub duration: f64,
    pub created: String,
    pub modified: String,
}

/// Metadata for one image file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub filename: String,
    pub title: String,
    pub caption: String,
    pub width: u32,
    pub height: u32,
    /// EXIF-style `YYYY:MM:DD HH:MM:SS`.
    pub date_taken: String,
    pub url: String,
    pub thumbnail_url: String,
    pub created: String,
    pub modified: String,
}

/// Filesystem facts for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub filename: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub url: String,
    pub created: String,
    pub modified: String,
}

/// A record of any kind. Serialized without a variant tag, so clients see
/// the same flat objects per collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MediaRecord {
    Audio(AudioRecord),
    Image(ImageRecord),
    Document(DocumentRecord),
}

impl MediaRecord {
    pub fn filename(&self) -> &str {
        match self {
            MediaRecord::Audio(r) => &r.filename,
            MediaRecord::Image(r) => &r.filename,
            MediaRecord::Document(r) => &r.filename,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaRecord::Audio(_) => MediaKind::Music,
            MediaRecord::Image(_) => MediaKind::Images,
            MediaRecord::Document(_) => MediaKind::Documents,
        }
    }
}
