//! Record field resolution shared by the extractors.
//!
//! A field like an image title can come from several sources. Sources are
//! listed in priority order and the first non-empty value wins:
//!
//! ```text
//! title:      resolve(&[iptc_title,   xp_title,   document_name])
//! caption:    resolve(&[iptc_caption, xp_comment, image_description])
//! date_taken: resolve(&[date_time_original, date_time])
//! ```
//!
//! Timestamps are rendered in local time. Record timestamps use ISO-8601,
//! with a microsecond fraction unless it would be zero. The image date
//! fallback uses the EXIF layout so the field has one format whichever
//! source produced it.

use chrono::{DateTime, Local, Timelike};
use std::fs::Metadata;
use std::time::SystemTime;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const ISO_MICROS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const EXIF_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Return the first source that is non-empty after trimming.
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Local ISO-8601, with microseconds only when there are any.
pub fn iso_timestamp(time: SystemTime) -> String {
    let local = DateTime::<Local>::from(time).naive_local();
    let format = if local.nanosecond() / 1_000 == 0 {
        ISO_FORMAT
    } else {
        ISO_MICROS_FORMAT
    };
    local.format(format).to_string()
}

pub fn exif_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .naive_local()
        .format(EXIF_FORMAT)
        .to_string()
}

/// `(created, modified)` as ISO strings.
///
/// Platforms without a birth time report the modification time for both.
pub fn file_times(meta: &Metadata) -> (String, String) {
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let created = meta.created().unwrap_or(modified);
    (iso_timestamp(created), iso_timestamp(modified))
}
