use super::{ExtractError, Extractor, file_name};
use crate::media::{AudioRecord, MediaKind, MediaRecord, stem_of};
use crate::metadata::file_times;
use crate::text_decode::{decode_tag_bytes, decode_tag_text};
use lofty::prelude::*;
use lofty::tag::{ItemValue, Tag};
use std::path::Path;

const UNKNOWN_ARTIST: &str = "Unknown";

/// Audio metadata through `lofty`.
///
/// The container must parse (an unreadable container skips the file), but
/// missing or garbled tags only fall back to defaults:
/// title → filename stem, artist → `"Unknown"`, lyrics → `""`.
pub struct AudioExtractor;

impl Extractor for AudioExtractor {
    fn kind(&self) -> MediaKind {
        MediaKind::Music
    }

    fn extract(&self, path: &Path) -> Result<MediaRecord, ExtractError> {
        let filename = file_name(path)?;
        let (created, modified) = file_times(&std::fs::metadata(path)?);

        let tagged = lofty::read_from_path(path)?;
        let duration = tagged.properties().duration().as_secs_f64();
        let tag = tagged.primary_tag().or_else(|| tagged.first_tag());
        let field = |key: ItemKey| tag.and_then(|t| tag_field(t, &key));

        Ok(MediaRecord::Audio(AudioRecord {
            title: field(ItemKey::TrackTitle).unwrap_or_else(|| stem_of(&filename)),
            artist: field(ItemKey::TrackArtist).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            lyrics: field(ItemKey::Lyrics).unwrap_or_default(),
            filename,
            duration,
            created,
            modified,
        }))
    }
}

/// Text of one field, rejoined across items.
///
/// ID3v2 values arrive split on NUL with one item per piece, so the pieces
/// are joined back before anything looks at the NULs.
fn tag_field(tag: &Tag, key: &ItemKey) -> Option<String> {
    let text = match tag.get(key)?.value() {
        ItemValue::Binary(bytes) => decode_tag_bytes(bytes),
        _ => {
            let pieces: Vec<&str> = tag
                .get_items(key)
                .filter_map(|item| match item.value() {
                    ItemValue::Text(s) | ItemValue::Locator(s) => Some(s.as_str()),
                    ItemValue::Binary(_) => None,
                })
                .collect();
            text_value(&pieces.join("\0"))
        }
    };
    Some(text).filter(|s| !s.is_empty())
}

/// Readable text for one NUL-joined value.
///
/// Trailing terminators alone are just dropped. When every piece after the
/// first is at most one character, the value is UTF-16LE bytes that were
/// decoded one byte per character, and it goes back through the decoder.
/// Anything else holds several real values and the first non-empty one wins.
/// A lone single-character second value looks the same as UTF-16 and
/// decodes that way.
fn text_value(raw: &str) -> String {
    let body = raw.trim_end_matches('\0');
    let mut pieces = body.split('\0');
    let head = pieces.next().unwrap_or_default();
    let rest: Vec<&str> = pieces.collect();
    if rest.is_empty() {
        return body.trim().to_string();
    }

    if rest.iter().all(|p| p.chars().count() <= 1) {
        let mut decoded = decode_tag_text(raw);
        if decoded.is_empty() && !raw.ends_with('\0') {
            // Latin-1 readers strip trailing NULs, taking the high byte of
            // the last UTF-16 unit with them.
            decoded = decode_tag_text(&format!("{raw}\0"));
        }
        if !decoded.is_empty() {
            return decoded;
        }
    }

    std::iter::once(head)
        .chain(rest)
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or_default()
        .to_string()
}
