//! CLI output formatting.
//!
//! Output is information-first: each record leads with its positional index
//! and title, and the file it came from is shown as indented context.
//!
//! ```text
//! Music (2 files)
//! 001 Blue Train
//!     Source: blue-train.mp3
//!     Artist: John Coltrane, 10:43
//! 002 (untitled.wav)
//!     Artist: Unknown, 0:04
//!
//! Images (1 file)
//! 001 Dusk (4000x3000)
//!     Source: 001-dusk.jpg
//!     Caption: Last light over the ridge
//!     Taken: 2024:06:01 21:14:09
//!
//! Documents (1 file)
//! 001 report.pdf
//!     pdf, 12.3 KB
//! ```
//!
//! Each listing has a `format_*` function returning `Vec<String>` for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::cache::CollectionCounts;
use crate::media::{AudioRecord, DocumentRecord, ImageRecord, MediaKind, MediaRecord, stem_of};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// A title that merely repeats the filename stem is no title at all; show
/// the filename in parens instead.
fn entity_line(index: usize, title: &str, filename: &str) -> String {
    if title.is_empty() || title == stem_of(filename) {
        format!("{} ({})", format_index(index), filename)
    } else {
        format!("{} {}", format_index(index), title)
    }
}

fn section_header(kind: MediaKind, count: usize) -> String {
    let mut name = kind.as_str().to_string();
    if let Some(first) = name.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    let noun = if count == 1 { "file" } else { "files" };
    format!("{name} ({count} {noun})")
}

/// `m:ss`, or `h:mm:ss` past an hour.
fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

// ============================================================================
// Per-record lines
// ============================================================================

fn audio_lines(index: usize, record: &AudioRecord) -> Vec<String> {
    let mut lines = vec![entity_line(index, &record.title, &record.filename)];
    if record.title != stem_of(&record.filename) {
        lines.push(format!("{}Source: {}", indent(1), record.filename));
    }
    lines.push(format!(
        "{}Artist: {}, {}",
        indent(1),
        record.artist,
        format_duration(record.duration)
    ));
    if !record.lyrics.is_empty() {
        lines.push(format!("{}Lyrics: {}", indent(1), truncate(&record.lyrics, 40)));
    }
    lines
}

fn image_lines(index: usize, record: &ImageRecord) -> Vec<String> {
    let mut header = entity_line(index, &record.title, &record.filename);
    if record.width > 0 && record.height > 0 {
        header.push_str(&format!(" ({}x{})", record.width, record.height));
    }
    let mut lines = vec![header];
    if record.title != stem_of(&record.filename) {
        lines.push(format!("{}Source: {}", indent(1), record.filename));
    }
    if !record.caption.is_empty() {
        lines.push(format!("{}Caption: {}", indent(1), truncate(&record.caption, 60)));
    }
    lines.push(format!("{}Taken: {}", indent(1), record.date_taken));
    lines
}

fn document_lines(index: usize, record: &DocumentRecord) -> Vec<String> {
    let doc_type = if record.doc_type.is_empty() {
        "no extension"
    } else {
        &record.doc_type
    };
    vec![
        format!("{} {}", format_index(index), record.filename),
        format!("{}{}, {}", indent(1), doc_type, format_size(record.size)),
    ]
}

// ============================================================================
// Listings
// ============================================================================

/// Format one collection listing.
pub fn format_collection(kind: MediaKind, records: &[MediaRecord]) -> Vec<String> {
    let mut lines = vec![section_header(kind, records.len())];
    for (i, record) in records.iter().enumerate() {
        let index = i + 1;
        lines.extend(match record {
            MediaRecord::Audio(r) => audio_lines(index, r),
            MediaRecord::Image(r) => image_lines(index, r),
            MediaRecord::Document(r) => document_lines(index, r),
        });
    }
    lines
}

pub fn print_collection(kind: MediaKind, records: &[MediaRecord]) {
    for line in format_collection(kind, records) {
        println!("{}", line);
    }
}

/// Format the summary after a full rebuild.
pub fn format_refresh_counts(counts: &CollectionCounts) -> Vec<String> {
    let total = counts.total();
    let noun = if total == 1 { "file" } else { "files" };
    vec![
        format!("Refreshed {}", counts),
        format!("{}{total} {noun} indexed", indent(1)),
    ]
}

pub fn print_refresh_counts(counts: &CollectionCounts) {
    for line in format_refresh_counts(counts) {
        println!("{}", line);
    }
}
