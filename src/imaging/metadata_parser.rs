//! Embedded EXIF and IPTC reader for JPEG and TIFF files.
//!
//! Only the handful of fields the image extractor resolves titles, captions
//! and capture dates from are collected (see
//! [`ImageMetadata`](super::backend::ImageMetadata) for the table).
//!
//! Where the fields live:
//!
//! - **JPEG**: APP1 starting with `Exif\0\0` holds a complete TIFF block;
//!   APP13 holds Photoshop `8BIM` resources, of which `0x0404` is IPTC-IIM.
//! - **TIFF**: the file *is* the TIFF block. IFD0 carries the EXIF text tags,
//!   tag 33723 raw IIM bytes, tag 34377 a Photoshop resource block, and tag
//!   0x8769 points at the Exif sub-IFD holding DateTimeOriginal.
//!
//! The format is detected from magic bytes, not the extension. Malformed
//! data never panics: every read is bounds-checked and a parse failure just
//! leaves fields unset.

use super::backend::ImageMetadata;
use std::path::Path;

/// Read embedded metadata from a file. Unreadable or unsupported files give
/// empty metadata.
pub fn read_embedded(path: &Path) -> ImageMetadata {
    match std::fs::read(path) {
        Ok(bytes) => parse_embedded(&bytes),
        Err(_) => ImageMetadata::default(),
    }
}

/// Dispatch on magic bytes.
pub fn parse_embedded(data: &[u8]) -> ImageMetadata {
    let mut meta = ImageMetadata::default();
    if data.starts_with(&[0xFF, 0xD8]) {
        read_jpeg(data, &mut meta);
    } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        read_tiff_block(data, &mut meta);
    }
    meta
}

// ---------------------------------------------------------------------------
// JPEG segments
// ---------------------------------------------------------------------------

const APP1: u8 = 0xE1;
const APP13: u8 = 0xED;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const EXIF_HEADER: &[u8] = b"Exif\0\0";

fn read_jpeg(data: &[u8], meta: &mut ImageMetadata) {
    for (marker, payload) in jpeg_segments(data) {
        match marker {
            APP1 if payload.starts_with(EXIF_HEADER) => {
                read_tiff_block(&payload[EXIF_HEADER.len()..], meta);
            }
            APP13 => {
                if let Some(iim) = iptc_from_8bim(payload) {
                    parse_iptc_iim(iim, meta);
                }
            }
            _ => {}
        }
    }
}

/// Marker segments up to the start of scan, as `(marker, payload)`.
fn jpeg_segments(data: &[u8]) -> Vec<(u8, &[u8])> {
    let mut segments = Vec::new();
    let mut pos = 2;

    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        // Fill bytes before a marker
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == SOS || marker == EOI {
            break;
        }
        // Standalone markers carry no length
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }

        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if len < 2 {
            break;
        }
        let start = pos + 4;
        let end = (pos + 2 + len).min(data.len());
        segments.push((marker, &data[start..end]));
        pos += 2 + len;
    }

    segments
}

// ---------------------------------------------------------------------------
// Photoshop 8BIM resources and IPTC-IIM
// ---------------------------------------------------------------------------

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

/// Find the IPTC-IIM resource inside a Photoshop resource block.
///
/// Resource layout: `8BIM`, id (u16), Pascal name padded to even length,
/// data length (u32), data padded to even length.
fn iptc_from_8bim(segment: &[u8]) -> Option<&[u8]> {
    let data = segment.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(segment);

    let mut pos = 0;
    while pos + 12 <= data.len() {
        if &data[pos..pos + 4] != BIM_MARKER {
            pos += 1;
            continue;
        }
        pos += 4;

        let resource_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
        pos += 2;

        let name_len = data[pos] as usize;
        pos += 1 + name_len + ((1 + name_len) % 2);

        let len_bytes = data.get(pos..pos + 4)?;
        let res_len =
            u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
        pos += 4;

        let body = data.get(pos..pos.checked_add(res_len)?)?;
        if resource_id == IPTC_RESOURCE_ID {
            return Some(body);
        }
        pos += res_len + (res_len % 2);
    }

    None
}

/// Collect ObjectName (2:05) and Caption-Abstract (2:120) from IIM datasets.
///
/// Dataset layout: `0x1C`, record, dataset, length (u16 BE), data.
fn parse_iptc_iim(data: &[u8], meta: &mut ImageMetadata) {
    let mut pos = 0;

    while pos + 5 <= data.len() {
        if data[pos] != 0x1C {
            pos += 1;
            continue;
        }

        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let length = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        pos += 5;

        let Some(value) = data.get(pos..pos + length) else {
            break;
        };
        pos += length;

        if record != 2 {
            continue;
        }
        let text = String::from_utf8_lossy(value).trim().to_string();
        if text.is_empty() {
            continue;
        }
        match dataset {
            5 if meta.iptc_title.is_none() => meta.iptc_title = Some(text),
            120 if meta.iptc_caption.is_none() => meta.iptc_caption = Some(text),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// TIFF / EXIF IFDs
// ---------------------------------------------------------------------------

const TAG_DOCUMENT_NAME: u16 = 0x010D;
const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_DATE_TIME: u16 = 0x0132;
const TAG_IPTC_NAA: u16 = 33723;
const TAG_PHOTOSHOP: u16 = 34377;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_XP_TITLE: u16 = 0x9C9B;
const TAG_XP_COMMENT: u16 = 0x9C9C;

/// Guards against IFD chains that loop back on themselves.
const MAX_IFDS: usize = 8;

struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
}

#[derive(Debug, Clone, Copy)]
struct IfdEntry {
    tag: u16,
    typ: u16,
    count: u32,
    /// Offset of the 4-byte value/offset field.
    value_pos: usize,
}

impl<'a> Tiff<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let big_endian = match data.get(0..2)? {
            b"MM" => true,
            b"II" => false,
            _ => return None,
        };
        let tiff = Self { data, big_endian };
        (tiff.u16(2)? == 42).then_some(tiff)
    }

    fn u16(&self, offset: usize) -> Option<u16> {
        let b = self.data.get(offset..offset + 2)?;
        Some(if self.big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    }

    fn u32(&self, offset: usize) -> Option<u32> {
        let b = self.data.get(offset..offset + 4)?;
        Some(if self.big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    }

    /// Entries of the IFD at `offset` plus the offset of the next IFD.
    fn ifd(&self, offset: usize) -> Option<(Vec<IfdEntry>, usize)> {
        let count = self.u16(offset)? as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let at = offset + 2 + i * 12;
            entries.push(IfdEntry {
                tag: self.u16(at)?,
                typ: self.u16(at + 2)?,
                count: self.u32(at + 4)?,
                value_pos: at + 8,
            });
        }
        let next = self.u32(offset + 2 + count * 12).unwrap_or(0) as usize;
        Some((entries, next))
    }

    /// Raw value bytes of an entry; values of four bytes or less are inline.
    fn value(&self, entry: &IfdEntry) -> Option<&'a [u8]> {
        let len = (entry.count as usize).checked_mul(type_size(entry.typ))?;
        let start = if len <= 4 {
            entry.value_pos
        } else {
            self.u32(entry.value_pos)? as usize
        };
        self.data.get(start..start.checked_add(len)?)
    }
}

/// Byte size of one value of a TIFF field type.
fn type_size(typ: u16) -> usize {
    match typ {
        1 | 2 | 6 | 7 => 1, // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => 2,         // SHORT, SSHORT
        4 | 9 | 11 => 4,    // LONG, SLONG, FLOAT
        5 | 10 | 12 => 8,   // RATIONAL, SRATIONAL, DOUBLE
        _ => 1,
    }
}

fn read_tiff_block(data: &[u8], meta: &mut ImageMetadata) {
    let Some(tiff) = Tiff::parse(data) else {
        return;
    };

    let mut offset = tiff.u32(4).unwrap_or(0) as usize;
    let mut visited = Vec::new();

    while offset > 0 && visited.len() < MAX_IFDS && !visited.contains(&offset) {
        visited.push(offset);
        let Some((entries, next)) = tiff.ifd(offset) else {
            break;
        };
        for entry in &entries {
            read_entry(&tiff, entry, meta);
        }
        offset = next;
    }
}

fn read_entry(tiff: &Tiff<'_>, entry: &IfdEntry, meta: &mut ImageMetadata) {
    if entry.tag == TAG_EXIF_IFD {
        if let Some(sub) = tiff.u32(entry.value_pos)
            && let Some((entries, _)) = tiff.ifd(sub as usize)
        {
            for sub_entry in entries.iter().filter(|e| e.tag != TAG_EXIF_IFD) {
                read_entry(tiff, sub_entry, meta);
            }
        }
        return;
    }

    let Some(value) = tiff.value(entry) else {
        return;
    };

    match entry.tag {
        TAG_DOCUMENT_NAME => keep_first(&mut meta.document_name, trim_nul_padding(value)),
        TAG_IMAGE_DESCRIPTION => {
            keep_first(&mut meta.image_description, trim_nul_padding(value))
        }
        TAG_DATE_TIME => keep_first(&mut meta.date_time, trim_nul_padding(value)),
        TAG_DATE_TIME_ORIGINAL => {
            keep_first(&mut meta.date_time_original, trim_nul_padding(value))
        }
        TAG_XP_TITLE => keep_first(&mut meta.xp_title, strip_utf16_terminator(value)),
        TAG_XP_COMMENT => keep_first(&mut meta.xp_comment, strip_utf16_terminator(value)),
        TAG_IPTC_NAA => parse_iptc_iim(value, meta),
        TAG_PHOTOSHOP => {
            if let Some(iim) = iptc_from_8bim(value) {
                parse_iptc_iim(iim, meta);
            }
        }
        _ => {}
    }
}

fn keep_first(slot: &mut Option<Vec<u8>>, value: &[u8]) {
    if slot.is_none() && !value.is_empty() {
        *slot = Some(value.to_vec());
    }
}

/// ASCII fields end in one or more NUL bytes.
fn trim_nul_padding(value: &[u8]) -> &[u8] {
    let end = value.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    &value[..end]
}

/// Drop trailing UTF-16 NUL code units, keeping the buffer even-aligned.
fn strip_utf16_terminator(value: &[u8]) -> &[u8] {
    let mut end = value.len() - value.len() % 2;
    while end >= 2 && value[end - 2] == 0 && value[end - 1] == 0 {
        end -= 2;
    }
    &value[..end]
}
