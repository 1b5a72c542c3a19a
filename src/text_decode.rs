//! Best-effort decoding of tag text with an unreliable declared encoding.
//!
//! ID3 frames and EXIF fields written by cheap recorders, phones and older
//! Windows tools frequently mix an ASCII prefix with UTF-16LE payloads, or
//! carry UTF-16 text inside a frame that claims to be Latin-1. The decoder
//! guesses the layout from the position of the first NUL byte and the NUL
//! density of the head of the buffer:
//!
//! | Shape | Example | Treatment |
//! |---|---|---|
//! | ASCII prefix, NUL, UTF-16LE | `0:05:22\0S\0o\0n\0g\0` | decode after the first NUL |
//! | UTF-16LE with a marker prefix | `e\0n\0\0\0H\0i\0` | decode all, drop through first NUL char |
//! | ASCII with stray control bytes | `Te\x01st` | keep printable ASCII |
//!
//! The thresholds (`> 5` bytes of prefix, `> 30%` NULs in the first 20 bytes)
//! were tuned against real tag samples and must stay as they are.
//!
//! Decoding never fails: any stage that cannot decode yields an empty string.

/// A NUL byte past this offset marks an ASCII prefix followed by UTF-16LE.
const PREFIX_NUL_OFFSET: usize = 5;

/// Number of leading bytes sampled for the NUL-density check.
const SAMPLE_LEN: usize = 20;

/// NUL ratio in the sample above which the buffer is read as UTF-16LE.
const UTF16_NUL_RATIO: f64 = 0.3;

/// Decode a raw tag byte sequence into printable text.
pub fn decode_tag_bytes(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    if let Some(nul) = bytes.iter().position(|&b| b == 0)
        && nul > PREFIX_NUL_OFFSET
    {
        return match decode_utf16le(&bytes[nul + 1..]) {
            Some(text) => tidy(&text),
            None => String::new(),
        };
    }

    let sample = &bytes[..bytes.len().min(SAMPLE_LEN)];
    let nuls = sample.iter().filter(|&&b| b == 0).count();
    if nuls as f64 / sample.len() as f64 > UTF16_NUL_RATIO {
        return match decode_utf16le(bytes) {
            Some(text) => {
                let body = match text.find('\0') {
                    Some(pos) => &text[pos + 1..],
                    None => text.as_str(),
                };
                tidy(body)
            }
            None => String::new(),
        };
    }

    let printable: String = bytes
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .filter(|&c| is_printable_ascii(c) || is_space(c))
        .collect();
    printable.trim_matches(is_space).to_string()
}

/// Decode text that was already (wrongly) decoded as single-byte Latin-1.
///
/// The string is mapped back to its original bytes one char per byte and then
/// run through [`decode_tag_bytes`]. A char outside Latin-1 means the text was
/// never single-byte, so nothing can be recovered and the result is empty.
pub fn decode_tag_text(text: &str) -> String {
    let bytes: Option<Vec<u8>> = text.chars().map(|c| u8::try_from(c).ok()).collect();
    match bytes {
        Some(bytes) => decode_tag_bytes(&bytes),
        None => String::new(),
    }
}

/// Strict UTF-16LE decode: odd lengths and unpaired surrogates fail.
fn decode_utf16le(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Remove NUL chars and surrounding whitespace.
fn tidy(text: &str) -> String {
    let cleaned: String = text.chars().filter(|&c| c != '\0').collect();
    cleaned.trim_matches(is_space).to_string()
}

fn is_printable_ascii(c: char) -> bool {
    (' '..='~').contains(&c)
}

/// Whitespace, including the ASCII information separators 0x1C-0x1F that tag
/// writers use as field delimiters.
fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    // =========================================================================
    // Prefix + UTF-16LE
    // =========================================================================

    #[test]
    fn timestamp_prefix_then_utf16() {
        assert_eq!(decode_tag_bytes(b"0:05:22\x00S\x00o\x00n\x00g\x00"), "Song");
    }

    #[test]
    fn prefix_with_odd_utf16_tail_is_empty() {
        assert_eq!(decode_tag_bytes(b"0:05:22\x00S\x00o\x00n"), "");
    }

    #[test]
    fn prefix_with_empty_tail_is_empty() {
        assert_eq!(decode_tag_bytes(b"Comment\x00"), "");
    }

    #[test]
    fn prefix_tail_is_trimmed() {
        let mut bytes = b"00:01:02\x00".to_vec();
        bytes.extend(utf16le("  Intro \0"));
        assert_eq!(decode_tag_bytes(&bytes), "Intro");
    }

    // =========================================================================
    // Whole-buffer UTF-16LE
    // =========================================================================

    #[test]
    fn utf16_with_marker_prefix() {
        let bytes = utf16le("en\0Hello");
        assert_eq!(decode_tag_bytes(&bytes), "Hello");
    }

    #[test]
    fn utf16_without_nul_char_keeps_everything() {
        assert_eq!(decode_tag_bytes(&utf16le("Hello")), "Hello");
    }

    #[test]
    fn utf16_drops_only_through_first_nul_char() {
        let bytes = utf16le("x\0Two\0Parts");
        assert_eq!(decode_tag_bytes(&bytes), "TwoParts");
    }

    #[test]
    fn utf16_unpaired_surrogate_is_empty() {
        let bytes = [0x00, 0xD8, 0x41, 0x00, 0x42, 0x00];
        assert_eq!(decode_tag_bytes(&bytes), "");
    }

    #[test]
    fn utf16_non_ascii_text() {
        let bytes = utf16le("\0Café Müller");
        assert_eq!(decode_tag_bytes(&bytes), "Café Müller");
    }

    #[test]
    fn nul_density_at_threshold_stays_ascii() {
        // 6 NULs in 20 bytes is exactly 30%, which is not above the threshold.
        let mut bytes = b"A\0B\0C\0D\0E\0F\0".to_vec();
        bytes.extend_from_slice(b"GHIJKLMN");
        assert_eq!(decode_tag_bytes(&bytes), "ABCDEFGHIJKLMN");
    }

    // =========================================================================
    // ASCII with control bytes
    // =========================================================================

    #[test]
    fn ascii_control_bytes_removed() {
        assert_eq!(decode_tag_bytes(b"Te\x01st"), "Test");
    }

    #[test]
    fn ascii_high_bytes_ignored() {
        assert_eq!(decode_tag_bytes(b"Caf\xe9 Bar"), "Caf Bar");
    }

    #[test]
    fn ascii_whitespace_preserved_inside_trimmed_outside() {
        assert_eq!(decode_tag_bytes(b"  line one\nline two\t "), "line one\nline two");
    }

    #[test]
    fn ascii_short_nul_prefix_falls_through() {
        // NUL at offset 3 is not a timestamp prefix; density is 1/8.
        assert_eq!(decode_tag_bytes(b"abc\x00defg"), "abcdefg");
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(decode_tag_bytes(b""), "");
        assert_eq!(decode_tag_text(""), "");
    }

    // =========================================================================
    // Mis-decoded text input
    // =========================================================================

    #[test]
    fn text_path_recovers_latin1_bytes() {
        let misread: String = b"0:05:22\x00S\x00o\x00n\x00g\x00"
            .iter()
            .map(|&b| b as char)
            .collect();
        assert_eq!(decode_tag_text(&misread), "Song");
    }

    #[test]
    fn text_path_plain_ascii_passes_through() {
        assert_eq!(decode_tag_text("Plain Title"), "Plain Title");
    }

    #[test]
    fn text_outside_latin1_is_empty() {
        assert_eq!(decode_tag_text("日本"), "");
    }
}
