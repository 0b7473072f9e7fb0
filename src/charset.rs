//! Text encodings for log files.
//!
//! Characters the target charset cannot represent are replaced with `?` so a single
//! unmappable glyph never costs the whole entry.

use std::borrow::Cow;
use std::fmt::{self, Display};

use encoding_rs::{EncoderResult, Encoding};
use tracing::warn;

const REPLACEMENT: u8 = b'?';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Charset {
    #[default]
    Utf8,
    /// Strict 7-bit US-ASCII
    Ascii,
    /// ISO-8859-1, every code point up to U+00FF
    Latin1,
    /// Big-endian UTF-16 preceded by a byte order mark at the start of the file
    Utf16,
    Utf16Le,
    Utf16Be,
    /// Any other single or multi byte encoding known to `encoding_rs`
    Other(&'static Encoding),
}

impl Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Charset {
    /// Looks up a charset by name. Case, dashes and underscores are ignored for the
    /// built in charsets.
    pub fn from_name(name: &str) -> Option<Charset> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        let charset = match normalized.as_str() {
            "utf8" => Charset::Utf8,
            "ascii" | "usascii" | "us" | "iso646us" => Charset::Ascii,
            "iso88591" | "latin1" | "l1" => Charset::Latin1,
            "utf16" => Charset::Utf16,
            "utf16le" => Charset::Utf16Le,
            "utf16be" => Charset::Utf16Be,
            _ => {
                let encoding = Encoding::for_label(name.trim().as_bytes())?;
                // Labels decoding as UTF-16 or "replacement" have no encoder of their own
                if encoding.output_encoding() != encoding {
                    return None;
                }
                if encoding == encoding_rs::UTF_8 {
                    Charset::Utf8
                } else {
                    Charset::Other(encoding)
                }
            }
        };

        Some(charset)
    }

    /// Resolves an optional configured name. Unknown names fall back to UTF-8 after
    /// a warning.
    pub fn resolve(name: Option<&str>) -> Charset {
        match name {
            None => Charset::default(),
            Some(name) => Charset::from_name(name).unwrap_or_else(|| {
                warn!("Invalid charset '{}', falling back to {}", name, Charset::default());
                Charset::default()
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Ascii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Utf16 => "UTF-16",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Other(encoding) => encoding.name(),
        }
    }

    /// Bytes to put at the start of an empty file.
    pub fn header(&self) -> &'static [u8] {
        match self {
            Charset::Utf16 => &[0xFE, 0xFF],
            _ => &[],
        }
    }

    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        match self {
            Charset::Utf8 => Cow::Borrowed(text.as_bytes()),
            Charset::Ascii if text.is_ascii() => Cow::Borrowed(text.as_bytes()),
            Charset::Ascii => Cow::Owned(
                text.chars()
                    .map(|c| if c.is_ascii() { c as u8 } else { REPLACEMENT })
                    .collect(),
            ),
            Charset::Latin1 if text.is_ascii() => Cow::Borrowed(text.as_bytes()),
            Charset::Latin1 => Cow::Owned(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT))
                    .collect(),
            ),
            Charset::Utf16 | Charset::Utf16Be => Cow::Owned(
                text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            ),
            Charset::Utf16Le => Cow::Owned(
                text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            ),
            Charset::Other(encoding) => Cow::Owned(encode_lossy(encoding, text)),
        }
    }
}

fn encode_lossy(encoding: &'static Encoding, text: &str) -> Vec<u8> {
    let mut encoder = encoding.new_encoder();
    let capacity = encoder
        .max_buffer_length_from_utf8_without_replacement(text.len())
        .unwrap_or(text.len() * 4);
    let mut output = Vec::with_capacity(capacity);
    let mut position = 0;

    loop {
        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(
            &text[position..],
            &mut output,
            true,
        );
        position += read;

        match result {
            EncoderResult::InputEmpty => return output,
            EncoderResult::OutputFull => output.reserve(text.len() - position + 16),
            EncoderResult::Unmappable(_) => output.push(REPLACEMENT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_names_ignore_case_and_dashes() {
        assert_eq!(Charset::from_name("utf-8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_name("UTF8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_name("ascii"), Some(Charset::Ascii));
        assert_eq!(Charset::from_name("US-ASCII"), Some(Charset::Ascii));
        assert_eq!(Charset::from_name("ISO_8859-1"), Some(Charset::Latin1));
        assert_eq!(Charset::from_name("utf-16le"), Some(Charset::Utf16Le));
    }

    #[test]
    fn test_encoding_rs_labels() {
        let charset = Charset::from_name("windows-1251").unwrap();
        assert_eq!(charset.name(), "windows-1251");
        assert_eq!(Charset::from_name("no-such-charset"), None);
    }

    #[traced_test]
    #[test]
    fn test_unknown_charset_falls_back_with_warning() {
        assert_eq!(Charset::resolve(Some("klingon")), Charset::Utf8);
        assert!(logs_contain("Invalid charset 'klingon'"));
    }

    #[test]
    fn test_unmappable_ascii_becomes_question_mark() {
        let bytes = Charset::Ascii.encode("Grüße, äpfel!");
        assert_eq!(&*bytes, b"Gr??e, ?pfel!");
    }

    #[test]
    fn test_latin1_keeps_umlauts() {
        let bytes = Charset::Latin1.encode("ä€");
        assert_eq!(&*bytes, &[0xE4, b'?']);
    }

    #[test]
    fn test_encoding_rs_substitution() {
        let charset = Charset::from_name("windows-1251").unwrap();
        let bytes = charset.encode("abc日");
        assert_eq!(&*bytes, b"abc?");
    }

    #[test]
    fn test_utf16_header_and_payload() {
        assert_eq!(Charset::Utf16.header(), [0xFE_u8, 0xFF].as_slice());
        assert!(Charset::Utf8.header().is_empty());
        assert_eq!(&*Charset::Utf16Le.encode("A"), &[0x41_u8, 0x00]);
        assert_eq!(&*Charset::Utf16.encode("A"), &[0x00_u8, 0x41]);
    }
}
