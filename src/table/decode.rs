//! Text decoding for uploaded tables: UTF-8 first, then legacy Thai.

use crate::table::TableError;
use encoding_rs::Encoding;
use encoding_rs::UTF_8;
use std::borrow::Cow;

/// Byte order mark some spreadsheet tools prepend to UTF-8 exports
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Label of the legacy single-byte Thai encoding tried after UTF-8
const LEGACY_THAI_LABEL: &[u8] = b"tis-620";

/// Decodes table bytes, trying UTF-8 and then TIS-620.
///
/// Decoding is strict: a malformed sequence fails the attempt instead of
/// being replaced, so the fallback only kicks in on genuinely non-UTF-8 input.
///
/// # Returns
/// The decoded text and the encoding that accepted it
pub(crate) fn decode(bytes: &[u8]) -> Result<(Cow<'_, str>, &'static Encoding), TableError> {
    let unmarked = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(unmarked) {
        return Ok((text, UTF_8));
    }

    let legacy = Encoding::for_label(LEGACY_THAI_LABEL).ok_or(TableError::DecodingError)?;
    legacy
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| (text, legacy))
        .ok_or(TableError::DecodingError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_utf8() {
        let (text, encoding) = decode("ชื่อ,นามสกุล".as_bytes()).unwrap();
        assert_eq!(text, "ชื่อ,นามสกุล");
        assert_eq!(encoding, UTF_8);
    }

    #[test]
    fn decode_utf8_with_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"name");
        let (text, _) = decode(&bytes).unwrap();
        assert_eq!(text, "name");
    }

    #[test]
    fn decode_falls_back_to_tis620() {
        // "สมชาย" in TIS-620
        let bytes = [0xCA, 0xC1, 0xAA, 0xD2, 0xC2];
        let (text, encoding) = decode(&bytes).unwrap();
        assert_eq!(text, "สมชาย");
        assert_ne!(encoding, UTF_8);
    }

    #[test]
    fn decode_fails_when_neither_encoding_fits() {
        // 0xDB is invalid UTF-8 on its own and unassigned in TIS-620
        let result = decode(&[b'a', 0xDB, b'b']);
        assert!(matches!(result, Err(TableError::DecodingError)));
    }
}
