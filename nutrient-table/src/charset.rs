//! Charset detection and transcoding for reference tables.
//!
//! Public food-composition exports are frequently EUC-KR rather than UTF-8.
//! Tables are decoded to UTF-8 with encoding_rs before CSV parsing.

use encoding_rs::Encoding;

use crate::error::TableError;

/// Decode raw table bytes to a UTF-8 string.
///
/// Detection priority:
/// 1. Explicit encoding label (e.g. "euc-kr", "utf-8", "windows-949")
/// 2. UTF-8 byte order mark
/// 3. Direct UTF-8 if bytes are valid UTF-8
/// 4. EUC-KR (windows-949 superset), replacing undecodable bytes
pub fn decode_table_bytes(bytes: &[u8], label: Option<&str>) -> Result<String, TableError> {
    if let Some(label) = label {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| TableError::UnknownEncoding(label.to_string()))?;
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            tracing::warn!(encoding = encoding.name(), "table contained undecodable bytes");
        }
        return Ok(decoded.into_owned());
    }

    // decode() sniffs and strips a BOM
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        let (decoded, _, _) = encoding_rs::UTF_8.decode(bytes);
        return Ok(decoded.into_owned());
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            tracing::debug!("table is not UTF-8 ({}), decoding as EUC-KR", e);
            let (decoded, _, had_errors) = encoding_rs::EUC_KR.decode(bytes);
            if had_errors {
                tracing::warn!("table contained bytes that are neither UTF-8 nor EUC-KR");
            }
            Ok(decoded.into_owned())
        }
    }
}
