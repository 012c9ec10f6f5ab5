//! Base64 helpers for binary payloads crossing the command push/poll RPCs.
//!
//! Every function here is total: absent input maps to empty output and
//! malformed input is decoded on a best-effort basis instead of failing.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use tracing::warn;

/// Standard alphabet that tolerates missing padding and stray trailing bits
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encode raw bytes. `None` and empty input both encode to `""`.
pub fn encode(data: Option<&[u8]>) -> String {
    match data {
        Some(bytes) if !bytes.is_empty() => STANDARD.encode(bytes),
        _ => String::new(),
    }
}

/// Decode base64 text into raw bytes. `None` and empty input decode to
/// an empty vector.
///
/// Malformed input goes through two fallbacks: characters outside the
/// alphabet are stripped and decoding is retried with lenient padding; if
/// that still fails, the input's own bytes are returned unchanged.
pub fn decode(data: Option<&str>) -> Vec<u8> {
    let text = match data {
        Some(text) if !text.is_empty() => text,
        _ => return Vec::new(),
    };

    if let Ok(bytes) = STANDARD.decode(text) {
        return bytes;
    }

    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();

    match LENIENT.decode(&cleaned) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Undecodable base64 payload ({}), passing it through raw", e);
            text.as_bytes().to_vec()
        }
    }
}

/// Encode a text string as base64
pub fn to_base64(text: Option<&str>) -> String {
    encode(text.map(str::as_bytes))
}

/// Decode base64 into text, replacing invalid UTF-8 sequences
pub fn from_base64(data: Option<&str>) -> String {
    String::from_utf8_lossy(&decode(data)).into_owned()
}
