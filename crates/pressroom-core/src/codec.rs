//! Text <-> base64 transcoding for the contents API.
//!
//! The remote only transports base64. Text is carried as its UTF-8 byte
//! sequence, so every code point (accents, emoji, combining marks) survives
//! the trip unchanged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::SyncError;

/// Encode Unicode text as padded standard base64 over its UTF-8 bytes.
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode base64 produced by `encode` or by the remote.
///
/// The remote wraps its payloads every 60 characters, so ASCII whitespace
/// is dropped before decoding.
pub fn decode(encoded: &str) -> Result<String, SyncError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SyncError::Parse(format!("invalid base64 content: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| SyncError::Parse(format!("content is not valid UTF-8: {}", e)))
}
