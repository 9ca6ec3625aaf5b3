//! Hex payloads typed by the user and characteristic values shown back.

use crate::error::{BrowserError, Result};

/// Converts a user-entered hex string into the bytes handed to a write.
///
/// Two hex characters per byte, case-insensitive, surrounding whitespace
/// ignored. Empty input is rejected before conversion.
pub fn parse_hex_payload(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(BrowserError::EmptyPayload);
    }
    Ok(hex::decode(trimmed)?)
}

/// Formats a characteristic value as `0x`-prefixed lowercase hex.
pub fn format_value(value: &[u8]) -> String {
    format!("0x{}", hex::encode(value))
}
