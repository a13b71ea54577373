//! Decoding of the conventional `Error(string)` revert payload.

use alloy::primitives::U256;

/// Selector of `Error(string)`, the payload produced by `revert("reason")`.
pub const REVERT_REASON_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Surfaced when a payload carries the revert selector but the trailing data
/// cannot be decoded as an ABI string.
pub const REVERT_DECODE_FAILED: &str = "EVM reverted. Failed to decode error message";

pub fn is_revert(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == REVERT_REASON_SELECTOR
}

/// Best-effort decode of the ABI-encoded string following the revert
/// selector. The length word is clamped to the available payload, so a
/// truncated or corrupted response reads to the end of the data rather than
/// out of bounds. Returns `None` when the payload is structurally unreadable.
pub fn decode_reason(data: &[u8]) -> Option<String> {
    if !is_revert(data) {
        return None;
    }
    let payload = &data[4..];
    let offset_word = payload.get(..32)?;
    let offset = U256::from_be_slice(offset_word);
    if offset > U256::from(payload.len()) {
        return None;
    }
    let offset = offset.to::<usize>();
    let length_word = payload.get(offset..offset + 32)?;
    let length = U256::from_be_slice(length_word);
    let body = payload.get(offset + 32..)?;
    let length = if length > U256::from(body.len()) { body.len() } else { length.to::<usize>() };
    Some(String::from_utf8_lossy(&body[..length]).into_owned())
}
