//! Wire Codec
//!
//! Every channel carries one signed 16-bit value, little-endian, two bytes.
//! Producers clamp before encoding; see [`clamp`].

use crate::system::error::DecodeError;

/// Encoded size of a channel value
pub const PAYLOAD_LEN: usize = 2;

/// Encodes a channel value
pub const fn encode(value: i16) -> [u8; PAYLOAD_LEN] {
    value.to_le_bytes()
}

/// Decodes a channel value
///
/// Anything other than exactly two bytes is rejected. Callers treat an error as
/// "no new value" and must not derive a command from it.
pub fn decode(payload: &[u8]) -> Result<i16, DecodeError> {
    match payload {
        [] => Err(DecodeError::Empty),
        [lo, hi] => Ok(i16::from_le_bytes([*lo, *hi])),
        other => Err(DecodeError::Length(other.len())),
    }
}

/// Saturates a producer-side value into the range `[min, max]` and the int16 range.
pub fn clamp(value: f32, min: i16, max: i16) -> i16 {
    if value.is_nan() {
        return 0;
    }
    // `as` saturates on overflow, the clamp keeps the requested sub-range
    (value as i16).clamp(min, max)
}
