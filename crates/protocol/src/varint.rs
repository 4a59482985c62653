//! Variable-length signed-integer codec.
//!
//! Values are written little-endian, high zero bytes above a configurable
//! `min_bytes` floor are stripped, and a leading marker byte records how
//! many bytes beyond that floor survived:
//!
//! - If the floor already suffices (`extra == 0`) and the final byte's top
//!   bit is clear, the marker byte *is* that final byte — no extra byte
//!   is spent at all.
//! - Otherwise the marker's high bits form a unary count of `extra` (one
//!   run of set bits of length `extra + 1`, e.g. `0x80` for `extra == 0`
//!   needing a discriminator, `0xC0` for `extra == 1`, ... `0xFE` for
//!   `extra == 6`), followed by `min_bytes + extra` raw payload bytes.
//! - `0xFF` is reserved as a full escape: the following 8 bytes are the
//!   exact little-endian `i64`. This is the only path negative values
//!   take, since sign extension means they never have a high zero byte to
//!   strip.
//!
//! `min_bytes` lets the same scheme serve both the common case (file
//! sizes, mtimes, where 3-4 bytes usually suffice) and callers that want a
//! fixed floor for wire-compatibility with a particular field.

use crate::error::{ProtocolError, Result};
use std::io::Read;

const ESCAPE: u8 = 0xFF;
const PLAIN_LIMIT: u8 = 0x80;

/// Encodes `value` using `min_bytes` as the minimum payload width.
///
/// `min_bytes` must be in `1..=8`; values outside that range are clamped.
pub fn encode_int(value: i64, min_bytes: u8) -> Vec<u8> {
    let min_bytes = min_bytes.clamp(1, 8) as usize;
    let bytes = value.to_le_bytes();

    let mut cnt = 8usize;
    while cnt > min_bytes && bytes[cnt - 1] == 0 {
        cnt -= 1;
    }
    let extra = cnt - min_bytes;

    if extra == 0 && bytes[cnt - 1] < PLAIN_LIMIT {
        let mut out = Vec::with_capacity(cnt);
        out.push(bytes[cnt - 1]);
        out.extend_from_slice(&bytes[..cnt - 1]);
        return out;
    }

    if extra <= 6 {
        let marker = !((1u8 << (7 - extra)) - 1);
        let mut out = Vec::with_capacity(cnt + 1);
        out.push(marker);
        out.extend_from_slice(&bytes[..cnt]);
        return out;
    }

    let mut out = Vec::with_capacity(9);
    out.push(ESCAPE);
    out.extend_from_slice(&bytes);
    out
}

/// Encodes `value` directly into `out`, per [`encode_int`].
pub fn encode_int_to_vec(value: i64, min_bytes: u8, out: &mut Vec<u8>) {
    out.extend_from_slice(&encode_int(value, min_bytes));
}

/// Decodes one value from `reader`, per [`encode_int`].
pub fn decode_int<R: Read>(reader: &mut R, min_bytes: u8) -> Result<i64> {
    let min_bytes = min_bytes.clamp(1, 8) as usize;

    let mut marker = [0u8; 1];
    read_exact(reader, &mut marker, "varint marker byte")?;
    let marker = marker[0];

    let mut bytes = [0u8; 8];

    if marker < PLAIN_LIMIT {
        bytes[min_bytes - 1] = marker;
        if min_bytes > 1 {
            read_exact(reader, &mut bytes[..min_bytes - 1], "varint payload")?;
        }
        return Ok(i64::from_le_bytes(bytes));
    }

    if marker == ESCAPE {
        read_exact(reader, &mut bytes, "varint escape payload")?;
        return Ok(i64::from_le_bytes(bytes));
    }

    let extra = marker.leading_ones() as usize - 1;
    let cnt = min_bytes + extra;
    read_exact(reader, &mut bytes[..cnt], "varint payload")?;
    Ok(i64::from_le_bytes(bytes))
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], context: &'static str) -> Result<()> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => ProtocolError::UnexpectedEof { context },
        _ => ProtocolError::Io(err),
    })
}

/// Decodes a value from a byte slice, returning the value and the unread
/// remainder. Convenience wrapper over [`decode_int`] for callers that
/// already have the bytes in memory.
pub fn decode_int_from_slice(bytes: &[u8], min_bytes: u8) -> Result<(i64, &[u8])> {
    let mut cursor = std::io::Cursor::new(bytes);
    let value = decode_int(&mut cursor, min_bytes)?;
    let pos = cursor.position() as usize;
    Ok((value, &bytes[pos..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: i64, min_bytes: u8) {
        let encoded = encode_int(value, min_bytes);
        let (decoded, rest) = decode_int_from_slice(&encoded, min_bytes).unwrap();
        assert_eq!(decoded, value, "min_bytes={min_bytes} encoded={encoded:?}");
        assert!(rest.is_empty());
    }

    #[test]
    fn round_trips_small_positive_values_at_every_min_bytes() {
        for min_bytes in 1..=8u8 {
            for value in [0i64, 1, 63, 127, 128, 255, 256, 1000, 65535] {
                round_trip(value, min_bytes);
            }
        }
    }

    #[test]
    fn round_trips_large_values() {
        for min_bytes in 1..=8u8 {
            for value in [
                i64::MAX,
                i64::MAX / 2,
                1 << 40,
                (1 << 53) + 7,
                u32::MAX as i64,
            ] {
                round_trip(value, min_bytes);
            }
        }
    }

    #[test]
    fn round_trips_negative_values_via_escape() {
        for min_bytes in 1..=8u8 {
            for value in [-1i64, -2, -101, i64::MIN, -(1 << 40)] {
                round_trip(value, min_bytes);
            }
        }
    }

    #[test]
    fn min_byte_floor_is_respected() {
        let encoded = encode_int(0, 4);
        assert_eq!(encoded.len(), 4);
    }

    #[test]
    fn truncated_input_is_unexpected_eof() {
        let encoded = encode_int(100_000, 1);
        let truncated = &encoded[..encoded.len() - 1];
        let err = decode_int_from_slice(truncated, 1).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedEof { .. }));
    }

    #[test]
    fn known_small_value_encodes_to_single_byte() {
        assert_eq!(encode_int(5, 1), vec![5]);
        assert_eq!(encode_int(127, 1), vec![127]);
    }

    #[test]
    fn value_requiring_discriminator_still_round_trips() {
        // 200 doesn't fit the plain fast path (>= 0x80) but needs no extra
        // bytes beyond the floor.
        round_trip(200, 1);
        let encoded = encode_int(200, 1);
        assert_eq!(encoded.len(), 2);
    }
}
