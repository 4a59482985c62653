//! Index codec for file-list references on the duplex stream.
//!
//! Distinct from the general [`crate::varint`] codec: indices are mostly
//! small, strictly increasing, and occasionally carry one of a handful of
//! negative sentinels, so this codec diff-encodes against the previous
//! positive index sent and reserves whole marker bytes for everything
//! else.

use crate::error::{ProtocolError, Result};
use std::io::Read;

/// Marks the end of one role's index stream.
pub const DONE: i32 = -1;
/// Marks the end of an incrementally-recursed file list.
pub const EOF: i32 = -2;
/// Base from which stub-directory indices are transmitted:
/// `OFFSET - directory_index`.
pub const OFFSET: i32 = -101;

const SHORT_DIFF_MAX: u8 = 0xFD;
const MARKER_SHORT_DIFF: u8 = 0xFE;
const MARKER_ABSOLUTE: u8 = 0xFF;

/// Running state needed to diff-encode/decode a stream of indices.
///
/// Sender and receiver each keep one `NdxCodec` per direction; it is not
/// `Send`-shared, matching the single-writer-per-role discipline of the
/// channel it rides on.
#[derive(Debug, Default, Clone, Copy)]
pub struct NdxCodec {
    prev_positive: i32,
}

impl NdxCodec {
    /// Creates a codec with no prior positive index (equivalent to the
    /// start of a fresh stream).
    pub fn new() -> Self {
        Self { prev_positive: -1 }
    }

    /// Encodes one index value.
    pub fn encode(&mut self, value: i32) -> Vec<u8> {
        if value == DONE {
            return vec![0];
        }

        if value >= 0 {
            let diff = value.wrapping_sub(self.prev_positive);
            if diff > 0 && diff <= i32::from(SHORT_DIFF_MAX) {
                self.prev_positive = value;
                return vec![diff as u8];
            }
            if diff > 0 && diff <= 0x7FFF {
                self.prev_positive = value;
                let mut out = vec![MARKER_SHORT_DIFF];
                out.extend_from_slice(&(diff as u16).to_le_bytes());
                return out;
            }
            self.prev_positive = value;
        }

        let mut out = vec![MARKER_ABSOLUTE];
        out.extend_from_slice(&value.to_le_bytes());
        out
    }

    /// Decodes one index value from `reader`.
    pub fn decode<R: Read>(&mut self, reader: &mut R) -> Result<i32> {
        let mut marker = [0u8; 1];
        read_exact(reader, &mut marker, "ndx marker byte")?;

        match marker[0] {
            0 => Ok(DONE),
            b @ 1..=SHORT_DIFF_MAX => {
                let value = self.prev_positive.wrapping_add(i32::from(b));
                self.prev_positive = value;
                Ok(value)
            }
            MARKER_SHORT_DIFF => {
                let mut diff = [0u8; 2];
                read_exact(reader, &mut diff, "ndx short-diff payload")?;
                let value = self
                    .prev_positive
                    .wrapping_add(i32::from(u16::from_le_bytes(diff)));
                self.prev_positive = value;
                Ok(value)
            }
            MARKER_ABSOLUTE => {
                let mut raw = [0u8; 4];
                read_exact(reader, &mut raw, "ndx absolute payload")?;
                let value = i32::from_le_bytes(raw);
                if value >= 0 {
                    self.prev_positive = value;
                }
                Ok(value)
            }
        }
    }
}

/// Returns `true` if `value` is one of the reserved sentinel values rather
/// than a real file-list index.
pub fn is_sentinel(value: i32) -> bool {
    value == DONE || value == EOF || value <= OFFSET
}

/// Validates that an `EOF` sentinel is legal in the current mode; returns
/// a protocol error otherwise, per the wire rule that `EOF` only appears
/// under incremental recursion.
pub fn validate_eof(value: i32, incremental_recurse: bool) -> Result<()> {
    if value == EOF && !incremental_recurse {
        return Err(ProtocolError::InvalidIndex(
            "EOF index received outside incremental-recurse mode",
        ));
    }
    Ok(())
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], context: &'static str) -> Result<()> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => ProtocolError::UnexpectedEof { context },
        _ => ProtocolError::Io(err),
    })
}
