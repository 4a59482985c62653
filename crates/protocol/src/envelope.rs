//! Multiplex message codes and the 32-bit frame header that tags them.

use crate::error::ProtocolError;

/// Offset added to a message code before it is shifted into the header's
/// top byte. Matches rsync's `MPLEX_BASE`.
pub const MPLEX_BASE: u8 = 7;

/// Byte length of an encoded [`MessageHeader`].
pub const HEADER_LEN: usize = 4;

/// Largest payload length a single frame may declare (24 bits).
pub const MAX_PAYLOAD_LEN: u32 = (1 << 24) - 1;

/// The multiplexed message codes carried inline with data frames.
///
/// `Data` (code 0) is not itself a control message — frames tagged with it
/// are handed straight to the data reader. The remaining codes interleave
/// control information: human-readable text for `Info`/`Error`/`Warning`/
/// `ErrorXfer`/`Log`, a little-endian `i32` error code for `IoError`, and a
/// little-endian `i32` file-list index for `NoSend`/`Deleted`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum MessageCode {
    /// Ordinary data payload, not a control message.
    Data = 0,
    /// Informational text, shown to the user.
    Info = 1,
    /// Fatal or per-file error text.
    Error = 2,
    /// Non-fatal warning text.
    Warning = 3,
    /// Per-file transfer error text (recoverable).
    ErrorXfer = 4,
    /// Structured log line.
    Log = 5,
    /// Per-file I/O error code (little-endian `i32`).
    IoError = 6,
    /// Peer could not send this file index (little-endian `i32`).
    NoSend = 7,
    /// A source file was removed (little-endian `i32` index).
    Deleted = 8,
}

impl MessageCode {
    /// All known codes, ascending by wire value.
    pub const fn all() -> &'static [MessageCode] {
        &[
            MessageCode::Data,
            MessageCode::Info,
            MessageCode::Error,
            MessageCode::Warning,
            MessageCode::ErrorXfer,
            MessageCode::Log,
            MessageCode::IoError,
            MessageCode::NoSend,
            MessageCode::Deleted,
        ]
    }

    /// The wire value of this code.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// The stable name used in diagnostics (`MSG_*`).
    pub const fn name(self) -> &'static str {
        match self {
            MessageCode::Data => "MSG_DATA",
            MessageCode::Info => "MSG_INFO",
            MessageCode::Error => "MSG_ERROR",
            MessageCode::Warning => "MSG_WARNING",
            MessageCode::ErrorXfer => "MSG_ERROR_XFER",
            MessageCode::Log => "MSG_LOG",
            MessageCode::IoError => "MSG_IO_ERROR",
            MessageCode::NoSend => "MSG_NO_SEND",
            MessageCode::Deleted => "MSG_DELETED",
        }
    }

    /// Recovers a code from its wire value, or `None` if unknown.
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(MessageCode::Data),
            1 => Some(MessageCode::Info),
            2 => Some(MessageCode::Error),
            3 => Some(MessageCode::Warning),
            4 => Some(MessageCode::ErrorXfer),
            5 => Some(MessageCode::Log),
            6 => Some(MessageCode::IoError),
            7 => Some(MessageCode::NoSend),
            8 => Some(MessageCode::Deleted),
            _ => None,
        }
    }

    /// Returns `true` for codes whose payload is human-readable text.
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            MessageCode::Info
                | MessageCode::Error
                | MessageCode::Warning
                | MessageCode::ErrorXfer
                | MessageCode::Log
        )
    }
}

impl TryFrom<u8> for MessageCode {
    type Error = ProtocolError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        MessageCode::from_u8(raw).ok_or(ProtocolError::UnknownMessageCode(raw))
    }
}

impl From<MessageCode> for u8 {
    fn from(code: MessageCode) -> Self {
        code.as_u8()
    }
}

/// A decoded 32-bit frame header: `(MPLEX_BASE + code) << 24 | length`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageHeader {
    code: MessageCode,
    payload_len: u32,
}

impl MessageHeader {
    /// Builds a header, rejecting payload lengths that don't fit in 24
    /// bits.
    pub const fn new(code: MessageCode, payload_len: u32) -> Result<Self, ProtocolError> {
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::FrameTooLarge {
                len: payload_len,
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(Self { code, payload_len })
    }

    /// The message code this header carries.
    pub const fn code(self) -> MessageCode {
        self.code
    }

    /// The declared payload length.
    pub const fn payload_len(self) -> u32 {
        self.payload_len
    }

    /// Encodes the header as its raw `u32` tag.
    pub const fn encode_raw(self) -> u32 {
        ((MPLEX_BASE as u32 + self.code.as_u8() as u32) << 24) | self.payload_len
    }

    /// Encodes the header as little-endian wire bytes.
    pub fn encode(self) -> [u8; HEADER_LEN] {
        self.encode_raw().to_le_bytes()
    }

    /// Writes the header into `buffer`, which must be at least
    /// [`HEADER_LEN`] bytes long.
    pub fn encode_into_slice(self, buffer: &mut [u8]) -> Result<(), ProtocolError> {
        if buffer.len() < HEADER_LEN {
            return Err(ProtocolError::UnexpectedEof {
                context: "message header buffer",
            });
        }
        buffer[..HEADER_LEN].copy_from_slice(&self.encode());
        Ok(())
    }

    /// Reconstructs a header from its raw `u32` tag.
    pub fn from_raw(raw: u32) -> Result<Self, ProtocolError> {
        let tag = (raw >> 24) as u8;
        if tag < MPLEX_BASE {
            return Err(ProtocolError::InvalidTag(tag));
        }
        let code_byte = tag - MPLEX_BASE;
        let code = MessageCode::from_u8(code_byte)
            .ok_or(ProtocolError::UnknownMessageCode(code_byte))?;
        let payload_len = raw & MAX_PAYLOAD_LEN;
        Ok(Self { code, payload_len })
    }

    /// Decodes a header from little-endian wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::UnexpectedEof {
                context: "message header",
            });
        }
        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&bytes[..HEADER_LEN]);
        Self::from_raw(u32::from_le_bytes(raw))
    }
}

impl TryFrom<[u8; HEADER_LEN]> for MessageHeader {
    type Error = ProtocolError;

    fn try_from(bytes: [u8; HEADER_LEN]) -> Result<Self, Self::Error> {
        Self::from_raw(u32::from_le_bytes(bytes))
    }
}

impl TryFrom<&[u8; HEADER_LEN]> for MessageHeader {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8; HEADER_LEN]) -> Result<Self, Self::Error> {
        Self::from_raw(u32::from_le_bytes(*bytes))
    }
}

/// A fully decoded multiplexed control message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    code: MessageCode,
    payload: Vec<u8>,
}

impl Message {
    /// Builds a message, rejecting oversized payloads.
    pub fn new(code: MessageCode, payload: Vec<u8>) -> Result<Self, ProtocolError> {
        MessageHeader::new(code, payload.len() as u32)?;
        Ok(Self { code, payload })
    }

    /// The code this message was tagged with.
    pub fn code(&self) -> MessageCode {
        self.code
    }

    /// The raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decodes the payload as UTF-8 text, for the codes where that's
    /// expected.
    pub fn as_text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload)
    }

    /// Decodes the payload as a little-endian `i32`, for `IoError` and
    /// `NoSend`/`Deleted`.
    pub fn as_i32(&self) -> Option<i32> {
        let bytes: [u8; 4] = self.payload.as_slice().try_into().ok()?;
        Some(i32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn message_codes_are_hashable_and_distinct() {
        let mut set = HashSet::new();
        for &code in MessageCode::all() {
            assert!(set.insert(code));
        }
    }

    #[test]
    fn message_code_round_trips_through_try_from() {
        for &code in MessageCode::all() {
            let raw = code.as_u8();
            assert_eq!(MessageCode::try_from(raw).unwrap(), code);
            let converted: u8 = code.into();
            assert_eq!(converted, raw);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(MessageCode::from_u8(11).is_none());
        assert!(MessageCode::try_from(0xFFu8).is_err());
    }

    #[test]
    fn header_round_trips() {
        let header = MessageHeader::new(MessageCode::Info, 123).unwrap();
        let encoded = header.encode();
        assert_eq!(MessageHeader::decode(&encoded).unwrap(), header);
        assert_eq!(MessageHeader::try_from(encoded).unwrap(), header);
    }

    #[test]
    fn header_rejects_oversized_payload() {
        let err = MessageHeader::new(MessageCode::Data, MAX_PAYLOAD_LEN + 1).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[test]
    fn header_from_raw_rejects_tag_below_base() {
        let err = MessageHeader::from_raw(0x0000_0001).unwrap_err();
        assert_eq!(err.to_string(), ProtocolError::InvalidTag(0).to_string());
    }

    #[test]
    fn header_encode_raw_matches_encode() {
        let header = MessageHeader::new(MessageCode::Deleted, 7).unwrap();
        assert_eq!(header.encode(), header.encode_raw().to_le_bytes());
    }

    #[test]
    fn message_exposes_i32_payload_for_io_error() {
        let msg = Message::new(MessageCode::IoError, 42i32.to_le_bytes().to_vec()).unwrap();
        assert_eq!(msg.as_i32(), Some(42));
    }

    #[test]
    fn message_exposes_text_payload_for_info() {
        let msg = Message::new(MessageCode::Info, b"hello".to_vec()).unwrap();
        assert_eq!(msg.as_text().unwrap(), "hello");
    }
}
