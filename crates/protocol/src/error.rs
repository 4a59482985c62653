//! Error taxonomy for wire-level protocol operations.

use std::io;

/// Failures that can occur while encoding, decoding, or framing protocol
/// bytes.
///
/// This is deliberately narrower than the transfer engine's session-level
/// error type: it only ever reports malformed wire data or the underlying
/// I/O failure that produced it. Per-file recoverable conditions live in
/// `engine`, not here.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The byte stream ended before a complete frame, header, or value
    /// could be read.
    #[error("unexpected end of stream while reading {context}")]
    UnexpectedEof {
        /// What was being read when the stream ended.
        context: &'static str,
    },

    /// A multiplex header carried a tag outside the valid code range.
    #[error("invalid multiplex tag byte {0:#04x}")]
    InvalidTag(u8),

    /// A multiplex header named a code with no defined meaning.
    #[error("unknown multiplexed message code {0:#04x}")]
    UnknownMessageCode(u8),

    /// A frame's declared payload length exceeded the channel's hard cap.
    #[error("frame length {len} exceeds the maximum allowed frame size {max}")]
    FrameTooLarge {
        /// The length the frame declared.
        len: u32,
        /// The configured maximum.
        max: u32,
    },

    /// An index codec sentinel appeared somewhere it cannot legally occur
    /// (for example EOF outside incremental-recurse mode).
    #[error("invalid index sentinel encountered: {0}")]
    InvalidIndex(&'static str),

    /// The version banner did not match the expected `@RSYNCD: MAJOR.MINOR`
    /// pattern, or advertised a version below the minimum this crate
    /// supports.
    #[error("invalid or unsupported protocol banner: {0}")]
    InvalidBanner(String),

    /// The peer's compatibility flags omitted a flag this implementation
    /// requires.
    #[error("peer compatibility flags missing required bit: {0}")]
    IncompatiblePeer(&'static str),

    /// Underlying transport failure.
    #[error("channel I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias for protocol-level fallible operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
