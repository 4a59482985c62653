//! Errors raised while deriving or decoding signature layouts.

/// Failures produced by signature layout derivation or wire decoding.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// A checksum header carried fields inconsistent with its own
    /// invariants (e.g. a nonzero block length for a zero-length file).
    #[error("checksum header invariant violated: {0}")]
    InvalidHeader(&'static str),

    /// Underlying transport failure while reading or writing a header or
    /// checksum pair.
    #[error("signature I/O error: {0}")]
    Transport(#[from] protocol::ProtocolError),
}

/// Convenience alias for signature fallible operations.
pub type Result<T> = std::result::Result<T, SignatureError>;
