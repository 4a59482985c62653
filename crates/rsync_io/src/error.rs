//! Errors raised by the transport plumbing.

/// Failures produced while moving bytes across a duplex transport.
#[derive(Debug, thiserror::Error)]
pub enum RsyncIoError {
    /// Underlying I/O failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A protocol-level framing failure surfaced while reading/writing.
    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),
}

/// Convenience alias for transport fallible operations.
pub type Result<T> = std::result::Result<T, RsyncIoError>;
