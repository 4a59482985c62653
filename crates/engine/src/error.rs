//! The session-level error type composing every crate's own error enum.

use std::path::PathBuf;

/// Bitmask of local I/O failure categories accumulated over a session,
/// reported inline as `IO_ERROR` messages and folded into the final
/// statistics frame.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IoErrorMask(u8);

impl IoErrorMask {
    pub const TRANSFER: Self = Self(1 << 0);
    pub const VANISHED: Self = Self(1 << 1);
    pub const GENERAL: Self = Self(1 << 2);
    pub const DEL_LIMIT: Self = Self(1 << 3);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn set(&mut self, bit: Self) {
        self.0 |= bit.0;
    }

    #[must_use]
    pub const fn contains(self, bit: Self) -> bool {
        self.0 & bit.0 == bit.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

/// Errors fatal to a session: protocol violations and channel failures
/// unwind all three roles. Per-file failures do not appear here; they
/// accumulate in an [`IoErrorMask`] instead and never stop the session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),

    #[error(transparent)]
    FileList(#[from] flist::FileListError),

    #[error(transparent)]
    Signature(#[from] signature::SignatureError),

    #[error(transparent)]
    Matching(#[from] matching::MatchingError),

    #[error(transparent)]
    Metadata(#[from] metadata::MetadataError),

    #[error(transparent)]
    Transport(#[from] rsync_io::RsyncIoError),

    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("generator index {0} does not resolve to a live entry")]
    UnknownIndex(u32),

    #[error("security violation: {path} escapes the destination root")]
    PathEscape { path: PathBuf },

    #[error("cannot resolve destination: {0}")]
    PathResolution(&'static str),

    #[error("generator job queue disconnected")]
    QueueClosed,
}

/// Convenience alias for session fallible operations.
pub type Result<T> = std::result::Result<T, EngineError>;
