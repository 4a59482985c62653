//! Errors raised while building or looking up entries in a file list.

use std::path::PathBuf;

/// Failures produced while scanning the filesystem or maintaining a
/// [`crate::FileList`].
#[derive(Debug, thiserror::Error)]
pub enum FileListError {
    /// A directory or file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path being scanned when the failure occurred.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A peer or local index did not resolve to a live entry.
    #[error("file list index {0} does not resolve to a live entry")]
    UnknownIndex(u32),

    /// The index space invariant (dense within a segment, strictly
    /// increasing across segments) was violated.
    #[error("file list index invariant violated: {0}")]
    IndexInvariant(&'static str),

    /// A segment was reported finished out of order.
    #[error("segment {0} reported finished before an earlier unfinished segment")]
    OutOfOrderSegment(u32),

    /// A file-list-entry frame on the wire was structurally invalid.
    #[error("malformed file list entry: {0}")]
    Wire(&'static str),

    /// A name or symlink target was not valid UTF-8 where the wire format
    /// required text (owner/group names).
    #[error("file list entry name was not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Underlying transport failure while reading or writing entries.
    #[error("file list I/O error: {0}")]
    Transport(#[from] protocol::ProtocolError),
}

/// Convenience alias for file-list fallible operations.
pub type Result<T> = std::result::Result<T, FileListError>;
