//! Errors raised while reading or applying local filesystem attributes.

use std::path::PathBuf;

/// Failures produced while stat-ing a path or applying attributes to it.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// `stat`/`lstat` failed.
    #[error("failed to read attributes of {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `chmod`, `utimensat`, or `chown` failed while applying attributes.
    #[error("failed to apply attributes to {path}: {source}")]
    Apply {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a symlink's target failed.
    #[error("failed to read symlink target of {path}: {source}")]
    ReadLink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A raw device number did not survive the major/minor round trip.
    #[error("device number out of range for {path}")]
    DeviceRange { path: PathBuf },
}

/// Convenience alias for local-attribute fallible operations.
pub type Result<T> = std::result::Result<T, MetadataError>;
