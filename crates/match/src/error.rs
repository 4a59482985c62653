//! Errors raised while running the delta matcher.

/// Failures produced while generating or writing a delta token stream.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    /// Failure reading the source file or writing the token stream.
    #[error("delta matcher I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for delta-matching fallible operations.
pub type Result<T> = std::result::Result<T, MatchingError>;
