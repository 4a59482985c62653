//! The delta-matching algorithm: given a file and a peer's checksum
//! table, produces a token stream of literal bytes and matched-block
//! references.
//!
//! # Overview
//! [`delta::generate_delta`] slides a `block_length`-sized window across
//! the source file, looking for rolling-checksum collisions against the
//! peer's table and confirming them with a strong checksum before
//! emitting a match token. Everything that doesn't match is emitted as
//! literal runs via [`token`]'s chunked framing.
//!
//! # Errors
//! All fallible operations return [`error::MatchingError`].

pub mod delta;
pub mod error;
pub mod token;

pub use delta::{generate_delta, skip_match_send_data};
pub use error::{MatchingError, Result};
pub use token::{read_token, write_literal, write_token, Token, MAX_LITERAL_CHUNK};
