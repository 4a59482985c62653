//! Signature layout derivation and generation.
//!
//! # Overview
//! Before a file is transferred, the receiving side computes a
//! [`ChecksumHeader`] describing how it chopped the local replica into
//! fixed-size blocks, then a rolling/strong checksum pair per block (see
//! [`generate`](generate::generate)). The sender uses that table to find
//! which parts of the source file already exist in the replica.
//!
//! # Errors
//! Wire (de)serialization returns [`error::SignatureError`]; block
//! generation surfaces the underlying [`std::io::Error`] directly since
//! it has no wire-framing concerns of its own.

pub mod error;
pub mod generate;
pub mod layout;
pub mod wire;

pub use error::{Result, SignatureError};
pub use generate::{generate, ChecksumChunk};
pub use layout::{block_length_for, digest_length_for, ChecksumHeader, MAX_DIGEST_LEN, MIN_BLOCK_LEN, MIN_DIGEST_LEN};
pub use wire::{decode_chunk, decode_header, decode_signature, encode_chunk, encode_header, encode_signature};
