//! Wire-level primitives for rsync protocol 30: the varint and index
//! codecs, the multiplex frame envelope and duplex channel, and connection
//! negotiation.
//!
//! This crate has no notion of files, transfers, or sessions — it only
//! knows how to turn bytes on a stream into the values and frames the
//! higher-level `engine` crate operates on, and back.

mod envelope;
mod error;
mod multiplex;
mod negotiation;
mod ndx;
mod varint;

pub use envelope::{Message, MessageCode, MessageHeader, HEADER_LEN, MAX_PAYLOAD_LEN, MPLEX_BASE};
pub use error::{ProtocolError, Result};
pub use multiplex::{FramedReader, FramedWriter};
pub use negotiation::{
    negotiate_version, read_banner, validate_compat_flags, ChecksumSeed, CompatFlags,
    ProtocolVersion, CHECKSUM_SEED_LEN, CURRENT_VERSION, MIN_MAJOR_VERSION,
};
pub use ndx::{is_sentinel, validate_eof, NdxCodec, DONE, EOF, OFFSET};
pub use varint::{decode_int, decode_int_from_slice, encode_int, encode_int_to_vec};
