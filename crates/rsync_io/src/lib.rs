//! Duplex transport plumbing: the in-memory pipe pair a local transfer
//! wires its generator/sender/receiver threads through, plus a
//! transport-agnostic trait so the same role code also runs over a real
//! socket.

pub mod duplex;
pub mod error;
pub mod transport;

pub use duplex::{duplex_pair, duplex_pair_with_capacity, DuplexEnd, DEFAULT_CAPACITY};
pub use error::{Result, RsyncIoError};
pub use transport::{BoxedTransport, Transport};
