//! A transport-agnostic boundary so the generator/sender/receiver code
//! doesn't care whether it's talking over a [`crate::duplex::DuplexEnd`],
//! a TCP stream, or a test harness's in-memory buffer.

use std::io::{Read, Write};

/// Anything a role can read from and write to as its half of the
/// connection. Blanket-implemented for any `Read + Write + Send`, so a
/// `TcpStream`, a `DuplexEnd`, or a `Cursor<Vec<u8>>` all qualify as-is.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// A transport behind a single owned trait object, for call sites that
/// need to pick between transport kinds at runtime (e.g. CLI startup
/// choosing between a local pipe pair and a remote-shell socket).
pub type BoxedTransport = Box<dyn Transport>;
