//! The three-role transfer engine: sender, generator, and receiver, and
//! the session driver that couples them over a duplex channel.
//!
//! # Overview
//! [`generator`], [`sender`], and [`receiver`] each implement one role's
//! share of the protocol as free functions operating on a shared
//! [`flist::FileList`] and a framed channel: `send_file_metadata`,
//! `send_matches_and_data`, `receive_and_match`, and so on. [`session`]
//! wires those pieces together into a runnable local transfer: one
//! thread plays the sender role against a source tree, another plays
//! the combined generator+receiver role against a destination tree (the
//! generator and receiver share one file list and one ownership index,
//! never stepping on each other's entries), and the two communicate
//! over a [`rsync_io::DuplexEnd`] pair exactly as two processes would
//! over a socket.
//!
//! # Errors
//! Fallible operations return [`error::EngineError`], a session-fatal
//! error type; per-file failures are folded into an
//! [`error::IoErrorMask`] instead of propagating.

pub mod error;
pub mod generator;
pub mod itemize;
pub mod jobs;
pub mod options;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod state;

pub use error::{EngineError, IoErrorMask, Result};
pub use itemize::ItemFlags;
pub use jobs::GeneratorJob;
pub use options::{FileSelection, SessionOptions};
pub use receiver::TransferStats;
pub use session::{run_local_transfer, LocalSession};
pub use state::ConnectionState;
