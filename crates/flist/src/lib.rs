//! The segmented file list: entries, segments, and the wire format that
//! carries them between peers.
//!
//! # Overview
//! A [`FileList`] holds the set of files and directories a session is
//! transferring. It is built incrementally: the initial top-level scan
//! becomes one [`Segment`], and each stub directory discovered along the
//! way is expanded into a further segment later, as the generator decides
//! to recurse into it. Every entry still gets a single index out of one
//! global, monotonically increasing index space, regardless of which
//! segment produced it.
//!
//! # Design
//! Segments replace one big `Vec<FileEntry>` with a structure that can
//! both grow (new segments appended as directories expand) and shrink
//! from the middle (an individual entry is removed once it's been fully
//! processed) without invalidating every other entry's index. [`wire`]
//! is the on-the-wire counterpart: it encodes/decodes entries relative to
//! the previous one sent, using the same transmit-flag compaction the
//! protocol defines.
//!
//! # Errors
//! All fallible operations return [`error::FileListError`].

pub mod entry;
pub mod error;
pub mod list;
pub mod segment;
pub mod wire;

pub use entry::{FileEntry, FileKind, Principal, RawPath, MAX_ID};
pub use error::{FileListError, Result};
pub use list::FileList;
pub use segment::{Segment, SegmentBuilder};
pub use wire::{encode_done, encode_entry, encode_io_error_endlist, FlistEntryCodec, ListItem, TransmitFlags};
