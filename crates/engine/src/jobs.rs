//! The generator's job queue: functions executed in enqueue order,
//! batched and flushed once per drain.

use flist::FileEntry;

/// One unit of work for the generator thread.
pub enum GeneratorJob {
    /// Emit raw bytes on the output channel (used by roles sharing the
    /// generator's transport for out-of-band writes).
    SendBytes(Vec<u8>),
    /// Emit a text control message (INFO/WARNING/etc.) on the channel.
    SendMessage {
        code: protocol::MessageCode,
        text: String,
    },
    /// Remove `idx` from its segment (looked up if the segment id is
    /// unknown to the caller) and run `removeFinishedSegmentsAndAck`.
    PurgeFile { segment_hint: Option<u32>, idx: u32 },
    /// Run `generateSegment` over a newly finalized segment spanning
    /// `[base_index, base_index + len)`.
    GenerateSegment { base_index: u32, len: u32 },
    /// Run `generateFile` (client-side path, maximum digest length) for
    /// a single entry.
    GenerateFile { idx: u32, entry: FileEntry },
    /// Emit the DONE index on the wire for a segment the receiver has
    /// finished acknowledging.
    SendSegmentDone,
    /// Drain deferred attribute-update callbacks and terminate the loop.
    Stop,
}

impl std::fmt::Debug for GeneratorJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SendBytes(bytes) => f.debug_tuple("SendBytes").field(&bytes.len()).finish(),
            Self::SendMessage { code, text } => f.debug_struct("SendMessage").field("code", code).field("text", text).finish(),
            Self::PurgeFile { segment_hint, idx } => f
                .debug_struct("PurgeFile")
                .field("segment_hint", segment_hint)
                .field("idx", idx)
                .finish(),
            Self::GenerateSegment { base_index, len } => f
                .debug_struct("GenerateSegment")
                .field("base_index", base_index)
                .field("len", len)
                .finish(),
            Self::GenerateFile { idx, .. } => f.debug_struct("GenerateFile").field("idx", idx).finish(),
            Self::SendSegmentDone => write!(f, "SendSegmentDone"),
            Self::Stop => write!(f, "Stop"),
        }
    }
}
