//! The sender role: walks the local source tree, emits the file list, and
//! answers the peer's checksum requests with delta-encoded file bodies.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use checksums::Md5Seed;
use flist::{FileEntry, FileList, Principal, RawPath};
use protocol::{FramedWriter, Message, MessageCode, NdxCodec};
use signature::{ChecksumChunk, ChecksumHeader};

use crate::error::{EngineError, Result};
use crate::options::{FileSelection, SessionOptions};

/// Scans one directory level (non-recursive), producing a `FileEntry` for
/// every child. `anchor` is the directory relative paths are computed
/// against — the argument a caller passed on the command line, per the
/// usual rsync trailing-slash convention.
pub fn scan_directory_level(dir: &Path, anchor: &Path) -> Result<Vec<FileEntry>> {
    let mut out = Vec::new();
    let walker = jwalk::WalkDir::new(dir).max_depth(1).sort(true);
    for entry in walker {
        let entry = entry.map_err(|err| EngineError::Io(std::io::Error::other(err)))?;
        let path = entry.path();
        if path == dir {
            continue;
        }
        out.push(entry_for_path(&path, anchor)?);
    }
    Ok(out)
}

/// Builds a single `FileEntry` for `path`, stat'd fresh from the local
/// filesystem and named relative to `anchor`.
///
/// The entry's wire `name` is the full transfer-relative path, not just
/// the basename: the wire codec's shared-prefix compaction
/// (`wire::encode_entry`) and the receiver's destination-path resolution
/// both operate on `name`, so a basename here would both defeat the
/// compaction and make the receiver write every file flat into the
/// destination root regardless of its source subdirectory.
pub fn entry_for_path(path: &Path, anchor: &Path) -> Result<FileEntry> {
    let attrs = metadata::read_local_attrs(path).map_err(EngineError::Metadata)?;
    let relative = path.strip_prefix(anchor).unwrap_or(path);
    let name = RawPath::from(relative);

    Ok(FileEntry::new(
        name.clone(),
        name,
        attrs.kind,
        attrs.mode,
        attrs.size,
        attrs.mtime,
        Principal::new(attrs.uid, None)?,
        Principal::new(attrs.gid, None)?,
    )?)
}

/// Implements the "initial expand" step: scans `roots` (non-recursively
/// under [`FileSelection::NonRecursive`], or the whole tree otherwise) and
/// finalizes the first segment of `list`. Returns the wire-encoded entries
/// followed by the DONE terminator, ready to hand to a [`FramedWriter`].
pub fn build_initial_segment(roots: &[PathBuf], anchor: &Path, options: &SessionOptions, list: &mut FileList) -> Result<Vec<u8>> {
    let mut builder = list.begin_segment(-1, None);
    let mut codec = flist::FlistEntryCodec::new();
    let mut wire = Vec::new();

    for root in roots {
        let entry = entry_for_path(root, anchor)?;
        let is_dir = entry.is_directory();
        if builder.push(entry.clone()) {
            wire.extend_from_slice(&codec.encode(&entry, true));
        }

        if is_dir {
            match options.file_selection {
                FileSelection::NonRecursive => {}
                FileSelection::Recursive => append_subtree(root, anchor, &mut builder, &mut codec, &mut wire)?,
                FileSelection::IncrementalRecursive => {
                    // Stub marking happens once the segment is finalized and
                    // assigned its global index; deferred to the caller.
                }
            }
        }
    }

    wire.extend_from_slice(&flist::encode_done());
    let base = list.finalize_segment(builder);

    if matches!(options.file_selection, FileSelection::IncrementalRecursive) {
        let stubs: Vec<u32> = list
            .segment_containing(base)
            .map(|segment| segment.iter().filter(|(_, e)| e.is_directory()).map(|(idx, _)| idx).collect())
            .unwrap_or_default();
        for idx in stubs {
            list.mark_stub(idx);
        }
    }

    Ok(wire)
}

/// Recursively appends every descendant of `dir` to `builder`, depth
/// first, matching the flat ordering a single upfront `--recursive` scan
/// produces.
fn append_subtree(
    dir: &Path,
    anchor: &Path,
    builder: &mut flist::SegmentBuilder,
    codec: &mut flist::FlistEntryCodec,
    wire: &mut Vec<u8>,
) -> Result<()> {
    let walker = jwalk::WalkDir::new(dir).sort(true).min_depth(1);
    for entry in walker {
        let entry = entry.map_err(|err| EngineError::Io(std::io::Error::other(err)))?;
        let fe = entry_for_path(&entry.path(), anchor)?;
        if builder.push(fe.clone()) {
            wire.extend_from_slice(&codec.encode(&fe, false));
        }
    }
    Ok(())
}

/// Expands a single stub directory (incremental recursion), mirroring
/// [`build_initial_segment`] for one directory rather than the initial
/// root set.
pub fn build_stub_segment(dir_idx: u32, dir_entry: &FileEntry, anchor: &Path, list: &mut FileList) -> Result<Vec<u8>> {
    let dir_path = anchor.join(dir_entry.relative_path().as_path());
    let mut builder = list.begin_segment(dir_idx as i32, Some(dir_idx));
    let mut codec = flist::FlistEntryCodec::new();
    let mut wire = Vec::new();

    for child in scan_directory_level(&dir_path, anchor)? {
        if builder.push(child.clone()) {
            wire.extend_from_slice(&codec.encode(&child, false));
        }
    }

    wire.extend_from_slice(&flist::encode_done());
    let base = list.finalize_segment(builder);
    if let Some(segment) = list.segment_containing(base) {
        let stubs: Vec<u32> = segment.iter().filter(|(_, e)| e.is_directory()).map(|(idx, _)| idx).collect();
        for idx in stubs {
            list.mark_stub(idx);
        }
    }
    Ok(wire)
}

/// Implements the sender's half of a single file's delta transfer: reads
/// the full source file into memory and runs it against the checksum
/// table the peer's generator produced, writing the resulting token
/// stream through `writer`. Returns the whole-file MD5 digest, sent after
/// the token stream so the receiver can verify its reconstruction.
pub fn send_file_diff<W: Write>(
    writer: &mut FramedWriter<W>,
    source_path: &Path,
    header: &ChecksumHeader,
    chunks: &[ChecksumChunk],
    seed: Md5Seed,
) -> Result<[u8; 16]> {
    let mut file = File::open(source_path).map_err(EngineError::Io)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).map_err(EngineError::Io)?;

    let mut tokens = Vec::new();
    let digest = if header.block_length() == 0 || chunks.is_empty() {
        matching::skip_match_send_data(&data, seed, &mut tokens)?
    } else {
        matching::generate_delta(&data, header, chunks, seed, &mut tokens)?
    };

    writer.write_data(&tokens).map_err(EngineError::Protocol)?;
    Ok(digest)
}

/// Outcome of attempting to answer one file's itemization request: either
/// a normal delta transfer (the whole-file MD5 digest that follows the
/// token stream), or a report that no data was sent at all because the
/// source could no longer be read.
pub enum DiffOutcome {
    Sent([u8; 16]),
    /// The source vanished between itemization and transfer (§4.6
    /// Failure semantics). A `NoSend(idx)` control message has already
    /// been written in place of a token stream; no data follows for this
    /// index.
    Vanished,
    /// The source exists but could not be opened or read for a reason
    /// other than not existing (permissions, I/O error). An `IoError`
    /// control message has already been written in place of a token
    /// stream; no data follows for this index.
    GeneralIoError,
}

/// [`send_file_diff`], but tolerant of a source file that vanished or
/// became unreadable after the generator itemized it: instead of
/// propagating a fatal error that would abort the whole session, it
/// reports the failure to the peer as a control message and lets the
/// caller move on to the next index.
pub fn send_file_diff_or_report<W: Write>(
    writer: &mut FramedWriter<W>,
    idx: u32,
    source_path: &Path,
    header: &ChecksumHeader,
    chunks: &[ChecksumChunk],
    seed: Md5Seed,
) -> Result<DiffOutcome> {
    let file = match File::open(source_path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let message = Message::new(MessageCode::NoSend, (idx as i32).to_le_bytes().to_vec())
                .map_err(EngineError::Protocol)?;
            writer.write_message(&message).map_err(EngineError::Protocol)?;
            return Ok(DiffOutcome::Vanished);
        }
        Err(_) => {
            let message = Message::new(MessageCode::IoError, (idx as i32).to_le_bytes().to_vec())
                .map_err(EngineError::Protocol)?;
            writer.write_message(&message).map_err(EngineError::Protocol)?;
            return Ok(DiffOutcome::GeneralIoError);
        }
    };

    let mut file = file;
    let mut data = Vec::new();
    if file.read_to_end(&mut data).is_err() {
        let message = Message::new(MessageCode::IoError, (idx as i32).to_le_bytes().to_vec())
            .map_err(EngineError::Protocol)?;
        writer.write_message(&message).map_err(EngineError::Protocol)?;
        return Ok(DiffOutcome::GeneralIoError);
    }

    let mut tokens = Vec::new();
    let digest = if header.block_length() == 0 || chunks.is_empty() {
        matching::skip_match_send_data(&data, seed, &mut tokens)?
    } else {
        matching::generate_delta(&data, header, chunks, seed, &mut tokens)?
    };

    writer.write_data(&tokens).map_err(EngineError::Protocol)?;
    Ok(DiffOutcome::Sent(digest))
}

/// Per-connection sender state: framing plus the index codec used to
/// diff-encode which file is being answered.
pub struct Sender<W: Write> {
    pub writer: FramedWriter<W>,
    pub ndx: NdxCodec,
    pub seed: Md5Seed,
}

impl<W: Write> Sender<W> {
    pub fn new(writer: FramedWriter<W>, seed: Md5Seed) -> Self {
        Self {
            writer,
            ndx: NdxCodec::new(),
            seed,
        }
    }

    /// Writes a file-list index on the sender's ndx stream.
    pub fn send_index(&mut self, idx: i32) -> Result<()> {
        let bytes = self.ndx.encode(idx);
        self.writer.write_data(&bytes).map_err(EngineError::Protocol)
    }
}
