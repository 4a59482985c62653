//! Wires the sender role and the combined generator+receiver role
//! together over a [`rsync_io::DuplexEnd`] pair to drive one same-host
//! transfer end to end.
//!
//! Two processes talking over a socket only ever see each other through
//! the multiplexed byte stream; a local transfer is the degenerate case
//! where that stream is an in-memory pipe instead, so this module spawns
//! the sender on its own thread and drives the generator+receiver role
//! on the caller's thread, exactly the way a two-process session would
//! split the work.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use checksums::Md5Seed;
use flist::{FileEntry, FileKind, FileList, FlistEntryCodec};
use logging::{InfoFlag, Logger};
use protocol::{FramedReader, FramedWriter, NdxCodec};
use rsync_io::duplex_pair;

use crate::error::{EngineError, IoErrorMask, Result};
use crate::generator::{self, MIN_DIGEST_LENGTH};
use crate::itemize::ItemFlags;
use crate::options::SessionOptions;
use crate::receiver::{self, TransferStats};
use crate::sender::{self, DiffOutcome};
use crate::state::ConnectionState;

/// What a completed transfer reports back to its caller: the same
/// statistics frame the wire exchange carries, plus the error mask
/// accumulated from per-file failures that did not abort the session.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransferOutcome {
    pub stats: TransferStats,
    pub io_errors: IoErrorMask,
    pub files_transferred: u32,
}

/// A single same-host transfer: a source entry list on one side, a
/// destination root on the other, bound together by one set of session
/// options.
pub struct LocalSession {
    options: SessionOptions,
    seed: Md5Seed,
    logger: Logger,
}

impl LocalSession {
    pub fn new(options: SessionOptions, seed: Md5Seed, logger: Logger) -> Self {
        Self { options, seed, logger }
    }

    /// Runs the transfer: `sources` and `anchor` describe the sender's
    /// side exactly as [`sender::build_initial_segment`] expects them;
    /// `dest` is the root the receiver mirrors into.
    pub fn run(&self, sources: &[PathBuf], anchor: &Path, dest: &Path) -> Result<TransferOutcome> {
        run_local_transfer(sources, anchor, dest, self.options, self.seed, self.logger.clone())
    }
}

/// Runs a same-host transfer, spawning a sender thread against `sources`
/// and driving the generator+receiver role on the calling thread against
/// `dest`. Returns once both sides have completed teardown.
pub fn run_local_transfer(
    sources: &[PathBuf],
    anchor: &Path,
    dest: &Path,
    options: SessionOptions,
    seed: Md5Seed,
    logger: Logger,
) -> Result<TransferOutcome> {
    let (sender_end, peer_end) = duplex_pair();
    let sources = sources.to_vec();
    let anchor = anchor.to_path_buf();

    let sender_thread = thread::Builder::new()
        .name("rrsync-sender".into())
        .spawn(move || run_sender(sender_end, &sources, &anchor, options, seed))
        .map_err(EngineError::Io)?;

    let outcome = run_generator_receiver(peer_end, dest, options, seed, &logger);

    match sender_thread.join() {
        Ok(Ok(())) => outcome,
        Ok(Err(err)) => Err(err),
        Err(_) => Err(EngineError::QueueClosed),
    }
}

/// The sender side of [`run_local_transfer`]: advertises the source file
/// list, then answers the peer's itemization requests in order until its
/// mirrored list is empty, finally reporting its own transfer statistics.
fn run_sender(
    end: rsync_io::DuplexEnd,
    sources: &[PathBuf],
    anchor: &Path,
    options: SessionOptions,
    seed: Md5Seed,
) -> Result<()> {
    let (read_half, write_half) = end.split();
    let mut reader = FramedReader::new(read_half);
    let mut writer = FramedWriter::new(write_half);
    let mut ndx = NdxCodec::new();

    let mut list = FileList::new();
    let wire = sender::build_initial_segment(sources, anchor, &options, &mut list)?;
    writer.write_data(&wire)?;
    writer.flush()?;

    let total = list.segment_containing(0).map_or(0, |segment| segment.end_index());
    let mut total_file_size: i64 = 0;

    let mut messages = Vec::new();
    for _ in 0..total {
        let idx = ndx.decode(&mut control_reader(&mut reader, &mut messages))?;
        let mut flag_bytes = [0u8; 2];
        read_exact(&mut reader, &mut messages, &mut flag_bytes)?;
        let flags = ItemFlags::from_u16(u16::from_le_bytes(flag_bytes));

        if flags.contains(ItemFlags::TRANSFER) {
            let (header, chunks) = {
                let mut cr = control_reader(&mut reader, &mut messages);
                signature::decode_signature(&mut cr)?
            };
            let entry = list.get(idx as u32).ok_or(EngineError::UnknownIndex(idx as u32))?.clone();
            let source_path = anchor.join(entry.relative_path().as_path());
            match sender::send_file_diff_or_report(&mut writer, idx as u32, &source_path, &header, &chunks, seed)? {
                DiffOutcome::Sent(digest) => {
                    writer.write_data(&digest)?;
                    total_file_size += header.file_length() as i64;
                }
                // The source vanished or became unreadable between
                // itemization and transfer: a control message reporting
                // this has already been written in place of a token
                // stream and digest, so there is nothing more to send for
                // this index (§4.6 Failure semantics).
                DiffOutcome::Vanished | DiffOutcome::GeneralIoError => {}
            }
        }

        let _ = list.remove(idx as u32);
        writer.flush()?;
    }

    let stats = TransferStats {
        total_written: writer.bytes_written() as i64,
        total_read: reader.bytes_read() as i64,
        total_file_size,
        list_build_time: 0,
        list_transfer_time: 0,
    };
    writer.write_data(&stats.encode())?;
    writer.flush()?;
    Ok(())
}

/// The generator+receiver side of [`run_local_transfer`]: decodes the
/// incoming file list, itemizes each entry against `dest`, pulls and
/// verifies a delta for anything that needs transferring, and applies
/// attributes (directories deferred until their descendants are
/// written, per the deferred-attribute discipline).
fn run_generator_receiver(
    end: rsync_io::DuplexEnd,
    dest: &Path,
    options: SessionOptions,
    seed: Md5Seed,
    logger: &Logger,
) -> Result<TransferOutcome> {
    let (read_half, write_half) = end.split();
    let mut reader = FramedReader::new(read_half);
    let mut writer = FramedWriter::new(write_half);
    let mut ndx = NdxCodec::new();
    let mut codec = FlistEntryCodec::new();

    let mut list = FileList::new();
    receiver::receive_file_list(&mut reader, &mut codec, &mut list)?;

    let min_digest = MIN_DIGEST_LENGTH;
    let total = list.segment_containing(0).map_or(0, |segment| segment.end_index());

    let mut io_errors = IoErrorMask::empty();
    let mut files_transferred = 0u32;
    let mut deferred_dirs: Vec<(PathBuf, metadata::LocalAttrs, metadata::LocalAttrs)> = Vec::new();

    for idx in 0..total {
        let Some(entry) = list.get(idx).cloned() else {
            continue;
        };
        let dest_path = receiver::resolve_destination(dest, entry.relative_path().as_path().as_ref())?;

        materialize_entry(&entry, &dest_path)?;

        let itemized = generator::send_file_metadata(idx, &entry, dest, &options, seed, min_digest, logger)?;

        let ndx_bytes = ndx.encode(idx as i32);
        writer.write_data(&ndx_bytes)?;
        writer.write_data(&itemized.flags.as_u16().to_le_bytes())?;
        if itemized.flags.contains(ItemFlags::TRANSFER) {
            let mut header_buf = Vec::new();
            signature::encode_signature(&mut header_buf, &itemized.header, &itemized.chunks)?;
            writer.write_data(&header_buf)?;
        }
        writer.flush()?;

        if itemized.flags.contains(ItemFlags::TRANSFER) && entry.is_regular() {
            // The sender answers a transfer request either with a token
            // stream (the common case) or, if the source vanished or
            // became unreadable, with a control message and nothing else.
            // `next_frame` stops at whichever comes first without looping
            // past a control-only response into the next index's data.
            let mut control = Vec::new();
            reader.next_frame(|msg| control.push(msg)).map_err(EngineError::Protocol)?;
            let vanished = control.iter().any(|m| m.code() == protocol::MessageCode::NoSend);
            let general_error = control.iter().any(|m| m.code() == protocol::MessageCode::IoError);

            if vanished || general_error {
                io_errors.set(if vanished { IoErrorMask::VANISHED } else { IoErrorMask::GENERAL });
                logger.warning(format!("{}: source unavailable, skipped", dest_path.display()));
            } else {
                let basis_path = if itemized.flags.contains(ItemFlags::IS_NEW) {
                    None
                } else {
                    Some(dest_path.as_path())
                };
                match receiver::receive_and_match(&mut reader, basis_path, &itemized.header, &dest_path, seed, options.defer_write) {
                    Ok(true) => {
                        let target = target_attrs(&entry);
                        if let Err(err) = metadata::apply_attrs(&dest_path, &target, options.attr_preserve_flags()) {
                            logger.warning(format!("{}: failed to apply attributes: {err}", dest_path.display()));
                        }
                        logger.info(InfoFlag::Copy, 1, dest_path.display().to_string());
                        files_transferred += 1;
                    }
                    Ok(false) => {
                        io_errors.set(IoErrorMask::TRANSFER);
                        logger.error(format!("{}: checksum mismatch after transfer, skipped", dest_path.display()));
                    }
                    Err(err) => {
                        io_errors.set(IoErrorMask::TRANSFER);
                        logger.error(format!("{}: {err}", dest_path.display()));
                    }
                }
            }
        } else if entry.is_directory() {
            if let Ok(current) = metadata::read_local_attrs(&dest_path) {
                deferred_dirs.push((dest_path.clone(), current, target_attrs(&entry)));
            }
        }

        let _ = list.remove(idx);
        generator::remove_finished_segments_and_ack(&mut list);
    }

    // Directory attributes are applied last-in-first-out: a leaf
    // directory's mtime is set before its parent's, so writing the
    // leaf's own children can't bump the parent's mtime after the fact.
    while let Some((path, current, target)) = deferred_dirs.pop() {
        let differs = (options.preserve_perms && current.mode != target.mode)
            || (options.preserve_times && current.mtime != target.mtime)
            || (options.preserve_user && current.uid != target.uid)
            || (options.preserve_group && current.gid != target.gid);
        if differs {
            if let Err(err) = metadata::apply_attrs(&path, &target, options.attr_preserve_flags()) {
                logger.warning(format!("{}: failed to apply directory attributes: {err}", path.display()));
            }
        }
    }

    let mut state = ConnectionState::default();
    state.step_teardown();
    state.step_teardown();
    state.step_teardown();
    debug_assert!(state.is_stopped());

    let mut messages = Vec::new();
    let stats = TransferStats::decode(&mut control_reader(&mut reader, &mut messages))?;

    Ok(TransferOutcome { stats, io_errors, files_transferred })
}

/// Creates the on-disk object `entry` names, if it is a kind this engine
/// recreates directly (directories and symlinks). Regular files are left
/// to [`receiver::receive_and_match`]; devices, fifos, and sockets are
/// itemized but never recreated (metadata carriage only).
fn materialize_entry(entry: &FileEntry, dest_path: &Path) -> Result<()> {
    match entry.kind() {
        FileKind::Directory => {
            fs::create_dir_all(dest_path).map_err(EngineError::Io)?;
        }
        FileKind::Symlink { target } => {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).map_err(EngineError::Io)?;
            }
            if fs::symlink_metadata(dest_path).is_err() {
                #[cfg(unix)]
                std::os::unix::fs::symlink(target.as_path(), dest_path).map_err(EngineError::Io)?;
            }
        }
        FileKind::Regular | FileKind::Device { .. } | FileKind::Fifo | FileKind::Socket => {}
    }
    Ok(())
}

fn target_attrs(entry: &FileEntry) -> metadata::LocalAttrs {
    metadata::LocalAttrs {
        kind: entry.kind().clone(),
        mode: entry.mode(),
        size: entry.size(),
        mtime: entry.mtime(),
        uid: entry.uid().id,
        gid: entry.gid().id,
    }
}

fn control_reader<'a, R: std::io::Read>(
    reader: &'a mut FramedReader<R>,
    messages: &'a mut Vec<protocol::Message>,
) -> crate::receiver::ControlAwareReader<'a, R> {
    crate::receiver::ControlAwareReader::new(reader, messages)
}

fn read_exact<R: std::io::Read>(reader: &mut FramedReader<R>, messages: &mut Vec<protocol::Message>, buf: &mut [u8]) -> Result<()> {
    let mut cr = control_reader(reader, messages);
    std::io::Read::read_exact(&mut cr, buf).map_err(EngineError::Io)
}
