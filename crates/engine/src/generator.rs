//! The generator role: walks the local replica, itemizes entries against
//! the peer's advertised attributes, and emits block checksums for files
//! that need a delta transfer.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use checksums::Md5Seed;
use crossbeam_channel::Receiver as JobReceiver;
use flist::{FileEntry, FileKind, FileList};
use logging::Logger;
use signature::ChecksumHeader;

use crate::error::{EngineError, Result};
use crate::itemize::{compute_itemize_flags, ItemFlags};
use crate::jobs::GeneratorJob;
use crate::options::SessionOptions;

/// A single itemization result written to the outgoing channel: the
/// index, its item flags, and — for a transfer — the checksum header
/// plus chunk table that follow it.
pub struct ItemizedEntry {
    pub idx: u32,
    pub flags: ItemFlags,
    pub header: ChecksumHeader,
    pub chunks: Vec<signature::ChecksumChunk>,
}

/// Minimum strong-checksum length the generator accepts from a
/// low-cost, server-side comparison; raised to [`MAX_DIGEST_LENGTH`] when
/// generating on behalf of the client (`generateFile`).
pub const MIN_DIGEST_LENGTH: u32 = signature::MIN_DIGEST_LEN;
pub const MAX_DIGEST_LENGTH: u32 = signature::MAX_DIGEST_LEN;

/// Computes the destination path for `entry` relative to `dest_root`.
fn local_path(dest_root: &Path, entry: &FileEntry) -> PathBuf {
    dest_root.join(entry.relative_path().as_path())
}

/// Implements `sendFileMetadata`: compares the local replica against
/// `entry`'s advertised attributes and decides whether a delta transfer
/// is needed, itemizing either way.
///
/// Returns the itemization plus, for a transfer, the checksum header and
/// chunk table computed from the local replica (or a `ZERO_SUM` header if
/// the local file is missing, unreadable, or a different file type).
pub fn send_file_metadata(
    idx: u32,
    entry: &FileEntry,
    dest_root: &Path,
    options: &SessionOptions,
    seed: Md5Seed,
    min_digest: u32,
    logger: &Logger,
) -> Result<ItemizedEntry> {
    let path = local_path(dest_root, entry);
    let current = metadata::read_local_attrs(&path).ok();

    if let Some(current) = &current {
        if std::mem::discriminant(&current.kind) != std::mem::discriminant(entry.kind()) {
            // A different file-type occupies this path; remove it so the
            // receiver can create the right kind fresh.
            remove_existing(&path, &current.kind)?;
        }
    }

    let target_attrs = metadata::LocalAttrs {
        kind: entry.kind().clone(),
        mode: entry.mode(),
        size: entry.size(),
        mtime: entry.mtime(),
        uid: entry.uid().id,
        gid: entry.gid().id,
    };

    let needs_transfer = match &current {
        None => true,
        Some(current) => options.ignore_times || current.size != entry.size() || current.mtime != entry.mtime(),
    };

    if !entry.is_regular() {
        let flags = compute_itemize_flags(current.as_ref(), &target_attrs, options);
        return Ok(ItemizedEntry {
            idx,
            flags,
            header: ChecksumHeader::zero_sum(),
            chunks: Vec::new(),
        });
    }

    if !needs_transfer {
        let mut flags = ItemFlags::empty();
        if options.always_itemize {
            flags = ItemFlags::NO_CHANGE;
        }
        update_attrs_if_differ(&path, current.as_ref(), &target_attrs, options, logger)?;
        return Ok(ItemizedEntry {
            idx,
            flags,
            header: ChecksumHeader::zero_sum(),
            chunks: Vec::new(),
        });
    }

    let flags = if current.is_none() {
        ItemFlags::TRANSFER.union(ItemFlags::IS_NEW)
    } else {
        ItemFlags::TRANSFER.union(compute_itemize_flags(current.as_ref(), &target_attrs, options))
    };

    let (header, chunks) = match send_itemize_and_checksums(&path, min_digest, seed) {
        Ok(pair) => pair,
        Err(err) => {
            logger.warning(format!("{}: checksum generation failed: {err}", path.display()));
            (ChecksumHeader::zero_sum(), Vec::new())
        }
    };

    Ok(ItemizedEntry { idx, flags, header, chunks })
}

/// Implements `sendItemizeAndChecksums`: opens the local replica and
/// computes its block checksum table at `header`'s layout. On open
/// failure returns a `ZERO_SUM` header so the sender transmits the whole
/// file.
fn send_itemize_and_checksums(
    path: &Path,
    min_digest: u32,
    seed: Md5Seed,
) -> std::io::Result<(ChecksumHeader, Vec<signature::ChecksumChunk>)> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return Ok((ChecksumHeader::zero_sum(), Vec::new())),
    };
    let file_len = file.metadata()?.len();
    if file_len == 0 {
        return Ok((ChecksumHeader::zero_sum(), Vec::new()));
    }

    let mut header = ChecksumHeader::for_file_length(file_len);
    if header.digest_length() < min_digest {
        header = ChecksumHeader::new(header.block_length(), min_digest.min(signature::MAX_DIGEST_LEN), file_len)
            .unwrap_or(header);
    }

    let chunks = signature::generate(&mut file, &header, seed)?;
    Ok((header, chunks))
}

/// Removes an existing local path whose file type no longer matches the
/// entry being received, so the receiver can create it fresh.
fn remove_existing(path: &Path, kind: &FileKind) -> Result<()> {
    let result = if matches!(kind, FileKind::Directory) {
        std::fs::remove_dir(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(()),
        Err(_) if !path.exists() => Ok(()),
        Err(err) => Err(EngineError::Io(err)),
    }
}

/// Implements `updateAttrsIfDiffer`: applies any attribute deltas locally
/// when no data transfer is needed.
fn update_attrs_if_differ(
    path: &Path,
    current: Option<&metadata::LocalAttrs>,
    target: &metadata::LocalAttrs,
    options: &SessionOptions,
    logger: &Logger,
) -> Result<()> {
    let Some(current) = current else {
        return Ok(());
    };
    let differs = (options.preserve_perms && current.mode != target.mode)
        || (options.preserve_times && current.mtime != target.mtime)
        || (options.preserve_user && current.uid != target.uid)
        || (options.preserve_group && current.gid != target.gid);
    if !differs {
        return Ok(());
    }
    if let Err(err) = metadata::apply_attrs(path, target, options.attr_preserve_flags()) {
        logger.warning(format!("{}: failed to update attributes: {err}", path.display()));
    }
    Ok(())
}

/// Implements `removeFinishedSegmentsAndAck`: walks the list from the
/// head, deleting and acknowledging every finished segment in order,
/// stopping at the first unfinished one. Returns the base indices of the
/// segments that were popped, in order, so the caller can emit DONE for
/// each.
pub fn remove_finished_segments_and_ack(list: &mut FileList) -> Vec<u32> {
    let mut done = Vec::new();
    while let Some(segment) = list.pop_finished_head() {
        done.push(segment.base_index());
    }
    done
}

/// Drains `jobs` until a `Stop` job or the channel disconnects, executing
/// each in order against `list`; returns once draining is complete.
///
/// This mirrors the "batch then flush" discipline from the design: the
/// caller is expected to call [`std::io::Write::flush`] on its transport
/// once per call to this function, not once per job.
pub fn drain_batch<W: Write>(
    jobs: &JobReceiver<GeneratorJob>,
    list: &mut FileList,
    out: &mut W,
) -> Result<bool> {
    let mut saw_stop = false;
    let first = match jobs.recv() {
        Ok(job) => job,
        Err(_) => return Ok(true),
    };
    let mut batch = vec![first];
    while let Ok(job) = jobs.try_recv() {
        batch.push(job);
    }

    for job in batch {
        match job {
            GeneratorJob::SendBytes(bytes) => {
                out.write_all(&bytes)?;
            }
            GeneratorJob::PurgeFile { idx, .. } => {
                list.remove(idx)?;
                for base in remove_finished_segments_and_ack(list) {
                    let _ = base;
                }
            }
            GeneratorJob::SendSegmentDone => {}
            GeneratorJob::SendMessage { .. } | GeneratorJob::GenerateSegment { .. } | GeneratorJob::GenerateFile { .. } => {}
            GeneratorJob::Stop => {
                saw_stop = true;
            }
        }
    }
    out.flush()?;
    Ok(saw_stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flist::{Principal, RawPath};

    fn entry(name: &str, size: u64, mtime: i64) -> FileEntry {
        FileEntry::new(
            RawPath::new(name.as_bytes().to_vec()),
            RawPath::new(name.as_bytes().to_vec()),
            FileKind::Regular,
            0o644,
            size,
            mtime,
            Principal::new(0, None).unwrap(),
            Principal::new(0, None).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn missing_local_file_requests_full_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let e = entry("a.txt", 5, 100);
        let logger = Logger::new(logging::VerbosityConfig::from_verbose_level(0), std::sync::Arc::new(logging::CollectingSink::default()));

        let result = send_file_metadata(0, &e, dir.path(), &SessionOptions::default(), Md5Seed::none(), MIN_DIGEST_LENGTH, &logger).unwrap();
        assert!(result.flags.contains(ItemFlags::TRANSFER));
        assert!(result.flags.contains(ItemFlags::IS_NEW));
        assert_eq!(result.header, ChecksumHeader::zero_sum());
    }

    #[test]
    fn identical_size_and_mtime_skips_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(100, 0)).unwrap();

        let e = entry("a.txt", 5, 100);
        let logger = Logger::new(logging::VerbosityConfig::from_verbose_level(0), std::sync::Arc::new(logging::CollectingSink::default()));
        let result = send_file_metadata(0, &e, dir.path(), &SessionOptions::default(), Md5Seed::none(), MIN_DIGEST_LENGTH, &logger).unwrap();
        assert!(!result.flags.contains(ItemFlags::TRANSFER));
    }

    #[test]
    fn differing_size_requests_transfer_with_checksums() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, vec![b'x'; 600]).unwrap();
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(100, 0)).unwrap();

        let e = entry("a.txt", 5, 100);
        let logger = Logger::new(logging::VerbosityConfig::from_verbose_level(0), std::sync::Arc::new(logging::CollectingSink::default()));
        let result = send_file_metadata(0, &e, dir.path(), &SessionOptions::default(), Md5Seed::none(), MIN_DIGEST_LENGTH, &logger).unwrap();
        assert!(result.flags.contains(ItemFlags::TRANSFER));
        assert!(!result.chunks.is_empty());
    }
}
