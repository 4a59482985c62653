//! The receiver role: decodes the incoming file list, resolves
//! destination paths safely, and reconstructs file bodies from the
//! sender's token stream.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use checksums::{Md5, Md5Seed};
use flist::{FileList, FlistEntryCodec, ListItem};
use matching::Token;
use protocol::{FramedReader, Message};
use signature::ChecksumHeader;

use crate::error::{EngineError, Result};

/// Reads entries from `reader` via `codec` until the list terminator (or
/// an end-of-list I/O error frame) and appends them to the initial
/// segment of `list`. Returns the number of entries received.
pub fn receive_file_list<R: Read>(
    reader: &mut FramedReader<R>,
    codec: &mut FlistEntryCodec,
    list: &mut FileList,
) -> Result<usize> {
    let mut messages = Vec::new();
    let mut builder = list.begin_segment(-1, None);
    let mut count = 0;

    loop {
        let item = {
            let mut cr = ControlAwareReader::new(reader, &mut messages);
            codec.decode(&mut cr).map_err(EngineError::FileList)?
        };
        match item {
            ListItem::Entry(entry) => {
                builder.push(entry);
                count += 1;
            }
            ListItem::Done => break,
            ListItem::IoError(code) => {
                return Err(EngineError::PathResolution(io_error_message(code)));
            }
        }
    }

    list.finalize_segment(builder);
    Ok(count)
}

fn io_error_message(code: i32) -> &'static str {
    if code != 0 {
        "peer reported an I/O error terminating the file list"
    } else {
        "file list ended"
    }
}

/// Resolves `relative` against `dest_root`, rejecting any path that would
/// escape the destination tree (`..` components, absolute overrides).
pub fn resolve_destination(dest_root: &Path, relative: &Path) -> Result<PathBuf> {
    let mut resolved = dest_root.to_path_buf();
    for component in relative.components() {
        match component {
            std::path::Component::Normal(part) => resolved.push(part),
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir | std::path::Component::RootDir | std::path::Component::Prefix(_) => {
                return Err(EngineError::PathEscape { path: relative.to_path_buf() });
            }
        }
    }
    if !resolved.starts_with(dest_root) {
        return Err(EngineError::PathEscape { path: relative.to_path_buf() });
    }
    Ok(resolved)
}

/// Adapts a [`FramedReader`] to [`Read`], routing any control messages
/// encountered mid-stream into a caller-supplied sink instead of
/// dropping them.
pub(crate) struct ControlAwareReader<'a, R: Read> {
    inner: &'a mut FramedReader<R>,
    messages: &'a mut Vec<Message>,
}

impl<'a, R: Read> ControlAwareReader<'a, R> {
    pub(crate) fn new(inner: &'a mut FramedReader<R>, messages: &'a mut Vec<Message>) -> Self {
        Self { inner, messages }
    }
}

impl<'a, R: Read> Read for ControlAwareReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let messages = &mut self.messages;
        self.inner
            .read_data(buf, |msg| messages.push(msg))
            .map_err(std::io::Error::other)
    }
}

/// Reconstructs one file from the sender's token stream: literal runs are
/// copied straight through, match tokens are satisfied by seeking into
/// `basis_path` (the file's previous local replica, if any). Once the
/// token stream ends, the sender's whole-file digest follows immediately
/// on the same stream ([`sender::send_file_diff`]'s return value, written
/// by the caller); this function reads it and compares it against its own
/// running hash before committing the result.
///
/// The result is written to a sibling temp file and atomically renamed
/// onto `dest_path` once the digests match.
///
/// When `defer_write` is set and a basis file is on hand, every match
/// token is tracked against the block index expected next rather than
/// written out immediately — the common case of an unmodified file never
/// touches disk beyond reading and re-hashing it. The optimization ends
/// at the first out-of-order match or literal: the matched prefix is
/// copied from the basis into the temp file and reconstruction proceeds
/// normally from there (§4.7 Deferred write optimization).
///
/// Returns `Ok(false)` if the sender's digest did not match the
/// reconstructed data (the caller should re-request the file), propagating
/// I/O errors otherwise.
pub fn receive_and_match<R: Read>(
    reader: &mut FramedReader<R>,
    basis_path: Option<&Path>,
    header: &ChecksumHeader,
    dest_path: &Path,
    seed: Md5Seed,
    defer_write: bool,
) -> Result<bool> {
    let mut messages = Vec::new();
    let mut basis = basis_path.map(File::open).transpose().map_err(EngineError::Io)?;

    let tmp_path = sibling_temp_path(dest_path);
    let mut deferring = defer_write && basis.is_some();
    let mut expected_next: u32 = 0;
    let mut tmp: Option<File> = if deferring {
        None
    } else {
        Some(File::create(&tmp_path).map_err(EngineError::Io)?)
    };
    let mut hasher = Md5::with_seed(seed);

    // Ends the deferred-write fast path: materializes every block matched
    // so far (read straight from the basis, never re-requested from the
    // peer) into a freshly created temp file, so the remainder of the
    // token stream can be handled by the ordinary write-through path.
    let stop_deferring = |basis: &mut Option<File>, tmp: &mut Option<File>, expected_next: u32, header: &ChecksumHeader| -> Result<()> {
        let mut file = File::create(&tmp_path).map_err(EngineError::Io)?;
        if expected_next > 0 {
            let basis = basis.as_mut().expect("deferring implies a basis file");
            basis.seek(SeekFrom::Start(0)).map_err(EngineError::Io)?;
            let mut remaining = expected_next;
            let mut idx = 0u32;
            while remaining > 0 {
                let len = header.chunk_len(idx) as usize;
                let mut buf = vec![0u8; len];
                basis.read_exact(&mut buf).map_err(EngineError::Io)?;
                file.write_all(&buf).map_err(EngineError::Io)?;
                idx += 1;
                remaining -= 1;
            }
        }
        *tmp = Some(file);
        Ok(())
    };

    loop {
        let token = {
            let mut cr = ControlAwareReader::new(reader, &mut messages);
            matching::read_token(&mut cr).map_err(EngineError::Io)?
        };

        match token {
            Token::End => break,
            Token::Literal(len) => {
                if deferring {
                    stop_deferring(&mut basis, &mut tmp, expected_next, header)?;
                    deferring = false;
                }
                let mut buf = vec![0u8; len as usize];
                {
                    let mut cr = ControlAwareReader::new(reader, &mut messages);
                    cr.read_exact(&mut buf).map_err(EngineError::Io)?;
                }
                tmp.as_mut().expect("deferral ended before a literal is written").write_all(&buf).map_err(EngineError::Io)?;
                hasher.update(&buf);
            }
            Token::Match(index) => {
                let offset = u64::from(index) * u64::from(header.block_length());
                let len = header.chunk_len(index) as usize;

                if deferring && index == expected_next {
                    let basis = basis
                        .as_mut()
                        .ok_or(EngineError::PathResolution("match token received with no basis file on hand"))?;
                    basis.seek(SeekFrom::Start(offset)).map_err(EngineError::Io)?;
                    let mut buf = vec![0u8; len];
                    basis.read_exact(&mut buf).map_err(EngineError::Io)?;
                    hasher.update(&buf);
                    expected_next += 1;
                    continue;
                }
                if deferring {
                    stop_deferring(&mut basis, &mut tmp, expected_next, header)?;
                    deferring = false;
                }

                let basis = basis
                    .as_mut()
                    .ok_or(EngineError::PathResolution("match token received with no basis file on hand"))?;
                basis.seek(SeekFrom::Start(offset)).map_err(EngineError::Io)?;
                let mut buf = vec![0u8; len];
                basis.read_exact(&mut buf).map_err(EngineError::Io)?;
                tmp.as_mut().expect("deferral ended before a match is written").write_all(&buf).map_err(EngineError::Io)?;
                hasher.update(&buf);
            }
        }
    }

    let mut expected_digest = [0u8; 16];
    {
        let mut cr = ControlAwareReader::new(reader, &mut messages);
        cr.read_exact(&mut expected_digest).map_err(EngineError::Io)?;
    }
    let digest = hasher.finalize();

    if deferring {
        // The entire file matched the basis in order with no literals:
        // nothing was ever written, and `dest_path` already holds exactly
        // this content (it is the basis itself), so there is nothing to
        // rename either.
        return Ok(digest == expected_digest);
    }

    let mut tmp = tmp.expect("a temp file exists whenever deferral did not survive the whole stream");
    tmp.flush().map_err(EngineError::Io)?;
    drop(tmp);

    if digest != expected_digest {
        let _ = std::fs::remove_file(&tmp_path);
        return Ok(false);
    }

    if let Some(parent) = dest_path.parent() {
        std::fs::create_dir_all(parent).map_err(EngineError::Io)?;
    }
    std::fs::rename(&tmp_path, dest_path).map_err(EngineError::Io)?;
    Ok(true)
}

fn sibling_temp_path(dest_path: &Path) -> PathBuf {
    let file_name = dest_path.file_name().map(|n| {
        let mut name = std::ffi::OsString::from(".");
        name.push(n);
        name.push(".rrsync-tmp");
        name
    });
    match file_name {
        Some(name) => dest_path.with_file_name(name),
        None => dest_path.with_extension("rrsync-tmp"),
    }
}

/// The end-of-transfer statistics frame each role sends during teardown.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TransferStats {
    pub total_written: i64,
    pub total_read: i64,
    pub total_file_size: i64,
    pub list_build_time: i64,
    pub list_transfer_time: i64,
}

impl TransferStats {
    /// Encodes the five fields in order, each a protocol varint with a
    /// 3-byte floor.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for value in [
            self.total_written,
            self.total_read,
            self.total_file_size,
            self.list_build_time,
            self.list_transfer_time,
        ] {
            protocol::encode_int_to_vec(value, 3, &mut out);
        }
        out
    }

    /// Decodes the five fields from `reader`, in the order [`Self::encode`]
    /// writes them.
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut next = || protocol::decode_int(reader, 3).map_err(EngineError::Protocol);
        Ok(Self {
            total_written: next()?,
            total_read: next()?,
            total_file_size: next()?,
            list_build_time: next()?,
            list_transfer_time: next()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checksums::StrongDigest;

    #[test]
    fn resolves_simple_relative_path() {
        let root = Path::new("/dest");
        let resolved = resolve_destination(root, Path::new("a/b.txt")).unwrap();
        assert_eq!(resolved, Path::new("/dest/a/b.txt"));
    }

    #[test]
    fn rejects_parent_dir_escape() {
        let root = Path::new("/dest");
        assert!(resolve_destination(root, Path::new("../escape")).is_err());
        assert!(resolve_destination(root, Path::new("a/../../escape")).is_err());
    }

    #[test]
    fn rejects_absolute_override() {
        let root = Path::new("/dest");
        assert!(resolve_destination(root, Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn stats_round_trip() {
        let stats = TransferStats {
            total_written: 1234,
            total_read: 5,
            total_file_size: 999_999,
            list_build_time: 1,
            list_transfer_time: 2,
        };
        let encoded = stats.encode();
        let mut cursor = std::io::Cursor::new(encoded);
        let decoded = TransferStats::decode(&mut cursor).unwrap();
        assert_eq!(stats, decoded);
    }

    #[test]
    fn reconstructs_file_from_literal_only_stream() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bin");

        let mut wire = Vec::new();
        matching::write_literal(&mut wire, b"hello world").unwrap();
        matching::write_token(&mut wire, Token::End).unwrap();
        wire.extend_from_slice(&Md5::digest_with_seed(Md5Seed::none(), b"hello world"));

        let mut bytes = Vec::new();
        {
            let mut framed = protocol::FramedWriter::new(&mut bytes);
            framed.write_data(&wire).unwrap();
            framed.flush().unwrap();
        }

        let mut reader = FramedReader::new(std::io::Cursor::new(bytes));
        let ok = receive_and_match(&mut reader, None, &ChecksumHeader::zero_sum(), &dest, Md5Seed::none(), false).unwrap();
        assert!(ok);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
    }

    fn block_header(block_length: u32, file_length: u64) -> ChecksumHeader {
        ChecksumHeader::new(block_length, 16, file_length).unwrap()
    }

    #[test]
    fn deferred_write_never_touches_disk_for_an_identical_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("same.bin");
        let content = vec![b'z'; 1024];
        std::fs::write(&dest, &content).unwrap();
        let inode_before = std::fs::metadata(&dest).unwrap();

        let header = block_header(512, 1024);
        let mut wire = Vec::new();
        matching::write_token(&mut wire, Token::Match(0)).unwrap();
        matching::write_token(&mut wire, Token::Match(1)).unwrap();
        matching::write_token(&mut wire, Token::End).unwrap();
        wire.extend_from_slice(&Md5::digest_with_seed(Md5Seed::none(), &content));

        let mut bytes = Vec::new();
        {
            let mut framed = protocol::FramedWriter::new(&mut bytes);
            framed.write_data(&wire).unwrap();
            framed.flush().unwrap();
        }

        let mut reader = FramedReader::new(std::io::Cursor::new(bytes));
        let ok = receive_and_match(&mut reader, Some(&dest), &header, &dest, Md5Seed::none(), true).unwrap();
        assert!(ok);
        assert_eq!(std::fs::read(&dest).unwrap(), content);
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            assert_eq!(inode_before.ino(), std::fs::metadata(&dest).unwrap().ino());
        }

        let tmp = sibling_temp_path(&dest);
        assert!(!tmp.exists());
    }

    #[test]
    fn deferred_write_falls_back_on_an_out_of_order_match() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("reordered.bin");
        let content = vec![b'a'; 512]
            .into_iter()
            .chain(vec![b'b'; 512])
            .collect::<Vec<u8>>();
        std::fs::write(&dest, &content).unwrap();

        let header = block_header(512, 1024);
        // Swap the two blocks: the target content is block 1 then block 0.
        let mut wire = Vec::new();
        matching::write_token(&mut wire, Token::Match(1)).unwrap();
        matching::write_token(&mut wire, Token::Match(0)).unwrap();
        matching::write_token(&mut wire, Token::End).unwrap();
        let mut expected = content[512..].to_vec();
        expected.extend_from_slice(&content[..512]);
        wire.extend_from_slice(&Md5::digest_with_seed(Md5Seed::none(), &expected));

        let mut bytes = Vec::new();
        {
            let mut framed = protocol::FramedWriter::new(&mut bytes);
            framed.write_data(&wire).unwrap();
            framed.flush().unwrap();
        }

        let mut reader = FramedReader::new(std::io::Cursor::new(bytes));
        let ok = receive_and_match(&mut reader, Some(&dest), &header, &dest, Md5Seed::none(), true).unwrap();
        assert!(ok);
        assert_eq!(std::fs::read(&dest).unwrap(), expected);
    }
}
