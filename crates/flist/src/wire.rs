//! Transmit-flag compaction and the file-list-entry wire format.
//!
//! Each entry is serialized relative to the previous entry sent: a shared
//! name prefix is referenced by length instead of repeated, and mode/uid/
//! gid/mtime are omitted entirely when they match the previous entry. The
//! bits doing this live in [`TransmitFlags`]; [`FlistEntryCodec`] holds the
//! "previous entry" state a sender/receiver needs to drive the compaction.
//!
//! One wrinkle: a flags byte of `0` is the list terminator, so an
//! entry whose low byte would otherwise compute to `0` (nothing in common
//! with `TOP_DIR`, nothing same as the previous entry, no shared prefix)
//! is not representable directly. [`encode_entry`] resolves this the way
//! the rest of this workspace resolves "zero means something else"
//! collisions elsewhere: it forces [`TransmitFlags::EXTENDED_FLAGS`] on,
//! which is always safe to set (the decoder already knows to read one
//! more byte whenever it's present) and is never itself ambiguous with
//! the all-zero terminator.

use std::io::{Read, Write};

use protocol::{decode_int, encode_int_to_vec};

use crate::entry::{FileEntry, FileKind, Principal, RawPath};
use crate::error::{FileListError, Result};

/// Bitmask compaction flags for one file-list-entry frame.
///
/// Low byte matches upstream rsync's transmit-flags layout exactly
/// (`TOP_DIR = 0x01` .. `SAME_TIME = 0x80`); the high byte carries four
/// extended flags (`SAME_RDEV_MAJOR`, `USER_NAME_FOLLOWS`,
/// `GROUP_NAME_FOLLOWS`, `IO_ERROR_ENDLIST`) whose bit assignment is this
/// workspace's own choice, recorded in `DESIGN.md`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TransmitFlags(u16);

impl TransmitFlags {
    pub const TOP_DIR: Self = Self(0x0001);
    pub const SAME_MODE: Self = Self(0x0002);
    pub const EXTENDED_FLAGS: Self = Self(0x0004);
    pub const SAME_UID: Self = Self(0x0008);
    pub const SAME_GID: Self = Self(0x0010);
    pub const SAME_NAME: Self = Self(0x0020);
    pub const LONG_NAME: Self = Self(0x0040);
    pub const SAME_TIME: Self = Self(0x0080);

    pub const SAME_RDEV_MAJOR: Self = Self(0x0100);
    pub const USER_NAME_FOLLOWS: Self = Self(0x0200);
    pub const GROUP_NAME_FOLLOWS: Self = Self(0x0400);
    pub const IO_ERROR_ENDLIST: Self = Self(0x0800);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn low_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn high_byte(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn from_bytes(low: u8, high: u8) -> Self {
        Self((low as u16) | ((high as u16) << 8))
    }
}

/// Per-direction state needed to compact/reconstruct entries against the
/// previous one sent. Sender and receiver each keep one.
#[derive(Default)]
pub struct FlistEntryCodec {
    prev: Option<FileEntry>,
}

impl FlistEntryCodec {
    pub fn new() -> Self {
        Self { prev: None }
    }

    /// Encodes one entry, marking it `TOP_DIR` when `top_dir` is set (used
    /// for the top-level argument of a recursive source tree).
    pub fn encode(&mut self, entry: &FileEntry, top_dir: bool) -> Vec<u8> {
        let out = encode_entry(entry, self.prev.as_ref(), top_dir);
        self.prev = Some(entry.clone());
        out
    }

    /// Decodes one item from `reader`: an entry, the list terminator, or
    /// an end-of-list I/O error frame.
    pub fn decode<R: Read>(&mut self, reader: &mut R) -> Result<ListItem> {
        let item = decode_item(reader, self.prev.as_ref())?;
        if let ListItem::Entry(entry) = &item {
            self.prev = Some(entry.clone());
        }
        Ok(item)
    }
}

/// One decoded unit from the file-list-entry stream.
#[derive(Debug)]
pub enum ListItem {
    /// A file-list entry.
    Entry(FileEntry),
    /// The zero-flags terminator: no more entries follow.
    Done,
    /// `EXTENDED_FLAGS | IO_ERROR_ENDLIST` plus the carried error code: the
    /// sender aborted the list early after a local I/O failure.
    IoError(i32),
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).take(255).count()
}

/// POSIX `S_IFMT` file-type bits folded into the wire mode field, the same
/// way upstream rsync folds file type into the mode it transmits instead
/// of a separate discriminator. `FileKind::Device` does not distinguish
/// character from block devices (see `entry.rs`), so every device entry
/// uses `S_IFBLK` on the wire; the distinction was already lost locally by
/// the time a `FileKind` exists.
const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFIFO: u32 = 0o010000;
const S_IFSOCK: u32 = 0o140000;

/// The full wire-format mode for `entry`: its permission bits plus the
/// `S_IFMT` tag for its `FileKind`. Two entries compare `SAME_MODE` only
/// when both permissions and file type agree, so a directory and a
/// regular file sharing permission bits never get mistaken for each other
/// by the compaction.
fn wire_mode(entry: &FileEntry) -> u32 {
    let type_bits = match entry.kind() {
        FileKind::Regular => S_IFREG,
        FileKind::Directory => S_IFDIR,
        FileKind::Symlink { .. } => S_IFLNK,
        FileKind::Device { .. } => S_IFBLK,
        FileKind::Fifo => S_IFIFO,
        FileKind::Socket => S_IFSOCK,
    };
    (entry.mode() & 0o7777) | type_bits
}

/// Recovers the file-type tag from a decoded wire mode. Symlink and
/// Device carry trailing wire fields the caller still needs to fill in
/// (target bytes, major/minor); this only resolves the discriminant.
fn kind_from_wire_mode(mode: u32) -> FileKind {
    match mode & S_IFMT {
        S_IFDIR => FileKind::Directory,
        S_IFLNK => FileKind::Symlink { target: RawPath::new(Vec::new()) },
        S_IFBLK => FileKind::Device { major: 0, minor: 0 },
        S_IFIFO => FileKind::Fifo,
        S_IFSOCK => FileKind::Socket,
        _ => FileKind::Regular,
    }
}

/// Encodes `entry` relative to `prev`, compacting fields that match.
pub fn encode_entry(entry: &FileEntry, prev: Option<&FileEntry>, top_dir: bool) -> Vec<u8> {
    let name = entry.name().as_bytes();
    let prefix = prev.map_or(0, |p| common_prefix_len(p.name().as_bytes(), name));
    let suffix = &name[prefix..];
    let long_name = suffix.len() >= 256;

    let mut flags = TransmitFlags::empty();
    if top_dir {
        flags = flags.union(TransmitFlags::TOP_DIR);
    }
    if prefix > 0 {
        flags = flags.union(TransmitFlags::SAME_NAME);
    }
    if long_name {
        flags = flags.union(TransmitFlags::LONG_NAME);
    }
    if let Some(prev) = prev {
        if wire_mode(entry) == wire_mode(prev) {
            flags = flags.union(TransmitFlags::SAME_MODE);
        }
        if entry.uid().id == prev.uid().id {
            flags = flags.union(TransmitFlags::SAME_UID);
        }
        if entry.gid().id == prev.gid().id {
            flags = flags.union(TransmitFlags::SAME_GID);
        }
        if entry.mtime() == prev.mtime() {
            flags = flags.union(TransmitFlags::SAME_TIME);
        }
        if let (FileKind::Device { major: pm, .. }, FileKind::Device { major: m, .. }) =
            (prev.kind(), entry.kind())
        {
            if pm == m {
                flags = flags.union(TransmitFlags::SAME_RDEV_MAJOR);
            }
        }
    }
    if entry.uid().name.is_some() {
        flags = flags.union(TransmitFlags::USER_NAME_FOLLOWS);
    }
    if entry.gid().name.is_some() {
        flags = flags.union(TransmitFlags::GROUP_NAME_FOLLOWS);
    }
    if flags.low_byte() == 0 {
        flags = flags.union(TransmitFlags::EXTENDED_FLAGS);
    }
    if flags.high_byte() != 0 {
        flags = flags.union(TransmitFlags::EXTENDED_FLAGS);
    }

    let mut out = Vec::with_capacity(32 + suffix.len());
    out.push(flags.low_byte());
    if flags.contains(TransmitFlags::EXTENDED_FLAGS) {
        out.push(flags.high_byte());
    }

    if flags.contains(TransmitFlags::SAME_NAME) {
        out.push(prefix as u8);
    }
    if long_name {
        encode_int_to_vec(suffix.len() as i64, 1, &mut out);
    } else {
        out.push(suffix.len() as u8);
    }
    out.extend_from_slice(suffix);

    encode_int_to_vec(entry.size() as i64, 3, &mut out);
    if !flags.contains(TransmitFlags::SAME_TIME) {
        encode_int_to_vec(entry.mtime(), 4, &mut out);
    }
    if !flags.contains(TransmitFlags::SAME_MODE) {
        out.extend_from_slice(&wire_mode(entry).to_le_bytes());
    }
    if !flags.contains(TransmitFlags::SAME_UID) {
        encode_int_to_vec(i64::from(entry.uid().id), 1, &mut out);
    }
    if let Some(name) = &entry.uid().name {
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
    }
    if !flags.contains(TransmitFlags::SAME_GID) {
        encode_int_to_vec(i64::from(entry.gid().id), 1, &mut out);
    }
    if let Some(name) = &entry.gid().name {
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
    }

    match entry.kind() {
        FileKind::Device { major, minor } => {
            if !flags.contains(TransmitFlags::SAME_RDEV_MAJOR) {
                encode_int_to_vec(i64::from(*major), 1, &mut out);
            }
            encode_int_to_vec(i64::from(*minor), 1, &mut out);
        }
        FileKind::Symlink { target } => {
            let bytes = target.as_bytes();
            encode_int_to_vec(bytes.len() as i64, 1, &mut out);
            out.extend_from_slice(bytes);
        }
        _ => {}
    }

    out
}

/// Writes the zero-byte list terminator.
pub fn encode_done() -> Vec<u8> {
    vec![0]
}

/// Writes the `EXTENDED_FLAGS | IO_ERROR_ENDLIST` frame plus the error
/// code, used when the sender must abort an in-progress list.
pub fn encode_io_error_endlist(code: i32) -> Vec<u8> {
    let flags = TransmitFlags::EXTENDED_FLAGS.union(TransmitFlags::IO_ERROR_ENDLIST);
    let mut out = vec![flags.low_byte(), flags.high_byte()];
    encode_int_to_vec(i64::from(code), 1, &mut out);
    out
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut byte = [0u8; 1];
    reader
        .read_exact(&mut byte)
        .map_err(|err| FileListError::Transport(protocol::ProtocolError::Io(err)))?;
    Ok(byte[0])
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader
        .read_exact(buf)
        .map_err(|err| FileListError::Transport(protocol::ProtocolError::Io(err)))?;
    Ok(())
}

fn decode_item<R: Read>(reader: &mut R, prev: Option<&FileEntry>) -> Result<ListItem> {
    let low = read_u8(reader)?;
    if low == 0 {
        return Ok(ListItem::Done);
    }

    let high = if low & TransmitFlags::EXTENDED_FLAGS.low_byte() != 0 {
        read_u8(reader)?
    } else {
        0
    };
    let flags = TransmitFlags::from_bytes(low, high);

    if flags.contains(TransmitFlags::IO_ERROR_ENDLIST) {
        let code = decode_int(reader, 1).map_err(FileListError::Transport)?;
        return Ok(ListItem::IoError(code as i32));
    }

    let prefix = if flags.contains(TransmitFlags::SAME_NAME) {
        read_u8(reader)? as usize
    } else {
        0
    };
    let suffix_len = if flags.contains(TransmitFlags::LONG_NAME) {
        decode_int(reader, 1).map_err(FileListError::Transport)? as usize
    } else {
        read_u8(reader)? as usize
    };
    let mut name = Vec::with_capacity(prefix + suffix_len);
    if prefix > 0 {
        let prev_name = prev
            .ok_or(FileListError::Wire("SAME_NAME with no previous entry"))?
            .name()
            .as_bytes();
        if prefix > prev_name.len() {
            return Err(FileListError::Wire("SAME_NAME prefix longer than previous name"));
        }
        name.extend_from_slice(&prev_name[..prefix]);
    }
    let mut suffix = vec![0u8; suffix_len];
    read_exact(reader, &mut suffix)?;
    name.extend_from_slice(&suffix);

    let size = decode_int(reader, 3).map_err(FileListError::Transport)? as u64;
    let mtime = if flags.contains(TransmitFlags::SAME_TIME) {
        prev.ok_or(FileListError::Wire("SAME_TIME with no previous entry"))?.mtime()
    } else {
        decode_int(reader, 4).map_err(FileListError::Transport)?
    };
    let mode_word = if flags.contains(TransmitFlags::SAME_MODE) {
        wire_mode(prev.ok_or(FileListError::Wire("SAME_MODE with no previous entry"))?)
    } else {
        let mut raw = [0u8; 4];
        read_exact(reader, &mut raw)?;
        u32::from_le_bytes(raw)
    };
    let mode = mode_word & 0o7777;

    let uid = if flags.contains(TransmitFlags::SAME_UID) {
        prev.ok_or(FileListError::Wire("SAME_UID with no previous entry"))?.uid().id
    } else {
        decode_int(reader, 1).map_err(FileListError::Transport)? as u32
    };
    let uid_name = if flags.contains(TransmitFlags::USER_NAME_FOLLOWS) {
        Some(read_name(reader)?)
    } else {
        None
    };
    let gid = if flags.contains(TransmitFlags::SAME_GID) {
        prev.ok_or(FileListError::Wire("SAME_GID with no previous entry"))?.gid().id
    } else {
        decode_int(reader, 1).map_err(FileListError::Transport)? as u32
    };
    let gid_name = if flags.contains(TransmitFlags::GROUP_NAME_FOLLOWS) {
        Some(read_name(reader)?)
    } else {
        None
    };

    // The file type rides along in `mode_word`'s `S_IFMT` bits (see
    // `wire_mode`), so it survives `SAME_MODE` compaction the same way the
    // permission bits do. Device and symlink entries additionally carry
    // their own trailing fields, read here based on the type just decoded
    // rather than the previous entry's type.
    let kind = match kind_from_wire_mode(mode_word) {
        FileKind::Device { .. } => {
            let major = if flags.contains(TransmitFlags::SAME_RDEV_MAJOR) {
                prev.and_then(FileEntry::device)
                    .map(|(m, _)| m)
                    .ok_or(FileListError::Wire("SAME_RDEV_MAJOR with no previous device entry"))?
            } else {
                decode_int(reader, 1).map_err(FileListError::Transport)? as u32
            };
            let minor = decode_int(reader, 1).map_err(FileListError::Transport)? as u32;
            FileKind::Device { major, minor }
        }
        FileKind::Symlink { .. } => {
            let len = decode_int(reader, 1).map_err(FileListError::Transport)? as usize;
            let mut target = vec![0u8; len];
            read_exact(reader, &mut target)?;
            FileKind::Symlink { target: RawPath::new(target) }
        }
        other => other,
    };

    let entry = FileEntry::new(
        RawPath::new(name.clone()),
        RawPath::new(name),
        kind,
        mode,
        size,
        mtime,
        Principal::new(uid, uid_name)?,
        Principal::new(gid, gid_name)?,
    )?;
    Ok(ListItem::Entry(entry))
}

fn read_name<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_u8(reader)? as usize;
    let mut buf = vec![0u8; len];
    read_exact(reader, &mut buf)?;
    Ok(std::str::from_utf8(&buf)?.to_string())
}
