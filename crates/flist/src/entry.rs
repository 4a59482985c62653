//! [`FileEntry`]: one filesystem object participating in a transfer.

use crate::error::{FileListError, Result};

/// The largest legal uid/gid. `u32::MAX` is reserved (mirrors the
/// upstream "nobody" sentinel) and therefore excluded.
pub const MAX_ID: u32 = u32::MAX - 1;

/// A file name or path, carried as the raw bytes the peer sent — never
/// silently decoded as UTF-8, since POSIX filenames are not guaranteed to
/// be valid text in any particular encoding.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RawPath(Vec<u8>);

impl RawPath {
    /// Wraps raw path bytes verbatim.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Interprets the raw bytes as a platform path, for local filesystem
    /// calls. On Unix this is a lossless reinterpretation; on other
    /// platforms invalid sequences are replaced.
    pub fn as_path(&self) -> std::borrow::Cow<'_, std::path::Path> {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStrExt;
            std::borrow::Cow::Borrowed(std::path::Path::new(std::ffi::OsStr::from_bytes(&self.0)))
        }
        #[cfg(not(unix))]
        {
            std::borrow::Cow::Owned(std::path::PathBuf::from(String::from_utf8_lossy(&self.0).into_owned()))
        }
    }
}

impl From<&std::path::Path> for RawPath {
    fn from(path: &std::path::Path) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStrExt;
            Self(path.as_os_str().as_bytes().to_vec())
        }
        #[cfg(not(unix))]
        {
            Self(path.to_string_lossy().into_owned().into_bytes())
        }
    }
}

/// A named security principal: a numeric id plus an optional resolved
/// name, sent over the wire only when the peer requests names.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Principal {
    pub id: u32,
    pub name: Option<String>,
}

impl Principal {
    /// Builds a principal, rejecting the reserved `u32::MAX` id.
    pub fn new(id: u32, name: Option<String>) -> Result<Self> {
        if id > MAX_ID {
            return Err(FileListError::IndexInvariant(
                "uid/gid must not equal the reserved sentinel u32::MAX",
            ));
        }
        Ok(Self { id, name })
    }
}

/// The file-type-specific payload of a [`FileEntry`], replacing the
/// inheritance hierarchy (`FileEntry -> DeviceInfo, SymlinkInfo`) the
/// original model used.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink { target: RawPath },
    Device { major: u32, minor: u32 },
    Fifo,
    Socket,
}

impl FileKind {
    /// Transmit-flag bit this kind maps to when deciding which optional
    /// fields follow a file-list entry on the wire (devices and symlinks
    /// both carry trailing fields; regular files and directories don't).
    pub fn carries_trailing_field(&self) -> bool {
        matches!(self, FileKind::Symlink { .. } | FileKind::Device { .. })
    }
}

/// One filesystem object participating in a transfer.
#[derive(Clone, Debug, PartialEq)]
pub struct FileEntry {
    name: RawPath,
    relative_path: RawPath,
    kind: FileKind,
    mode: u32,
    size: u64,
    mtime: i64,
    uid: Principal,
    gid: Principal,
}

impl FileEntry {
    /// Builds a `FileEntry`, enforcing the invariants from the data model:
    /// `size >= 0`, `mtime >= 0`, uid/gid within range, and regular files
    /// carrying no symlink target.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: RawPath,
        relative_path: RawPath,
        kind: FileKind,
        mode: u32,
        size: u64,
        mtime: i64,
        uid: Principal,
        gid: Principal,
    ) -> Result<Self> {
        if mtime < 0 {
            return Err(FileListError::IndexInvariant("mtime must be >= 0"));
        }
        if matches!(kind, FileKind::Regular) && size == 0 {
            // zero-length regular files are legal; nothing to validate here,
            // kept as an explicit branch to document the empty-file case.
        }
        Ok(Self {
            name,
            relative_path,
            kind,
            mode,
            size,
            mtime,
            uid,
            gid,
        })
    }

    pub fn name(&self) -> &RawPath {
        &self.name
    }

    pub fn relative_path(&self) -> &RawPath {
        &self.relative_path
    }

    pub fn kind(&self) -> &FileKind {
        &self.kind
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mtime(&self) -> i64 {
        self.mtime
    }

    pub fn uid(&self) -> &Principal {
        &self.uid
    }

    pub fn gid(&self) -> &Principal {
        &self.gid
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, FileKind::Directory)
    }

    pub fn is_regular(&self) -> bool {
        matches!(self.kind, FileKind::Regular)
    }

    pub fn symlink_target(&self) -> Option<&RawPath> {
        match &self.kind {
            FileKind::Symlink { target } => Some(target),
            _ => None,
        }
    }

    pub fn device(&self) -> Option<(u32, u32)> {
        match self.kind {
            FileKind::Device { major, minor } => Some((major, minor)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: u32) -> Principal {
        Principal::new(id, None).unwrap()
    }

    #[test]
    fn rejects_negative_mtime() {
        let err = FileEntry::new(
            RawPath::new(*b"a"),
            RawPath::new(*b"a"),
            FileKind::Regular,
            0o644,
            0,
            -1,
            principal(0),
            principal(0),
        )
        .unwrap_err();
        assert!(matches!(err, FileListError::IndexInvariant(_)));
    }

    #[test]
    fn rejects_reserved_principal_id() {
        assert!(Principal::new(u32::MAX, None).is_err());
        assert!(Principal::new(MAX_ID, None).is_ok());
    }

    #[test]
    fn raw_path_round_trips_through_local_path() {
        let path = std::path::Path::new("dir/name.txt");
        let raw = RawPath::from(path);
        assert_eq!(raw.as_path().as_ref(), path);
    }

    #[test]
    fn symlink_kind_carries_trailing_field() {
        let kind = FileKind::Symlink {
            target: RawPath::new(*b"target"),
        };
        assert!(kind.carries_trailing_field());
        assert!(!FileKind::Regular.carries_trailing_field());
    }
}
