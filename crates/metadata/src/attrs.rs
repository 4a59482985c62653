//! Reading and applying the local filesystem attributes a transfer cares
//! about: permission mode, mtime, uid/gid, and file type.

use std::path::Path;

use flist::{FileKind, RawPath};

use crate::error::{MetadataError, Result};

/// The attribute subset this workspace mirrors between peers, read
/// straight off a `stat`/`lstat` call rather than carried inside a
/// [`flist::FileEntry`] (which additionally names the file).
#[derive(Clone, Debug, PartialEq)]
pub struct LocalAttrs {
    pub kind: FileKind,
    pub mode: u32,
    pub size: u64,
    pub mtime: i64,
    pub uid: u32,
    pub gid: u32,
}

/// Which of [`LocalAttrs`]'s fields a receiver is asked to reproduce.
/// Mirrors the subset of `SessionOptions` relevant to attribute
/// application, kept local to avoid a dependency from `metadata` back
/// onto `engine`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AttrPreserveFlags {
    pub perms: bool,
    pub times: bool,
    pub owner: bool,
    pub group: bool,
}

#[cfg(unix)]
mod unix {
    use super::*;
    use filetime::FileTime;
    use rustix::fs::{AtFlags, FileType, Gid, Mode, Uid, CWD};

    pub fn read_local_attrs(path: &Path) -> Result<LocalAttrs> {
        let stat = rustix::fs::statat(CWD, path, AtFlags::SYMLINK_NOFOLLOW).map_err(|err| MetadataError::Stat {
            path: path.to_path_buf(),
            source: err.into(),
        })?;

        let file_type = FileType::from_raw_mode(stat.st_mode);
        let kind = match file_type {
            FileType::Directory => FileKind::Directory,
            FileType::Symlink => {
                let target = rustix::fs::readlinkat(CWD, path, Vec::new()).map_err(|err| MetadataError::ReadLink {
                    path: path.to_path_buf(),
                    source: err.into(),
                })?;
                FileKind::Symlink {
                    target: RawPath::new(target.into_bytes()),
                }
            }
            FileType::CharacterDevice | FileType::BlockDevice => {
                let rdev = u64::try_from(stat.st_rdev).map_err(|_| MetadataError::DeviceRange {
                    path: path.to_path_buf(),
                })?;
                FileKind::Device {
                    major: rustix::fs::major(rdev),
                    minor: rustix::fs::minor(rdev),
                }
            }
            FileType::Fifo => FileKind::Fifo,
            FileType::Socket => FileKind::Socket,
            _ => FileKind::Regular,
        };

        Ok(LocalAttrs {
            kind,
            mode: stat.st_mode & 0o7777,
            size: u64::try_from(stat.st_size).unwrap_or(0),
            mtime: i64::try_from(stat.st_mtime).unwrap_or(0).max(0),
            uid: stat.st_uid,
            gid: stat.st_gid,
        })
    }

    pub fn apply_attrs(path: &Path, attrs: &LocalAttrs, preserve: AttrPreserveFlags) -> Result<()> {
        let apply_err = |err: rustix::io::Errno| MetadataError::Apply {
            path: path.to_path_buf(),
            source: err.into(),
        };

        if preserve.perms {
            rustix::fs::chmodat(CWD, path, Mode::from_raw_mode(attrs.mode), AtFlags::empty())
                .map_err(apply_err)?;
        }
        if preserve.times {
            let mtime = FileTime::from_unix_time(attrs.mtime, 0);
            filetime::set_symlink_file_times(path, mtime, mtime).map_err(|err| MetadataError::Apply {
                path: path.to_path_buf(),
                source: err,
            })?;
        }
        if preserve.owner || preserve.group {
            let owner = preserve.owner.then(|| unsafe { Uid::from_raw(attrs.uid) });
            let group = preserve.group.then(|| unsafe { Gid::from_raw(attrs.gid) });
            rustix::fs::chownat(CWD, path, owner, group, AtFlags::SYMLINK_NOFOLLOW).map_err(apply_err)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
pub use unix::{apply_attrs, read_local_attrs};
