//! Item flags: the 16-bit bitmask reported alongside an index that
//! combines transfer intent with attribute-change reporting.

use metadata::LocalAttrs;

use crate::options::SessionOptions;

/// A 16-bit bitmask over a file entry. Only the bits named here are
/// recognized; a frame carrying any other bit is a protocol violation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ItemFlags(u16);

impl ItemFlags {
    pub const NO_CHANGE: Self = Self(0);
    pub const REPORT_SIZE: Self = Self(1 << 2);
    pub const REPORT_TIME: Self = Self(1 << 3);
    pub const REPORT_PERMS: Self = Self(1 << 4);
    pub const REPORT_OWNER: Self = Self(1 << 5);
    pub const REPORT_GROUP: Self = Self(1 << 6);
    pub const IS_NEW: Self = Self(1 << 13);
    pub const LOCAL_CHANGE: Self = Self(1 << 14);
    pub const TRANSFER: Self = Self(1 << 15);

    const RECOGNIZED: u16 = Self::REPORT_SIZE.0
        | Self::REPORT_TIME.0
        | Self::REPORT_PERMS.0
        | Self::REPORT_OWNER.0
        | Self::REPORT_GROUP.0
        | Self::IS_NEW.0
        | Self::LOCAL_CHANGE.0
        | Self::TRANSFER.0;

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn from_u16(value: u16) -> Self {
        Self(value)
    }

    /// A frame is valid iff only recognized bits are set.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 & !Self::RECOGNIZED == 0
    }
}

/// Computes the attribute-change bits for an existing local entry
/// compared against the attributes the sender advertised, honoring which
/// attributes this session preserves.
#[must_use]
pub fn compute_itemize_flags(current: Option<&LocalAttrs>, target: &LocalAttrs, options: &SessionOptions) -> ItemFlags {
    let Some(current) = current else {
        return ItemFlags::IS_NEW;
    };

    let mut flags = ItemFlags::empty();
    if options.preserve_perms && current.mode != target.mode {
        flags = flags.union(ItemFlags::REPORT_PERMS);
    }
    if options.preserve_times && current.mtime != target.mtime {
        flags = flags.union(ItemFlags::REPORT_TIME);
    }
    if options.preserve_user && current.uid != target.uid {
        flags = flags.union(ItemFlags::REPORT_OWNER);
    }
    if options.preserve_group && current.gid != target.gid {
        flags = flags.union(ItemFlags::REPORT_GROUP);
    }
    if matches!(target.kind, flist::FileKind::Regular) && current.size != target.size {
        flags = flags.union(ItemFlags::REPORT_SIZE);
    }
    flags
}
