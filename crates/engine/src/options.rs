//! Session-wide configuration.
//!
//! A single record instead of a builder-with-setters: every field is
//! public and every combination is legal (option interaction is resolved
//! by the roles that read it, not by the struct itself).

use metadata::AttrPreserveFlags;

/// Which entries a sender walks and in what mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileSelection {
    /// Transfer only the named entries, not their directory contents.
    NonRecursive,
    /// Recurse into directories, expanding the whole tree up front.
    Recursive,
    /// Recurse incrementally: stub directories are expanded on demand as
    /// the peer requests them (`--recursive` without `--no-inc-recursive`).
    IncrementalRecursive,
}

/// All session-wide knobs the three roles consult. Mirrors the option
/// surface named in the CLI reference, minus anything resolved purely at
/// the transport layer (ports, TLS, charset negotiation).
#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    pub preserve_perms: bool,
    pub preserve_times: bool,
    pub preserve_user: bool,
    pub preserve_group: bool,
    pub preserve_links: bool,
    pub preserve_devices: bool,
    pub numeric_ids: bool,
    pub ignore_times: bool,
    pub defer_write: bool,
    pub list_only: bool,
    pub always_itemize: bool,
    pub safe_file_list: bool,
    pub interruptible: bool,
    pub delete: bool,
    pub file_selection: FileSelection,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            preserve_perms: false,
            preserve_times: false,
            preserve_user: false,
            preserve_group: false,
            preserve_links: false,
            preserve_devices: false,
            numeric_ids: false,
            ignore_times: false,
            defer_write: false,
            list_only: false,
            always_itemize: false,
            safe_file_list: true,
            interruptible: false,
            delete: false,
            file_selection: FileSelection::NonRecursive,
        }
    }
}

impl SessionOptions {
    /// The attribute-preservation subset [`metadata::apply_attrs`] needs.
    #[must_use]
    pub fn attr_preserve_flags(&self) -> AttrPreserveFlags {
        AttrPreserveFlags {
            perms: self.preserve_perms,
            times: self.preserve_times,
            owner: self.preserve_user,
            group: self.preserve_group,
        }
    }

    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        !matches!(self.file_selection, FileSelection::NonRecursive)
    }

    #[must_use]
    pub const fn is_incremental_recurse(&self) -> bool {
        matches!(self.file_selection, FileSelection::IncrementalRecursive)
    }
}
