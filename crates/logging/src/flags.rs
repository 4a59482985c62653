//! Named `INFO_*`/`DEBUG_*` flags and their per-`-v` level thresholds.
//!
//! The level tables below mirror upstream rsync's `-v`/`-vv`/`-vvv` ramp:
//! each `-v` both raises the ceiling of flags already enabled and turns on
//! a new batch of them. `from_verbose_level` is the single place that
//! encodes the ramp so the rest of the engine only ever asks "is this flag
//! enabled at this level" through [`VerbosityConfig::info_enabled`] /
//! [`VerbosityConfig::debug_enabled`].

/// Named `INFO_*` categories a message can belong to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum InfoFlag {
    /// Non-regular files skipped or noted (always on, even at `--quiet`).
    Nonreg,
    /// Per-file copy/transfer announcements.
    Copy,
    /// Per-file deletion announcements.
    Del,
    /// File-list build progress.
    Flist,
    /// Miscellaneous informational notes.
    Misc,
    /// Per-file name output (the itemize/verbose listing).
    Name,
    /// End-of-session statistics.
    Stats,
    /// Symlink safety notes.
    Symsafe,
    /// Backup-file creation notes.
    Backup,
    /// Mount-point crossing notes.
    Mount,
    /// Source-file removal notes (`--remove-source-files`).
    Remove,
    /// Skipped-file notes.
    Skip,
}

impl InfoFlag {
    /// Name used in log events and CLI `--info=NAME` parsing.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nonreg => "nonreg",
            Self::Copy => "copy",
            Self::Del => "del",
            Self::Flist => "flist",
            Self::Misc => "misc",
            Self::Name => "name",
            Self::Stats => "stats",
            Self::Symsafe => "symsafe",
            Self::Backup => "backup",
            Self::Mount => "mount",
            Self::Remove => "remove",
            Self::Skip => "skip",
        }
    }
}

/// Named `DEBUG_*` categories a message can belong to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum DebugFlag {
    /// Socket bind diagnostics.
    Bind,
    /// Remote-shell command line construction.
    Cmd,
    /// Connection setup diagnostics.
    Connect,
    /// Deletion bookkeeping.
    Del,
    /// Delta-matching / checksum computation.
    Deltasum,
    /// Duplicate file-list entry detection.
    Dup,
    /// Filter-rule evaluation.
    Filter,
    /// File-list construction internals.
    Flist,
    /// Character-set conversion.
    Iconv,
    /// Receiver internals.
    Recv,
    /// Sender internals.
    Send,
    /// Process exit / teardown diagnostics.
    Exit,
    /// ACL handling.
    Acl,
    /// Backup-file handling internals.
    Backup,
    /// Fuzzy-match candidate search.
    Fuzzy,
    /// Generator internals.
    Genr,
    /// Ownership (uid/gid) mapping.
    Own,
    /// Timestamp comparison/preservation.
    Time,
}

impl DebugFlag {
    /// Name used in log events and CLI `--debug=NAME` parsing.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bind => "bind",
            Self::Cmd => "cmd",
            Self::Connect => "connect",
            Self::Del => "del",
            Self::Deltasum => "deltasum",
            Self::Dup => "dup",
            Self::Filter => "filter",
            Self::Flist => "flist",
            Self::Iconv => "iconv",
            Self::Recv => "recv",
            Self::Send => "send",
            Self::Exit => "exit",
            Self::Acl => "acl",
            Self::Backup => "backup",
            Self::Fuzzy => "fuzzy",
            Self::Genr => "genr",
            Self::Own => "own",
            Self::Time => "time",
        }
    }
}

/// Per-category verbosity ceiling: a message at flag `F` and level `L` is
/// shown iff the configured level for `F` is `>= L`. Zero means disabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InfoLevels {
    pub nonreg: u8,
    pub copy: u8,
    pub del: u8,
    pub flist: u8,
    pub misc: u8,
    pub name: u8,
    pub stats: u8,
    pub symsafe: u8,
    pub backup: u8,
    pub mount: u8,
    pub remove: u8,
    pub skip: u8,
}

/// Per-category verbosity ceiling for `DEBUG_*` output. See [`InfoLevels`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugLevels {
    pub bind: u8,
    pub cmd: u8,
    pub connect: u8,
    pub del: u8,
    pub deltasum: u8,
    pub dup: u8,
    pub filter: u8,
    pub flist: u8,
    pub iconv: u8,
    pub recv: u8,
    pub send: u8,
    pub exit: u8,
    pub acl: u8,
    pub backup: u8,
    pub fuzzy: u8,
    pub genr: u8,
    pub own: u8,
    pub time: u8,
}

/// The resolved verbosity configuration passed to a [`crate::Logger`].
///
/// Build one from a `-v` count with [`Self::from_verbose_level`], or tune
/// individual fields by hand (the `--info=`/`--debug=` CLI surface maps
/// onto the same struct one field at a time).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerbosityConfig {
    pub info: InfoLevels,
    pub debug: DebugLevels,
}

impl VerbosityConfig {
    /// Derives a configuration from a `-v` repeat count (0 = `--quiet`).
    ///
    /// Mirrors upstream rsync's `set_output_verbosity`: nonreg warnings are
    /// always on; level 1 turns on the everyday info categories; level 2
    /// adds the "enhanced" info categories plus the first tier of debug
    /// output; level 3 and beyond raise debug categories one tier at a
    /// time and widen the debug vocabulary.
    #[must_use]
    pub fn from_verbose_level(level: u8) -> Self {
        let mut cfg = Self::default();
        cfg.info.nonreg = 1;

        if level >= 1 {
            cfg.info.copy = 1;
            cfg.info.del = 1;
            cfg.info.flist = 1;
            cfg.info.misc = 1;
            cfg.info.name = 1;
            cfg.info.stats = 1;
            cfg.info.symsafe = 1;
        }

        if level >= 2 {
            cfg.info.misc = 2;
            cfg.info.name = 2;
            cfg.info.backup = 1;
            cfg.info.mount = 1;
            cfg.info.remove = 1;
            cfg.info.skip = 1;

            cfg.debug.bind = 1;
            cfg.debug.cmd = 1;
            cfg.debug.connect = 1;
            cfg.debug.del = 1;
            cfg.debug.deltasum = 1;
            cfg.debug.dup = 1;
            cfg.debug.filter = 1;
            cfg.debug.flist = 1;
            cfg.debug.iconv = 1;
        }

        if level >= 3 {
            cfg.debug.connect = 2;
            cfg.debug.del = 2;
            cfg.debug.deltasum = 2;
            cfg.debug.filter = 2;
            cfg.debug.flist = 2;
            cfg.debug.exit = 1;
            cfg.debug.acl = 1;
            cfg.debug.backup = 1;
            cfg.debug.fuzzy = 1;
            cfg.debug.genr = 1;
            cfg.debug.own = 1;
            cfg.debug.recv = 1;
            cfg.debug.send = 1;
            cfg.debug.time = 1;
        }

        if level >= 4 {
            cfg.debug.deltasum = 3;
        }

        if level >= 5 {
            cfg.debug.deltasum = 4;
        }

        cfg
    }

    /// Returns `true` if `flag` is configured to show at `level` or above.
    #[must_use]
    pub fn info_enabled(&self, flag: InfoFlag, level: u8) -> bool {
        let ceiling = match flag {
            InfoFlag::Nonreg => self.info.nonreg,
            InfoFlag::Copy => self.info.copy,
            InfoFlag::Del => self.info.del,
            InfoFlag::Flist => self.info.flist,
            InfoFlag::Misc => self.info.misc,
            InfoFlag::Name => self.info.name,
            InfoFlag::Stats => self.info.stats,
            InfoFlag::Symsafe => self.info.symsafe,
            InfoFlag::Backup => self.info.backup,
            InfoFlag::Mount => self.info.mount,
            InfoFlag::Remove => self.info.remove,
            InfoFlag::Skip => self.info.skip,
        };
        level >= 1 && ceiling >= level
    }

    /// Returns `true` if `flag` is configured to show at `level` or above.
    #[must_use]
    pub fn debug_enabled(&self, flag: DebugFlag, level: u8) -> bool {
        let ceiling = match flag {
            DebugFlag::Bind => self.debug.bind,
            DebugFlag::Cmd => self.debug.cmd,
            DebugFlag::Connect => self.debug.connect,
            DebugFlag::Del => self.debug.del,
            DebugFlag::Deltasum => self.debug.deltasum,
            DebugFlag::Dup => self.debug.dup,
            DebugFlag::Filter => self.debug.filter,
            DebugFlag::Flist => self.debug.flist,
            DebugFlag::Iconv => self.debug.iconv,
            DebugFlag::Recv => self.debug.recv,
            DebugFlag::Send => self.debug.send,
            DebugFlag::Exit => self.debug.exit,
            DebugFlag::Acl => self.debug.acl,
            DebugFlag::Backup => self.debug.backup,
            DebugFlag::Fuzzy => self.debug.fuzzy,
            DebugFlag::Genr => self.debug.genr,
            DebugFlag::Own => self.debug.own,
            DebugFlag::Time => self.debug.time,
        };
        level >= 1 && ceiling >= level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_zero_is_quiet_but_for_nonreg() {
        let cfg = VerbosityConfig::from_verbose_level(0);
        assert_eq!(cfg.info.nonreg, 1);
        assert_eq!(cfg.info.copy, 0);
        assert_eq!(cfg.debug.recv, 0);
    }

    #[test]
    fn level_one_enables_basic_info_only() {
        let cfg = VerbosityConfig::from_verbose_level(1);
        assert_eq!(cfg.info.name, 1);
        assert_eq!(cfg.info.backup, 0);
        assert_eq!(cfg.debug.recv, 0);
    }

    #[test]
    fn level_two_enables_enhanced_info_and_basic_debug() {
        let cfg = VerbosityConfig::from_verbose_level(2);
        assert_eq!(cfg.info.name, 2);
        assert_eq!(cfg.info.backup, 1);
        assert_eq!(cfg.debug.deltasum, 1);
    }

    #[test]
    fn levels_are_monotonic_per_flag() {
        let levels: Vec<_> = (0..=5).map(VerbosityConfig::from_verbose_level).collect();
        for pair in levels.windows(2) {
            assert!(pair[1].info.name >= pair[0].info.name);
            assert!(pair[1].debug.deltasum >= pair[0].debug.deltasum);
        }
    }

    #[test]
    fn info_enabled_respects_message_level() {
        let cfg = VerbosityConfig::from_verbose_level(2);
        assert!(cfg.info_enabled(InfoFlag::Name, 1));
        assert!(cfg.info_enabled(InfoFlag::Name, 2));
        assert!(!cfg.info_enabled(InfoFlag::Name, 3));
    }
}
