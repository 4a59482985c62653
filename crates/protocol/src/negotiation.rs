//! Handshake: version banner, compatibility flags, and checksum seed.
//!
//! Negotiation happens once per connection, before either side's framing
//! channel ([`crate::multiplex`]) is in use — the banner and compat flags
//! are exchanged as raw bytes.

use crate::error::{ProtocolError, Result};
use std::io::Read;

/// Lowest major protocol version this implementation will negotiate down
/// to. Older peers are rejected outright rather than emulated.
pub const MIN_MAJOR_VERSION: u32 = 30;

/// The protocol version this implementation speaks natively.
pub const CURRENT_VERSION: ProtocolVersion = ProtocolVersion { major: 30, minor: 0 };

const BANNER_PREFIX: &str = "@RSYNCD: ";

/// A `major.minor` protocol version, as carried in the handshake banner.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
}

impl ProtocolVersion {
    /// Builds a version pair directly, without banner parsing.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Renders the handshake banner line for this version, including the
    /// trailing newline.
    pub fn to_banner(self) -> String {
        format!("{BANNER_PREFIX}{}.{}\n", self.major, self.minor)
    }

    /// Parses a banner line of the form `@RSYNCD: MAJOR.MINOR\n`.
    ///
    /// The trailing newline is optional on input; callers that read a
    /// line-buffered banner may strip it first.
    pub fn parse_banner(line: &str) -> Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let rest = line
            .strip_prefix(BANNER_PREFIX)
            .ok_or_else(|| ProtocolError::InvalidBanner(line.to_string()))?;

        let (major_str, minor_str) = rest
            .split_once('.')
            .ok_or_else(|| ProtocolError::InvalidBanner(line.to_string()))?;

        let major: u32 = major_str
            .parse()
            .map_err(|_| ProtocolError::InvalidBanner(line.to_string()))?;
        let minor: u32 = minor_str
            .parse()
            .map_err(|_| ProtocolError::InvalidBanner(line.to_string()))?;

        Ok(Self { major, minor })
    }
}

/// Longest banner line this implementation will scan for before giving up
/// — well beyond anything a real `MAJOR.MINOR` pair could produce.
const MAX_BANNER_LEN: usize = 256;

/// Reads a newline-terminated banner one byte at a time from `reader` and
/// parses it.
///
/// Byte-at-a-time reads are deliberate: the banner precedes any buffering
/// layer, and the peer may be a raw socket where over-reading would
/// consume bytes that belong to the next protocol stage.
pub fn read_banner<R: Read>(reader: &mut R) -> Result<ProtocolVersion> {
    let mut line = Vec::with_capacity(32);
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte).map_err(|err| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => ProtocolError::UnexpectedEof {
                context: "version banner",
            },
            _ => ProtocolError::Io(err),
        })?;
        if memchr::memchr(byte[0], b"\n").is_some() {
            break;
        }
        line.push(byte[0]);
        if line.len() > MAX_BANNER_LEN {
            return Err(ProtocolError::InvalidBanner(
                "banner exceeded maximum length without a newline".to_string(),
            ));
        }
    }
    let text = std::str::from_utf8(&line)
        .map_err(|_| ProtocolError::InvalidBanner("banner was not valid UTF-8".to_string()))?;
    ProtocolVersion::parse_banner(text)
}

/// Picks the protocol version both sides can speak, rejecting peers below
/// [`MIN_MAJOR_VERSION`].
pub fn negotiate_version(peer: ProtocolVersion) -> Result<ProtocolVersion> {
    if peer.major < MIN_MAJOR_VERSION {
        return Err(ProtocolError::InvalidBanner(format!(
            "peer offered protocol {}.{}, below the minimum supported major version {}",
            peer.major, peer.minor, MIN_MAJOR_VERSION
        )));
    }
    Ok(std::cmp::min(peer, CURRENT_VERSION))
}

/// Single-byte bitset of handshake compatibility flags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CompatFlags(u8);

impl CompatFlags {
    /// Peer supports incremental (streamed) file-list recursion.
    pub const INC_RECURSE: CompatFlags = CompatFlags(1 << 0);
    /// Peer preserves symlink mtimes.
    pub const SYMLINK_TIMES: CompatFlags = CompatFlags(1 << 1);
    /// Peer iconv-converts symlink targets.
    pub const SYMLINK_ICONV: CompatFlags = CompatFlags(1 << 2);
    /// Peer uses the safe (length-prefixed) file-list encoding. Required
    /// of both sides for protocol 30+.
    pub const SAFE_FLIST: CompatFlags = CompatFlags(1 << 3);

    /// The empty flag set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Reconstructs a flag set from its wire byte.
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// The wire byte for this flag set.
    pub const fn as_byte(self) -> u8 {
        self.0
    }

    /// Returns `true` if every bit set in `other` is also set in `self`.
    pub const fn contains(self, other: CompatFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    pub const fn union(self, other: CompatFlags) -> Self {
        Self(self.0 | other.0)
    }
}

/// Confirms both peers advertised the flags protocol 30+ requires of every
/// connection.
pub fn validate_compat_flags(local: CompatFlags, peer: CompatFlags) -> Result<()> {
    if !local.contains(CompatFlags::SAFE_FLIST) {
        return Err(ProtocolError::IncompatiblePeer(
            "local configuration did not set CF_SAFE_FLIST",
        ));
    }
    if !peer.contains(CompatFlags::SAFE_FLIST) {
        return Err(ProtocolError::IncompatiblePeer(
            "peer did not set CF_SAFE_FLIST",
        ));
    }
    Ok(())
}

/// Byte length of the wire-encoded checksum seed.
pub const CHECKSUM_SEED_LEN: usize = 4;

/// The per-session seed mixed into every rolling/strong checksum, exchanged
/// once during negotiation as a little-endian `i32`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ChecksumSeed(pub i32);

impl ChecksumSeed {
    /// Encodes the seed as little-endian wire bytes.
    pub const fn to_le_bytes(self) -> [u8; CHECKSUM_SEED_LEN] {
        self.0.to_le_bytes()
    }

    /// Decodes the seed from little-endian wire bytes.
    pub const fn from_le_bytes(bytes: [u8; CHECKSUM_SEED_LEN]) -> Self {
        Self(i32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_banner_parses_a_byte_stream() {
        let mut cursor = Cursor::new(b"@RSYNCD: 30.0\ntrailing".to_vec());
        let version = read_banner(&mut cursor).unwrap();
        assert_eq!(version, ProtocolVersion::new(30, 0));
        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"trailing");
    }

    #[test]
    fn read_banner_reports_truncated_stream() {
        let mut cursor = Cursor::new(b"@RSYNCD: 30.0".to_vec());
        let err = read_banner(&mut cursor).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedEof { .. }));
    }

    #[test]
    fn banner_round_trips() {
        let version = ProtocolVersion::new(30, 0);
        let banner = version.to_banner();
        assert_eq!(banner, "@RSYNCD: 30.0\n");
        assert_eq!(ProtocolVersion::parse_banner(&banner).unwrap(), version);
    }

    #[test]
    fn banner_parse_tolerates_missing_newline() {
        assert_eq!(
            ProtocolVersion::parse_banner("@RSYNCD: 31.2").unwrap(),
            ProtocolVersion::new(31, 2)
        );
    }

    #[test]
    fn banner_rejects_malformed_input() {
        assert!(ProtocolVersion::parse_banner("not a banner\n").is_err());
        assert!(ProtocolVersion::parse_banner("@RSYNCD: thirty.zero\n").is_err());
        assert!(ProtocolVersion::parse_banner("@RSYNCD: 30\n").is_err());
    }

    #[test]
    fn negotiate_rejects_old_peers() {
        let err = negotiate_version(ProtocolVersion::new(29, 0)).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidBanner(_)));
    }

    #[test]
    fn negotiate_picks_the_lower_of_two_supported_versions() {
        let chosen = negotiate_version(ProtocolVersion::new(31, 0)).unwrap();
        assert_eq!(chosen, CURRENT_VERSION);
    }

    #[test]
    fn compat_flags_union_and_contains() {
        let flags = CompatFlags::INC_RECURSE.union(CompatFlags::SAFE_FLIST);
        assert!(flags.contains(CompatFlags::SAFE_FLIST));
        assert!(flags.contains(CompatFlags::INC_RECURSE));
        assert!(!flags.contains(CompatFlags::SYMLINK_ICONV));
        assert_eq!(CompatFlags::from_byte(flags.as_byte()), flags);
    }

    #[test]
    fn validate_compat_flags_requires_safe_flist_on_both_sides() {
        let good = CompatFlags::SAFE_FLIST;
        let bad = CompatFlags::INC_RECURSE;
        assert!(validate_compat_flags(good, good).is_ok());
        assert!(validate_compat_flags(bad, good).is_err());
        assert!(validate_compat_flags(good, bad).is_err());
    }

    #[test]
    fn checksum_seed_round_trips() {
        let seed = ChecksumSeed(-123_456);
        assert_eq!(ChecksumSeed::from_le_bytes(seed.to_le_bytes()), seed);
    }
}
