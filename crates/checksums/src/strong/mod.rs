//! Strong checksum support for delta verification.
//!
//! Protocol 30 uses MD5 as the strong per-block and whole-file checksum,
//! mixed with the session checksum seed exchanged during the handshake.
//! This module exposes a streaming wrapper plus the [`StrongDigest`] trait
//! so the matcher and generator can talk about "the strong checksum"
//! without hard-coding the algorithm.

mod md5;

pub use md5::{Md5, Md5Seed};

/// Trait implemented by strong checksum algorithms used by rsync.
///
/// Implementors provide a streaming interface that mirrors upstream rsync's
/// usage: callers feed data incrementally via [`Self::update`] and then
/// obtain the final digest through [`Self::finalize`].
pub trait StrongDigest: Sized {
    /// Type used to parameterise a new digest instance.
    type Seed: Default;

    /// Type returned when finalising the digest.
    type Digest: AsRef<[u8]> + Copy;

    /// Length of the final digest in bytes.
    const DIGEST_LEN: usize;

    /// Creates a new hasher with an empty state.
    fn new() -> Self {
        Self::with_seed(Default::default())
    }

    /// Creates a new hasher using the provided seed value.
    fn with_seed(seed: Self::Seed) -> Self;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest and returns the resulting hash.
    fn finalize(self) -> Self::Digest;

    /// Convenience helper that hashes `data` in a single call.
    fn digest(data: &[u8]) -> Self::Digest {
        Self::digest_with_seed(Default::default(), data)
    }

    /// Convenience helper that hashes `data` using an explicit seed value.
    fn digest_with_seed(seed: Self::Seed, data: &[u8]) -> Self::Digest {
        let mut hasher = Self::with_seed(seed);
        hasher.update(data);
        hasher.finalize()
    }
}
