use digest::Digest;

use super::StrongDigest;

/// Session checksum seed mixed into an MD5 digest.
///
/// Upstream rsync mixes the 32-bit checksum seed exchanged during the
/// handshake into every strong checksum. Protocol >= 27 writes the seed
/// into the digest context before any block data (`proper_order`); older
/// peers appended it after the data instead. Protocol 30 always uses the
/// proper order, but both are kept so callers that need to interoperate
/// with older behaviour (or disable seeding entirely) have a single type
/// to reach for.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Md5Seed {
    pub(crate) value: Option<i32>,
    pub(crate) proper_order: bool,
}

impl Md5Seed {
    /// No seed: digests behave like plain MD5.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            value: None,
            proper_order: true,
        }
    }

    /// Seed written before the data (protocol >= 27 behaviour).
    #[must_use]
    pub const fn proper(seed: i32) -> Self {
        Self {
            value: Some(seed),
            proper_order: true,
        }
    }

    /// Seed written after the data (pre-27 legacy behaviour).
    #[must_use]
    pub const fn legacy(seed: i32) -> Self {
        Self {
            value: Some(seed),
            proper_order: false,
        }
    }
}

/// Streaming MD5 hasher used by rsync for the strong per-block checksum.
#[derive(Clone, Debug)]
pub struct Md5 {
    inner: md5::Md5,
    trailing_seed: Option<i32>,
}

impl Default for Md5 {
    fn default() -> Self {
        Self::new()
    }
}

impl Md5 {
    /// Creates a hasher with an empty state and no seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: md5::Md5::new(),
            trailing_seed: None,
        }
    }

    /// Creates a hasher seeded per [`Md5Seed`].
    #[must_use]
    pub fn with_seed(seed: Md5Seed) -> Self {
        let mut hasher = Self::new();
        match seed {
            Md5Seed {
                value: Some(v),
                proper_order: true,
            } => hasher.inner.update(v.to_le_bytes()),
            Md5Seed {
                value: Some(v),
                proper_order: false,
            } => hasher.trailing_seed = Some(v),
            Md5Seed { value: None, .. } => {}
        }
        hasher
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the 128-bit MD5 output.
    #[must_use]
    pub fn finalize(mut self) -> [u8; 16] {
        if let Some(v) = self.trailing_seed.take() {
            self.inner.update(v.to_le_bytes());
        }
        self.inner.finalize().into()
    }

    /// Convenience helper that computes the MD5 digest for `data` in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; 16] {
        <Self as StrongDigest>::digest(data)
    }
}

impl StrongDigest for Md5 {
    type Seed = Md5Seed;
    type Digest = [u8; 16];
    const DIGEST_LEN: usize = 16;

    fn with_seed(seed: Self::Seed) -> Self {
        Md5::with_seed(seed)
    }

    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn finalize(self) -> Self::Digest {
        Md5::finalize(self)
    }
}
