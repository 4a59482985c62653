//! Derivation of the block/digest length pair a file's signature uses,
//! and the checksum header that carries them on the wire.

use crate::error::{Result, SignatureError};

/// Shortest strong-checksum prefix ever used for block comparison. Shorter
/// prefixes raise the odds of an undetected collision on large files; the
/// generator negotiates up from here when it wants stronger guarantees.
pub const MIN_DIGEST_LEN: u32 = 2;

/// Longest strong-checksum prefix: a full MD5 digest.
pub const MAX_DIGEST_LEN: u32 = 16;

/// Smallest block length ever chosen for a nonempty file.
pub const MIN_BLOCK_LEN: u32 = 512;

fn floor_pow2(value: u64) -> u64 {
    if value == 0 {
        0
    } else {
        1u64 << (63 - value.leading_zeros() as u64)
    }
}

/// Chooses the block length for a file of `file_size` bytes: `0` for an
/// empty file, otherwise `max(512, floor(sqrt(file_size))` rounded down
/// to a power of two`)`.
#[must_use]
pub fn block_length_for(file_size: u64) -> u32 {
    if file_size == 0 {
        return 0;
    }
    let sqrt_floor = (file_size as f64).sqrt().floor() as u64;
    let rounded = floor_pow2(sqrt_floor);
    u32::try_from(rounded.max(u64::from(MIN_BLOCK_LEN))).unwrap_or(u32::MAX)
}

/// Chooses the strong-checksum prefix length for a file of `file_size`
/// bytes given its `block_length`, clamped to `[MIN_DIGEST_LEN, 16]`.
#[must_use]
pub fn digest_length_for(file_size: u64, block_length: u32) -> u32 {
    if file_size == 0 || block_length == 0 {
        return 0;
    }
    let raw = (10.0 + 2.0 * (file_size as f64).log2() - (f64::from(block_length)).log2() - 24.0) / 8.0;
    let floored = raw.floor();
    if floored <= f64::from(MIN_DIGEST_LEN) {
        MIN_DIGEST_LEN
    } else if floored >= f64::from(MAX_DIGEST_LEN) {
        MAX_DIGEST_LEN
    } else {
        floored as u32
    }
}

/// The `(block_length, digest_length, file_length)` triple exchanged
/// before a file's checksum pairs, plus the fields derivable from it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChecksumHeader {
    block_length: u32,
    digest_length: u32,
    file_length: u64,
}

impl ChecksumHeader {
    /// Builds a header, validating the invariants from the data model.
    ///
    /// # Errors
    /// Returns [`SignatureError::InvalidHeader`] if `file_length == 0`
    /// without `block_length == digest_length == 0`, if `digest_length`
    /// falls outside `[MIN_DIGEST_LEN, 16]` for a nonempty file, or if
    /// `block_length` is nonzero but below [`MIN_BLOCK_LEN`].
    pub fn new(block_length: u32, digest_length: u32, file_length: u64) -> Result<Self> {
        if file_length == 0 {
            if block_length != 0 || digest_length != 0 {
                return Err(SignatureError::InvalidHeader(
                    "zero-length file must carry a zeroed checksum header",
                ));
            }
        } else {
            if digest_length < MIN_DIGEST_LEN || digest_length > MAX_DIGEST_LEN {
                return Err(SignatureError::InvalidHeader("digest_length out of range"));
            }
            if block_length != 0 && block_length < MIN_BLOCK_LEN {
                return Err(SignatureError::InvalidHeader("block_length below the 512-byte floor"));
            }
        }
        Ok(Self {
            block_length,
            digest_length,
            file_length,
        })
    }

    /// The zeroed header sent for empty or missing files (`ZERO_SUM`).
    #[must_use]
    pub const fn zero_sum() -> Self {
        Self {
            block_length: 0,
            digest_length: 0,
            file_length: 0,
        }
    }

    /// Derives the header a generator would send for a local file of
    /// `file_length` bytes, choosing block and digest length per the
    /// standard formulas.
    #[must_use]
    pub fn for_file_length(file_length: u64) -> Self {
        let block_length = block_length_for(file_length);
        let digest_length = digest_length_for(file_length, block_length);
        Self {
            block_length,
            digest_length,
            file_length,
        }
    }

    pub const fn block_length(&self) -> u32 {
        self.block_length
    }

    pub const fn digest_length(&self) -> u32 {
        self.digest_length
    }

    pub const fn file_length(&self) -> u64 {
        self.file_length
    }

    /// Number of chunks the file is divided into (`0` for an empty file).
    #[must_use]
    pub fn chunk_count(&self) -> u32 {
        if self.block_length == 0 {
            return 0;
        }
        let block = u64::from(self.block_length);
        (self.file_length.div_ceil(block)) as u32
    }

    /// Size in bytes of the last chunk (equal to `block_length` for a
    /// file whose length is an exact multiple of it).
    #[must_use]
    pub fn remainder(&self) -> u32 {
        if self.block_length == 0 {
            return 0;
        }
        let rem = (self.file_length % u64::from(self.block_length)) as u32;
        if rem == 0 {
            self.block_length
        } else {
            rem
        }
    }

    /// Size in bytes of the smallest chunk (identical to [`Self::remainder`]).
    #[must_use]
    pub fn smallest_chunk(&self) -> u32 {
        self.remainder()
    }

    /// Length in bytes of chunk `index` (`0`-based).
    #[must_use]
    pub fn chunk_len(&self, index: u32) -> u32 {
        if index + 1 == self.chunk_count() {
            self.remainder()
        } else {
            self.block_length
        }
    }
}
