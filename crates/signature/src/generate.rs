//! Computation of a file's per-block checksum chunks.

use std::io::{self, Read};

use checksums::{Md5, Md5Seed, RollingChecksum, StrongDigest};

use crate::layout::ChecksumHeader;

/// One block's rolling and strong checksum pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChecksumChunk {
    pub rolling: u32,
    pub strong: Vec<u8>,
}

/// Reads `reader` block-by-block according to `header`'s layout and
/// returns the rolling/strong checksum pair for each block.
///
/// The strong checksum is MD5 over the block bytes mixed with `seed`
/// (proper order, per protocol 30), truncated to `header.digest_length()`.
///
/// With the `parallel` feature enabled, files with enough blocks
/// (`checksums::parallel::PARALLEL_BLOCK_THRESHOLD` or more) have their
/// per-block checksums computed across threads via `rayon`, since each
/// block's checksum is independent of its neighbours. Reading from
/// `reader` itself always happens sequentially first.
pub fn generate<R: Read>(
    reader: &mut R,
    header: &ChecksumHeader,
    seed: Md5Seed,
) -> io::Result<Vec<ChecksumChunk>> {
    let chunk_count = header.chunk_count();
    let digest_len = header.digest_length() as usize;

    #[cfg(feature = "parallel")]
    {
        let mut blocks = Vec::with_capacity(chunk_count as usize);
        for index in 0..chunk_count {
            let len = header.chunk_len(index) as usize;
            let mut block = vec![0u8; len];
            reader.read_exact(&mut block)?;
            blocks.push(block);
        }

        if blocks.len() >= checksums::parallel::PARALLEL_BLOCK_THRESHOLD {
            let signatures = checksums::parallel::compute_block_signatures_parallel::<Md5, _>(&blocks, seed);
            return Ok(signatures
                .into_iter()
                .map(|sig| ChecksumChunk {
                    rolling: sig.rolling,
                    strong: sig.strong[..digest_len].to_vec(),
                })
                .collect());
        }

        return Ok(blocks
            .iter()
            .map(|block| sequential_chunk(block, seed, digest_len))
            .collect());
    }

    #[cfg(not(feature = "parallel"))]
    {
        let mut chunks = Vec::with_capacity(chunk_count as usize);
        let mut block = vec![0u8; header.block_length().max(1) as usize];
        for index in 0..chunk_count {
            let len = header.chunk_len(index) as usize;
            let buf = &mut block[..len];
            reader.read_exact(buf)?;
            chunks.push(sequential_chunk(buf, seed, digest_len));
        }
        Ok(chunks)
    }
}

fn sequential_chunk(buf: &[u8], seed: Md5Seed, digest_len: usize) -> ChecksumChunk {
    let mut rolling = RollingChecksum::new();
    rolling.update_from_block(buf);

    let mut strong = Md5::with_seed(seed);
    strong.update(buf);
    let digest = strong.finalize();

    ChecksumChunk {
        rolling: rolling.value(),
        strong: digest[..digest_len].to_vec(),
    }
}
