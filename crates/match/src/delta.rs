//! The delta matcher: given a file and the peer's checksum table, emits a
//! token stream of literal runs and matched-block references.

use std::io::Write;

use checksums::{Md5, Md5Seed, RollingChecksum, StrongDigest};
use rustc_hash::FxHashMap;
use signature::{ChecksumChunk, ChecksumHeader};

use crate::error::Result;
use crate::token::{write_literal, write_token, Token};

/// Builds a rolling-value -> candidate chunk indices lookup table.
fn build_index(chunks: &[ChecksumChunk]) -> FxHashMap<u32, Vec<u32>> {
    let mut index: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
    for (i, chunk) in chunks.iter().enumerate() {
        index.entry(chunk.rolling).or_default().push(i as u32);
    }
    index
}

/// Among `candidates` whose declared length matches `window_len` and
/// whose strong checksum matches `window`, picks one per the
/// preferred-index tie-break: the index following `last_match`, else the
/// lowest index.
fn confirm_match(
    candidates: &[u32],
    chunks: &[ChecksumChunk],
    header: &ChecksumHeader,
    window: &[u8],
    seed: Md5Seed,
    last_match: Option<u32>,
) -> Option<u32> {
    let mut confirmed: Vec<u32> = Vec::new();
    for &idx in candidates {
        if header.chunk_len(idx) as usize != window.len() {
            continue;
        }
        let digest_len = chunks[idx as usize].strong.len();
        let mut strong = Md5::with_seed(seed);
        strong.update(window);
        let digest = strong.finalize();
        if digest[..digest_len] == chunks[idx as usize].strong[..] {
            confirmed.push(idx);
        }
    }
    if confirmed.is_empty() {
        return None;
    }
    if let Some(preferred) = last_match.and_then(|l| l.checked_add(1)) {
        if confirmed.contains(&preferred) {
            return Some(preferred);
        }
    }
    confirmed.into_iter().min()
}

/// Runs the delta matcher over `data` against `header`/`chunks`, writing
/// the resulting token stream (literal runs + match tokens + a
/// terminating zero token) to `out`.
///
/// Returns the MD5 digest of the whole file, seeded per `seed`, which the
/// caller sends to the receiver for end-to-end verification.
pub fn generate_delta<W: Write>(
    data: &[u8],
    header: &ChecksumHeader,
    chunks: &[ChecksumChunk],
    seed: Md5Seed,
    out: &mut W,
) -> Result<[u8; 16]> {
    if header.block_length() == 0 || chunks.is_empty() {
        return skip_match_send_data(data, seed, out);
    }

    let index = build_index(chunks);
    let block_len = header.block_length() as usize;
    let n = data.len();

    let mut mark = 0usize;
    let mut pos = 0usize;
    let mut last_match: Option<u32> = None;
    let mut window_len = block_len.min(n - pos);

    let mut rolling = RollingChecksum::new();
    if window_len > 0 {
        rolling.update(&data[pos..pos + window_len]);
    }

    while window_len > 0 {
        if let Some(candidates) = index.get(&rolling.value()) {
            let window = &data[pos..pos + window_len];
            if let Some(matched) = confirm_match(candidates, chunks, header, window, seed, last_match) {
                write_literal(out, &data[mark..pos])?;
                write_token(out, Token::Match(matched))?;

                mark = pos + window_len;
                pos = mark;
                last_match = Some(matched);
                if pos >= n {
                    break;
                }
                window_len = block_len.min(n - pos);
                if window_len == 0 {
                    break;
                }
                rolling = RollingChecksum::new();
                rolling.update(&data[pos..pos + window_len]);
                continue;
            }
        }

        if pos + window_len < n {
            let outgoing = data[pos];
            let incoming = data[pos + window_len];
            rolling.roll(outgoing, incoming).expect("window is nonempty while sliding");
            pos += 1;
        } else {
            break;
        }
    }

    write_literal(out, &data[mark..n])?;
    write_token(out, Token::End)?;

    Ok(Md5::digest_with_seed(seed, data))
}

/// The `--whole-file`-equivalent path taken when the peer's checksum
/// table is empty (new or zero-length destination file): the entire
/// source is sent as literal bytes, with no matching attempted.
pub fn skip_match_send_data<W: Write>(data: &[u8], seed: Md5Seed, out: &mut W) -> Result<[u8; 16]> {
    write_literal(out, data)?;
    write_token(out, Token::End)?;
    Ok(Md5::digest_with_seed(seed, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::read_token;
    use signature::generate::generate as generate_chunks;
    use std::io::Cursor;

    fn header_and_chunks(data: &[u8], seed: Md5Seed) -> (ChecksumHeader, Vec<ChecksumChunk>) {
        let header = ChecksumHeader::new(512, 16, data.len() as u64).unwrap();
        let mut reader = Cursor::new(data.to_vec());
        let chunks = generate_chunks(&mut reader, &header, seed).unwrap();
        (header, chunks)
    }

    #[test]
    fn identical_file_matches_every_block() {
        let data = vec![b'x'; 512 * 3];
        let seed = Md5Seed::proper(7);
        let (header, chunks) = header_and_chunks(&data, seed);

        let mut out = Vec::new();
        let digest = generate_delta(&data, &header, &chunks, seed, &mut out).unwrap();
        assert_eq!(digest, Md5::digest_with_seed(seed, &data));

        let mut cursor = Cursor::new(out);
        let mut matches = 0;
        loop {
            match read_token(&mut cursor).unwrap() {
                Token::Match(_) => matches += 1,
                Token::Literal(len) => {
                    let mut skip = vec![0u8; len as usize];
                    std::io::Read::read_exact(&mut cursor, &mut skip).unwrap();
                }
                Token::End => break,
            }
        }
        assert_eq!(matches, 3);
    }

    #[test]
    fn appended_tail_is_sent_literal() {
        let base = vec![b'y'; 512 * 2];
        let seed = Md5Seed::none();
        let (header, chunks) = header_and_chunks(&base, seed);

        let mut extended = base.clone();
        extended.extend_from_slice(b"tail-bytes");

        let mut out = Vec::new();
        generate_delta(&extended, &header, &chunks, seed, &mut out).unwrap();

        let mut cursor = Cursor::new(out);
        let mut saw_literal_tail = false;
        loop {
            match read_token(&mut cursor).unwrap() {
                Token::Match(_) => {}
                Token::Literal(len) => {
                    let mut buf = vec![0u8; len as usize];
                    std::io::Read::read_exact(&mut cursor, &mut buf).unwrap();
                    if buf == b"tail-bytes" {
                        saw_literal_tail = true;
                    }
                }
                Token::End => break,
            }
        }
        assert!(saw_literal_tail);
    }

    #[test]
    fn zero_block_length_sends_whole_file_as_literal() {
        let data = b"brand new file".to_vec();
        let seed = Md5Seed::none();
        let header = ChecksumHeader::zero_sum();
        let mut out = Vec::new();
        let digest = generate_delta(&data, &header, &[], seed, &mut out).unwrap();
        assert_eq!(digest, Md5::digest(&data));

        let mut cursor = Cursor::new(out);
        match read_token(&mut cursor).unwrap() {
            Token::Literal(len) => assert_eq!(len as usize, data.len()),
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn prefers_block_index_following_last_match() {
        // Two identical blocks mean the rolling+strong checksum for block
        // 0 and block 1 collide; after matching block 0 the tie-break
        // should prefer block 1 over re-using block 0.
        let data = vec![b'z'; 512 * 2];
        let seed = Md5Seed::none();
        let (header, chunks) = header_and_chunks(&data, seed);
        assert_eq!(chunks[0].rolling, chunks[1].rolling);

        let mut out = Vec::new();
        generate_delta(&data, &header, &chunks, seed, &mut out).unwrap();
        let mut cursor = Cursor::new(out);
        let first = read_token(&mut cursor).unwrap();
        let second = read_token(&mut cursor).unwrap();
        assert_eq!(first, Token::Match(0));
        assert_eq!(second, Token::Match(1));
    }
}
