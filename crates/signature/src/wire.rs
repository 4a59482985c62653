//! Wire framing for a checksum header and its checksum pair stream.

use std::io::{Read, Write};

use protocol::ProtocolError;

use crate::error::{Result, SignatureError};
use crate::generate::ChecksumChunk;
use crate::layout::ChecksumHeader;

fn io_err(err: std::io::Error) -> SignatureError {
    SignatureError::Transport(ProtocolError::Io(err))
}

/// Writes the 16-byte checksum header: `chunk_count`, `block_length`,
/// `digest_length`, `remainder`, each a 32-bit little-endian integer.
pub fn encode_header<W: Write>(writer: &mut W, header: &ChecksumHeader) -> Result<()> {
    writer.write_all(&header.chunk_count().to_le_bytes()).map_err(io_err)?;
    writer.write_all(&header.block_length().to_le_bytes()).map_err(io_err)?;
    writer.write_all(&header.digest_length().to_le_bytes()).map_err(io_err)?;
    writer.write_all(&header.remainder().to_le_bytes()).map_err(io_err)?;
    Ok(())
}

/// Reads a checksum header. A header whose fields are all zero is the
/// `ZERO_SUM` sentinel for a missing or empty file.
pub fn decode_header<R: Read>(reader: &mut R) -> Result<ChecksumHeader> {
    let chunk_count = read_u32(reader)?;
    let block_length = read_u32(reader)?;
    let digest_length = read_u32(reader)?;
    let remainder = read_u32(reader)?;

    if block_length == 0 || chunk_count == 0 {
        return Ok(ChecksumHeader::zero_sum());
    }

    let full_chunks = chunk_count.saturating_sub(1);
    let file_length = u64::from(full_chunks) * u64::from(block_length) + u64::from(remainder);
    ChecksumHeader::new(block_length, digest_length, file_length)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(io_err)?;
    Ok(u32::from_le_bytes(buf))
}

/// Writes one checksum pair: a 32-bit little-endian rolling checksum
/// followed by the strong digest's bytes (already truncated to
/// `digest_length` by the caller).
pub fn encode_chunk<W: Write>(writer: &mut W, chunk: &ChecksumChunk) -> Result<()> {
    writer.write_all(&chunk.rolling.to_le_bytes()).map_err(io_err)?;
    writer.write_all(&chunk.strong).map_err(io_err)?;
    Ok(())
}

/// Reads one checksum pair, truncating the strong digest to `digest_length`.
pub fn decode_chunk<R: Read>(reader: &mut R, digest_length: u32) -> Result<ChecksumChunk> {
    let rolling = read_u32(reader)?;
    let mut strong = vec![0u8; digest_length as usize];
    reader.read_exact(&mut strong).map_err(io_err)?;
    Ok(ChecksumChunk { rolling, strong })
}

/// Writes `header` followed by all of `chunks`.
pub fn encode_signature<W: Write>(writer: &mut W, header: &ChecksumHeader, chunks: &[ChecksumChunk]) -> Result<()> {
    encode_header(writer, header)?;
    for chunk in chunks {
        encode_chunk(writer, chunk)?;
    }
    Ok(())
}

/// Reads a header and its full chunk table.
pub fn decode_signature<R: Read>(reader: &mut R) -> Result<(ChecksumHeader, Vec<ChecksumChunk>)> {
    let header = decode_header(reader)?;
    let mut chunks = Vec::with_capacity(header.chunk_count() as usize);
    for _ in 0..header.chunk_count() {
        chunks.push(decode_chunk(reader, header.digest_length())?);
    }
    Ok((header, chunks))
}
