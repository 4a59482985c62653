//! The token stream a delta matcher emits: literal byte runs interleaved
//! with references to matched blocks, terminated by a zero token.

use std::io::{self, Read, Write};

/// Literal chunks are capped at this many bytes; longer literal runs are
/// split into several frames.
pub const MAX_LITERAL_CHUNK: usize = 8192;

/// One unit of the delta token stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Token {
    /// `length` literal bytes follow immediately after this token.
    Literal(u32),
    /// A reference to chunk `index` of the peer's checksum table.
    Match(u32),
    /// No more tokens follow.
    End,
}

impl Token {
    fn to_i32(self) -> i32 {
        match self {
            Token::End => 0,
            Token::Literal(len) => len as i32,
            Token::Match(index) => -((index as i64 + 1) as i32),
        }
    }

    fn from_i32(value: i32) -> Self {
        match value.cmp(&0) {
            std::cmp::Ordering::Equal => Token::End,
            std::cmp::Ordering::Greater => Token::Literal(value as u32),
            std::cmp::Ordering::Less => Token::Match((-(value as i64) - 1) as u32),
        }
    }
}

/// Writes a single token (the little-endian i32 marker only; literal
/// payload bytes, if any, are the caller's responsibility).
pub fn write_token<W: Write>(writer: &mut W, token: Token) -> io::Result<()> {
    writer.write_all(&token.to_i32().to_le_bytes())
}

/// Reads a single token marker.
pub fn read_token<R: Read>(reader: &mut R) -> io::Result<Token> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(Token::from_i32(i32::from_le_bytes(buf)))
}

/// Writes `data` as one or more `Literal` tokens each followed by their
/// payload, chunked to [`MAX_LITERAL_CHUNK`]. Writes nothing for empty input.
pub fn write_literal<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    for chunk in data.chunks(MAX_LITERAL_CHUNK) {
        write_token(writer, Token::Literal(chunk.len() as u32))?;
        writer.write_all(chunk)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn end_token_round_trips() {
        let mut buf = Vec::new();
        write_token(&mut buf, Token::End).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_token(&mut cursor).unwrap(), Token::End);
    }

    #[test]
    fn match_token_encodes_negative_block_index_plus_one() {
        let mut buf = Vec::new();
        write_token(&mut buf, Token::Match(0)).unwrap();
        assert_eq!(i32::from_le_bytes(buf.clone().try_into().unwrap()), -1);
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_token(&mut cursor).unwrap(), Token::Match(0));
    }

    #[test]
    fn literal_longer_than_cap_is_split() {
        let data = vec![7u8; MAX_LITERAL_CHUNK + 10];
        let mut buf = Vec::new();
        write_literal(&mut buf, &data).unwrap();

        let mut cursor = Cursor::new(buf);
        let first = read_token(&mut cursor).unwrap();
        assert_eq!(first, Token::Literal(MAX_LITERAL_CHUNK as u32));
        let mut payload = vec![0u8; MAX_LITERAL_CHUNK];
        std::io::Read::read_exact(&mut cursor, &mut payload).unwrap();

        let second = read_token(&mut cursor).unwrap();
        assert_eq!(second, Token::Literal(10));
    }

    #[test]
    fn empty_literal_writes_nothing() {
        let mut buf = Vec::new();
        write_literal(&mut buf, &[]).unwrap();
        assert!(buf.is_empty());
    }
}
