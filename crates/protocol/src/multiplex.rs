//! The duplex framing channel: a buffered multiplexing writer and a
//! prefetching, demultiplexing reader.
//!
//! Each endpoint of the channel has single-threaded access per direction.
//! The writer accumulates data bytes into an 8 KiB buffer and only emits a
//! `Data` frame when the buffer fills or [`FramedWriter::flush`] is
//! called explicitly — flush is cooperative, driven by whichever role
//! just drained its job queue, not by every write. The reader transparently
//! absorbs interleaved control frames: whenever it encounters a non-`Data`
//! tag while looking for bytes, it decodes the full [`Message`] and hands
//! it to the caller-supplied handler instead of returning those bytes to
//! the data consumer.

use crate::envelope::{Message, MessageCode, MessageHeader, HEADER_LEN};
use crate::error::{ProtocolError, Result};
use std::io::{BufReader, Read, Write};

const OUTPUT_BUFFER_CAP: usize = 8192;

/// Buffers and tags outgoing bytes as multiplexed `Data` frames.
pub struct FramedWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
    bytes_written: u64,
}

impl<W: Write> FramedWriter<W> {
    /// Wraps `inner` with an empty 8 KiB output buffer.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(OUTPUT_BUFFER_CAP),
            bytes_written: 0,
        }
    }

    /// Buffers `bytes` for transmission as one or more `Data` frames,
    /// flushing whenever the buffer fills.
    pub fn write_data(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            let room = OUTPUT_BUFFER_CAP.saturating_sub(self.buffer.len());
            if room == 0 {
                self.flush_buffer()?;
                continue;
            }
            let take = room.min(bytes.len());
            self.buffer.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
        }
        Ok(())
    }

    /// Flushes any buffered data, then writes `message` as its own frame.
    ///
    /// Control messages always interrupt the data buffer so the peer sees
    /// them in the order they were issued relative to surrounding data.
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        self.flush_buffer()?;
        let header = MessageHeader::new(message.code(), message.payload().len() as u32)?;
        self.inner.write_all(&header.encode())?;
        self.inner.write_all(message.payload())?;
        self.bytes_written += HEADER_LEN as u64 + message.payload().len() as u64;
        Ok(())
    }

    /// Flushes buffered data and the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buffer()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Total bytes written to the underlying stream so far, including
    /// frame headers.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let header = MessageHeader::new(MessageCode::Data, self.buffer.len() as u32)?;
        self.inner.write_all(&header.encode())?;
        self.inner.write_all(&self.buffer)?;
        self.bytes_written += HEADER_LEN as u64 + self.buffer.len() as u64;
        #[cfg(feature = "tracing")]
        tracing::trace!(bytes = self.buffer.len(), "flushed data frame");
        self.buffer.clear();
        Ok(())
    }
}

/// Demultiplexes an incoming byte stream, exposing only `Data` payloads to
/// the caller while routing everything else through a handler.
pub struct FramedReader<R: Read> {
    inner: BufReader<R>,
    pending_data: u32,
    bytes_read: u64,
}

impl<R: Read> FramedReader<R> {
    /// Wraps `inner` in a prefetching buffered reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(OUTPUT_BUFFER_CAP, inner),
            pending_data: 0,
            bytes_read: 0,
        }
    }

    /// Reads up to `buf.len()` data bytes, dispatching any control frames
    /// encountered along the way to `handler`.
    ///
    /// Returns `0` only if `buf` is empty; otherwise blocks until at least
    /// one data byte is available or the stream ends, at which point a
    /// [`ProtocolError::UnexpectedEof`] is returned (clean EOF between
    /// frames is the caller's responsibility to distinguish by first
    /// checking whether it expected more data at all).
    pub fn read_data(&mut self, buf: &mut [u8], mut handler: impl FnMut(Message)) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.pending_data == 0 {
                let header = self.read_header()?;
                match header.code() {
                    MessageCode::Data => {
                        if header.payload_len() == 0 {
                            continue;
                        }
                        self.pending_data = header.payload_len();
                    }
                    _ => {
                        let mut payload = vec![0u8; header.payload_len() as usize];
                        self.read_exact_tracked(&mut payload, "control message payload")?;
                        let message = Message::new(header.code(), payload)
                            .expect("payload length already validated by header");
                        #[cfg(feature = "tracing")]
                        tracing::debug!(code = message.code().name(), "received control message");
                        handler(message);
                        continue;
                    }
                }
            }

            let take = buf.len().min(self.pending_data as usize);
            self.read_exact_tracked(&mut buf[..take], "data frame payload")?;
            self.pending_data -= take as u32;
            return Ok(take);
        }
    }

    /// Total payload and header bytes consumed from the underlying stream
    /// so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Reads exactly one frame header and, if it tags a control message,
    /// decodes and returns it without looking any further for data.
    ///
    /// Unlike [`Self::read_data`], which loops past every control frame in
    /// search of data bytes, this stops at the first frame. That
    /// distinction matters for a lockstep request/response exchange: a
    /// peer that answers a request with a control message only (no data
    /// frame at all for that response) leaves nothing further on the wire
    /// until the caller sends its next request, so looping here would
    /// block forever waiting for bytes that belong to a later response.
    ///
    /// If the frame is a `Data` frame, its length is recorded as pending,
    /// exactly as [`Self::read_data`] would leave it, so a subsequent
    /// `read_data` call consumes it without re-reading the header; `handler`
    /// is not invoked in that case. If it's a control frame, `handler` is
    /// called once with the decoded message and no data is left pending.
    /// Already-pending data from an earlier call short-circuits this as a
    /// no-op, since a frame boundary was already found.
    pub fn next_frame(&mut self, mut handler: impl FnMut(Message)) -> Result<()> {
        if self.pending_data > 0 {
            return Ok(());
        }
        loop {
            let header = self.read_header()?;
            match header.code() {
                MessageCode::Data => {
                    if header.payload_len() == 0 {
                        continue;
                    }
                    self.pending_data = header.payload_len();
                    return Ok(());
                }
                _ => {
                    let mut payload = vec![0u8; header.payload_len() as usize];
                    self.read_exact_tracked(&mut payload, "control message payload")?;
                    let message = Message::new(header.code(), payload)
                        .expect("payload length already validated by header");
                    handler(message);
                    return Ok(());
                }
            }
        }
    }

    fn read_header(&mut self) -> Result<MessageHeader> {
        let mut raw = [0u8; HEADER_LEN];
        self.read_exact_tracked(&mut raw, "frame header")?;
        MessageHeader::decode(&raw)
    }

    fn read_exact_tracked(&mut self, buf: &mut [u8], context: &'static str) -> Result<()> {
        self.inner.read_exact(buf).map_err(|err| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => ProtocolError::UnexpectedEof { context },
            _ => ProtocolError::Io(err),
        })?;
        self.bytes_read += buf.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn data_smaller_than_buffer_is_held_until_flush() {
        let mut writer = FramedWriter::new(Vec::new());
        writer.write_data(b"hello").unwrap();
        assert_eq!(writer.bytes_written(), 0);
        writer.flush().unwrap();
        assert_eq!(writer.bytes_written(), HEADER_LEN as u64 + 5);
    }

    #[test]
    fn data_larger_than_buffer_auto_flushes() {
        let mut writer = FramedWriter::new(Vec::new());
        let chunk = vec![0xABu8; OUTPUT_BUFFER_CAP + 100];
        writer.write_data(&chunk).unwrap();
        assert!(writer.bytes_written() > 0);
    }

    #[test]
    fn round_trips_plain_data() {
        let mut writer = FramedWriter::new(Vec::new());
        writer.write_data(b"abcdef").unwrap();
        writer.flush().unwrap();

        let mut reader = FramedReader::new(Cursor::new(writer_bytes(writer)));
        let mut buf = [0u8; 6];
        let n = reader.read_data(&mut buf, |_| panic!("no control expected")).unwrap();
        assert_eq!(n, 6);
        assert_eq!(&buf, b"abcdef");
    }

    #[test]
    fn control_messages_are_dispatched_not_returned_as_data() {
        let mut writer = FramedWriter::new(Vec::new());
        writer.write_data(b"AB").unwrap();
        writer
            .write_message(&Message::new(MessageCode::Info, b"note".to_vec()).unwrap())
            .unwrap();
        writer.write_data(b"CD").unwrap();
        writer.flush().unwrap();

        let mut reader = FramedReader::new(Cursor::new(writer_bytes(writer)));
        let mut seen = Vec::new();
        let mut buf = [0u8; 4];
        let mut total = 0;
        while total < 4 {
            let n = reader
                .read_data(&mut buf[total..], |msg| seen.push(msg))
                .unwrap();
            total += n;
        }
        assert_eq!(&buf, b"ABCD");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].code(), MessageCode::Info);
        assert_eq!(seen[0].as_text().unwrap(), "note");
    }

    #[test]
    fn truncated_stream_yields_typed_eof() {
        let mut writer = FramedWriter::new(Vec::new());
        writer.write_data(b"abcdef").unwrap();
        writer.flush().unwrap();
        let mut bytes = writer_bytes(writer);
        bytes.truncate(bytes.len() - 1);

        let mut reader = FramedReader::new(Cursor::new(bytes));
        let mut buf = [0u8; 6];
        let err = reader.read_data(&mut buf, |_| {}).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedEof { .. }));
    }

    #[test]
    fn next_frame_stops_at_a_control_message_without_consuming_later_data() {
        let mut writer = FramedWriter::new(Vec::new());
        writer
            .write_message(&Message::new(MessageCode::NoSend, 7i32.to_le_bytes().to_vec()).unwrap())
            .unwrap();
        writer.flush().unwrap();
        let control_only = writer_bytes(writer);

        let mut reader = FramedReader::new(Cursor::new(control_only));
        let mut seen = Vec::new();
        reader.next_frame(|msg| seen.push(msg)).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].code(), MessageCode::NoSend);
        assert_eq!(seen[0].as_i32(), Some(7));
    }

    #[test]
    fn next_frame_primes_pending_data_for_a_data_frame() {
        let mut writer = FramedWriter::new(Vec::new());
        writer.write_data(b"abcdef").unwrap();
        writer.flush().unwrap();

        let mut reader = FramedReader::new(Cursor::new(writer_bytes(writer)));
        reader.next_frame(|_| panic!("no control expected")).unwrap();
        let mut buf = [0u8; 6];
        let n = reader.read_data(&mut buf, |_| panic!("no control expected")).unwrap();
        assert_eq!(n, 6);
        assert_eq!(&buf, b"abcdef");
    }

    fn writer_bytes(writer: FramedWriter<Vec<u8>>) -> Vec<u8> {
        writer.inner
    }
}
