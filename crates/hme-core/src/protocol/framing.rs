//! Chunked stream framing.
//!
//! Every logical message (a command or an event) travels as a sequence of
//! chunks followed by a terminator:
//! ```text
//! ([len:2 BE, 1..=0xFFFE][len bytes])* [0x00 0x00]
//! ```

use std::io::{self, Read, Write};

use thiserror::Error;
use tracing::{debug, trace};

/// Largest number of payload bytes carried by a single chunk.
pub const MAX_CHUNK_SIZE: usize = 0xFFFE;

/// Errors raised while reading a chunked message from a stream.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The stream failed or closed before the terminator was read.
    #[error("stream error while reading chunked message: {0}")]
    Io(#[from] io::Error),
}

/// Writes `data` as chunks of at most [`MAX_CHUNK_SIZE`] bytes and a zero-length terminator.
///
/// Nothing is flushed; callers batch several messages before flushing.
pub fn write_chunked<W: Write + ?Sized>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    for chunk in data.chunks(MAX_CHUNK_SIZE) {
        trace!(len = chunk.len(), "write chunk");
        // chunks() never yields more than MAX_CHUNK_SIZE bytes, so this fits in u16.
        writer.write_all(&(chunk.len() as u16).to_be_bytes())?;
        writer.write_all(chunk)?;
    }
    writer.write_all(&[0, 0])
}

/// Reads chunks until the zero-length terminator and returns their concatenation.
///
/// An empty result means the peer sent a bare terminator.
///
/// # Errors
///
/// Returns [`FramingError::Io`] if the stream fails or ends mid-message.
pub fn read_chunked<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, FramingError> {
    let mut data = Vec::new();
    loop {
        let mut len_bytes = [0u8; 2];
        reader.read_exact(&mut len_bytes)?;
        let len = usize::from(u16::from_be_bytes(len_bytes));
        if len == 0 {
            debug!(len = data.len(), "assembled message");
            trace!(bytes = ?data, "message body");
            return Ok(data);
        }
        trace!(len, "read chunk");
        let start = data.len();
        data.resize(start + len, 0);
        reader.read_exact(&mut data[start..])?;
    }
}

/// Returns `data` framed as it would appear on the wire.
pub fn encode_chunked(data: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(framed_len(data.len()));
    // Writing into a Vec cannot fail.
    let _ = write_chunked(&mut framed, data);
    framed
}

/// Number of non-terminator chunks needed for a payload of `len` bytes.
pub fn chunk_count(len: usize) -> usize {
    len.div_ceil(MAX_CHUNK_SIZE)
}

/// Total wire size of a payload of `len` bytes including chunk headers and terminator.
pub fn framed_len(len: usize) -> usize {
    len + 2 * chunk_count(len) + 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_empty_payload_is_only_a_terminator() {
        assert_eq!(encode_chunked(&[]), vec![0, 0]);
    }

    #[test]
    fn test_small_payload_is_one_chunk() {
        let framed = encode_chunked(&[1, 2, 3]);
        assert_eq!(framed, vec![0, 3, 1, 2, 3, 0, 0]);
    }

    #[test]
    fn test_payload_of_max_chunk_plus_one_splits_in_two() {
        // Arrange
        let data = vec![0xAB; MAX_CHUNK_SIZE + 1];

        // Act
        let framed = encode_chunked(&data);

        // Assert: first header 0xFFFE, second header 0x0001
        assert_eq!(&framed[..2], &[0xFF, 0xFE]);
        let second = 2 + MAX_CHUNK_SIZE;
        assert_eq!(&framed[second..second + 2], &[0x00, 0x01]);
        assert_eq!(framed.len(), framed_len(data.len()));
    }

    #[test]
    fn test_chunk_count_boundaries() {
        assert_eq!(chunk_count(0), 0);
        assert_eq!(chunk_count(1), 1);
        assert_eq!(chunk_count(MAX_CHUNK_SIZE), 1);
        assert_eq!(chunk_count(MAX_CHUNK_SIZE + 1), 2);
        assert_eq!(chunk_count(3 * MAX_CHUNK_SIZE), 3);
    }

    #[test]
    fn test_read_chunked_reassembles_multiple_chunks() {
        let data: Vec<u8> = (0..(2 * MAX_CHUNK_SIZE + 10)).map(|i| (i % 251) as u8).collect();
        let mut cursor = Cursor::new(encode_chunked(&data));
        assert_eq!(read_chunked(&mut cursor).expect("read"), data);
    }

    #[test]
    fn test_read_chunked_bare_terminator_is_empty() {
        let mut cursor = Cursor::new(vec![0, 0]);
        assert!(read_chunked(&mut cursor).expect("read").is_empty());
    }

    #[test]
    fn test_read_chunked_truncated_stream_is_an_error() {
        let mut cursor = Cursor::new(vec![0, 5, 1, 2]);
        assert!(read_chunked(&mut cursor).is_err());
    }

    #[test]
    fn test_read_chunked_missing_terminator_is_an_error() {
        let mut cursor = Cursor::new(vec![0, 1, 9]);
        assert!(read_chunked(&mut cursor).is_err());
    }
}
