//! Duplex byte streams a session can run over.
//!
//! A session reads events on one thread while producers write commands from
//! others, so a transport is split into independent read and write halves.
//! Closing the underlying stream is how a session is cancelled: the pending
//! read fails and the session winds down.

use std::io::{self, Read, Write};
use std::net::TcpStream;

pub type ReadHalf = Box<dyn Read + Send>;
pub type WriteHalf = Box<dyn Write + Send>;

pub trait Transport {
    fn into_split(self) -> io::Result<(ReadHalf, WriteHalf)>;
}

impl Transport for TcpStream {
    fn into_split(self) -> io::Result<(ReadHalf, WriteHalf)> {
        let reader = self.try_clone()?;
        Ok((Box::new(reader), Box::new(self)))
    }
}

#[cfg(unix)]
impl Transport for std::os::unix::net::UnixStream {
    fn into_split(self) -> io::Result<(ReadHalf, WriteHalf)> {
        let reader = self.try_clone()?;
        Ok((Box::new(reader), Box::new(self)))
    }
}

/// A transport built from separate halves, e.g. a pipe pair or in-memory buffers.
#[derive(Debug)]
pub struct Duplex<R, W> {
    pub reader: R,
    pub writer: W,
}

impl<R, W> Duplex<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R, W> Transport for Duplex<R, W>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    fn into_split(self) -> io::Result<(ReadHalf, WriteHalf)> {
        Ok((Box::new(self.reader), Box::new(self.writer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::TcpListener;

    #[test]
    fn test_duplex_halves_are_independent() {
        let duplex = Duplex::new(Cursor::new(vec![7u8, 8]), Vec::<u8>::new());
        let (mut reader, mut writer) = duplex.into_split().expect("split");

        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).expect("read");
        writer.write_all(b"ok").expect("write");

        assert_eq!(buf, [7, 8]);
    }

    #[test]
    fn test_tcp_stream_splits_into_connected_halves() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let client = TcpStream::connect(addr).expect("connect");
        let (mut server, _) = listener.accept().expect("accept");

        // Act
        let (mut reader, mut writer) = client.into_split().expect("split");
        writer.write_all(b"ping").expect("write");
        server.write_all(b"pong").expect("write");

        // Assert
        let mut got = [0u8; 4];
        server.read_exact(&mut got).expect("server read");
        assert_eq!(&got, b"ping");
        reader.read_exact(&mut got).expect("client read");
        assert_eq!(&got, b"pong");
    }
}
