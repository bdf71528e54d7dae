//! Sink over a borrowed TCP stream.

use super::Sink;
use std::io::{self, Read, Write};
use std::net::TcpStream;

/// A sink that forwards writes into a borrowed [`TcpStream`].
///
/// The borrow makes ownership explicit: this sink can never close the
/// stream, dropping it leaves the connection untouched. [`Sink::size`]
/// counts the bytes sent through this sink.
///
/// [`flush`](Write::flush) toggles `TCP_NODELAY` to push any coalesced
/// segments out, then drains bytes pending in the receive buffer.
pub struct SocketSink<'a> {
    stream: &'a TcpStream,
    sent: u32,
}

impl<'a> SocketSink<'a> {
    /// Wrap a connected stream.
    pub fn new(stream: &'a TcpStream) -> SocketSink<'a> {
        SocketSink { stream, sent: 0 }
    }

    /// The underlying stream.
    pub fn stream(&self) -> &TcpStream {
        self.stream
    }

    fn drain_receive_buffer(&mut self) -> io::Result<()> {
        self.stream.set_nonblocking(true)?;
        let mut scratch = [0u8; 128];
        let result = loop {
            match (&mut self.stream).read(&mut scratch) {
                Ok(0) => break Ok(()),
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.stream.set_nonblocking(false)?;
        result
    }
}

impl io::Write for SocketSink<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let written = (&mut self.stream).write(data)?;
        self.sent += written as u32;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Toggling no-delay forces transmission of anything Nagle held back;
        // it must be set at least once for the kernel to act on it.
        let nodelay = self.stream.nodelay()?;
        if !nodelay {
            self.stream.set_nodelay(true)?;
        }
        self.stream.set_nodelay(nodelay)?;
        self.drain_receive_buffer()
    }
}

impl Sink for SocketSink<'_> {
    fn clear(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn size(&self) -> u32 {
        self.sent
    }

    fn available(&self) -> u32 {
        u32::MAX
    }

    fn data(&self) -> Option<&[u8]> {
        None
    }
}
