//! Write buffer over a caller-supplied byte region.

use super::Sink;
use std::io;

/// A sink that writes into a borrowed byte region. The buffer lives
/// somewhere else; this type only tracks the write position.
///
/// Same overrun policy as [`ArraySink`](super::ArraySink): writing past the
/// region's end is a programmer error and panics.
pub struct ViewSink<'a> {
    buf: &'a mut [u8],
    pos: u32,
}

impl<'a> ViewSink<'a> {
    /// Wrap a byte region.
    pub fn new(buf: &'a mut [u8]) -> ViewSink<'a> {
        ViewSink { buf, pos: 0 }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> u32 {
        self.buf.len() as u32
    }
}

impl io::Write for ViewSink<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let pos = self.pos as usize;
        assert!(
            pos + data.len() <= self.buf.len(),
            "ViewSink overflow: {} bytes into {} remaining",
            data.len(),
            self.buf.len() - pos
        );
        self.buf[pos..pos + data.len()].copy_from_slice(data);
        self.pos += data.len() as u32;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for ViewSink<'_> {
    fn clear(&mut self) -> io::Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn size(&self) -> u32 {
        self.pos
    }

    fn available(&self) -> u32 {
        (self.buf.len() - self.pos as usize) as u32
    }

    fn data(&self) -> Option<&[u8]> {
        Some(&self.buf[..self.pos as usize])
    }
}
