//! Two-stage sink: a buffer in front of storage.

use super::Sink;
use std::io;

/// Chains a buffering sink `B` in front of a storage sink `S`.
///
/// Writes land in the front buffer; when a write does not fit, the buffer is
/// flushed into storage first. A write larger than the front's total
/// capacity bypasses it and goes straight to storage (after the flush, so
/// byte order is preserved). Either way the storage ends up with the exact
/// concatenation of the writes once the composite is flushed.
///
/// Dropping the composite flushes. [`Sink::clear`] empties the front buffer
/// only; storage is untouched.
///
/// The front must keep its bytes in memory ([`Sink::data`] returns `Some`);
/// [`ArraySink`](super::ArraySink), [`ViewSink`](super::ViewSink) and
/// [`BufferSink`](super::BufferSink) all qualify.
pub struct Composite<B: Sink, S: Sink> {
    front: B,
    back: S,
}

impl<B: Sink, S: Sink> Composite<B, S> {
    /// Combine a front buffer with backing storage.
    pub fn new(front: B, back: S) -> Composite<B, S> {
        Composite { front, back }
    }

    /// The backing storage.
    pub fn back(&self) -> &S {
        &self.back
    }

    /// Mutable access to the backing storage.
    pub fn back_mut(&mut self) -> &mut S {
        &mut self.back
    }

    fn flush_front(&mut self) -> io::Result<()> {
        match self.front.data() {
            Some(buffered) if !buffered.is_empty() => self.back.write_all(buffered)?,
            Some(_) => {}
            None => assert!(
                self.front.size() == 0,
                "composite front buffer does not expose its bytes"
            ),
        }
        self.front.clear()
    }
}

impl<B: Sink, S: Sink> io::Write for Composite<B, S> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        if (self.front.available() as usize) < data.len() {
            self.flush_front()?;
            if (self.front.available() as usize) < data.len() {
                // Oversized for the front even when empty: bypass it.
                self.back.write_all(data)?;
                return Ok(data.len());
            }
        }
        self.front.write_bytes(data)?;
        Ok(data.len())
    }

    /// Move the front buffer's content into storage and clear the front.
    /// Idempotent on an empty buffer. Storage's own flush is left to the
    /// caller.
    fn flush(&mut self) -> io::Result<()> {
        self.flush_front()
    }
}

impl<B: Sink, S: Sink> Sink for Composite<B, S> {
    fn clear(&mut self) -> io::Result<()> {
        self.front.clear()
    }

    fn size(&self) -> u32 {
        self.front.size()
    }

    fn available(&self) -> u32 {
        self.front.available()
    }

    fn data(&self) -> Option<&[u8]> {
        self.front.data()
    }
}

impl<B: Sink, S: Sink> Drop for Composite<B, S> {
    fn drop(&mut self) {
        // Storage write errors have nowhere to go during drop; callers who
        // care flush explicitly first.
        let _ = self.flush_front();
    }
}
