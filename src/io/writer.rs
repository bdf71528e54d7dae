//! Typed serialization over any sink.
//!
//! # Wire format
//!
//! Everything is **little-endian**, regardless of host byte order:
//!
//! | element | encoding |
//! |---|---|
//! | `bool` / `u8` / `i8` | 1 byte |
//! | `u16` / `i16` | 2 bytes LE |
//! | `u32` / `i32` / `f32` | 4 bytes LE / IEEE-754 |
//! | `u64` / `i64` / `f64` | 8 bytes LE / IEEE-754 |
//! | string | u16 LE character count, then `count * char_size` bytes |
//! | sequence | u16 LE element count, then raw bytes (Pod) or per-element encodings |
//!
//! The only exceptions are [`Sink::write_value`] and [`BinaryWriter::write_seq`],
//! which copy the in-memory representation of Pod values verbatim: identical
//! to the table on little-endian hosts, which is what this crate targets.

use super::{
    ArraySink, BufferSink, Composite, FileSink, Sink, SocketSink, ViewSink,
};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io;

/// A typed writer over any [`Sink`].
///
/// Stateless besides the sink itself; every `write_*` either fully writes
/// its encoding or returns the sink's error.
///
/// # Example
///
/// ```
/// use parcore::io::{BinaryWriter, BufferSink};
///
/// let mut w = BinaryWriter::new(BufferSink::new());
/// w.write_u16(4).unwrap();
/// w.write_bytes(b"abcd").unwrap();
/// assert_eq!(w.data(), Some(&[4, 0, b'a', b'b', b'c', b'd'][..]));
/// ```
pub struct BinaryWriter<S: Sink> {
    sink: S,
}

impl<S: Sink> BinaryWriter<S> {
    /// Wrap a sink.
    pub fn new(sink: S) -> BinaryWriter<S> {
        BinaryWriter { sink }
    }

    /// The underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the underlying sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Unwrap into the sink. No implicit flush happens here.
    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Flush the sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    /// Reset the sink to empty.
    pub fn clear(&mut self) -> io::Result<()> {
        self.sink.clear()
    }

    /// Bytes written so far, as reported by the sink.
    pub fn size(&self) -> u32 {
        self.sink.size()
    }

    /// The buffered bytes, where the sink keeps them in memory.
    pub fn data(&self) -> Option<&[u8]> {
        self.sink.data()
    }

    /// Write raw bytes, unframed.
    pub fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.sink.write_bytes(data)
    }

    /// Write a bool as one byte (0 or 1).
    pub fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.write_u8(value as u8)
    }

    /// Write an unsigned 8-bit integer.
    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.sink.write_u8(value)
    }

    /// Write a signed 8-bit integer.
    pub fn write_i8(&mut self, value: i8) -> io::Result<()> {
        self.sink.write_i8(value)
    }

    /// Write an unsigned 16-bit integer.
    pub fn write_u16(&mut self, value: u16) -> io::Result<()> {
        self.sink.write_u16::<LittleEndian>(value)
    }

    /// Write a signed 16-bit integer.
    pub fn write_i16(&mut self, value: i16) -> io::Result<()> {
        self.sink.write_i16::<LittleEndian>(value)
    }

    /// Write an unsigned 32-bit integer.
    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        self.sink.write_u32::<LittleEndian>(value)
    }

    /// Write a signed 32-bit integer.
    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        self.sink.write_i32::<LittleEndian>(value)
    }

    /// Write an unsigned 64-bit integer.
    pub fn write_u64(&mut self, value: u64) -> io::Result<()> {
        self.sink.write_u64::<LittleEndian>(value)
    }

    /// Write a signed 64-bit integer.
    pub fn write_i64(&mut self, value: i64) -> io::Result<()> {
        self.sink.write_i64::<LittleEndian>(value)
    }

    /// Write an IEEE-754 single.
    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        self.sink.write_f32::<LittleEndian>(value)
    }

    /// Write an IEEE-754 double.
    pub fn write_f64(&mut self, value: f64) -> io::Result<()> {
        self.sink.write_f64::<LittleEndian>(value)
    }

    /// Write a length-prefixed string: u16 LE byte count, then the bytes.
    ///
    /// # Panics
    ///
    /// Panics if the string is longer than 65535 bytes.
    pub fn write_str(&mut self, value: &str) -> io::Result<()> {
        self.write_len_prefix(value.len())?;
        self.sink.write_bytes(value.as_bytes())
    }

    /// Write a length-prefixed UTF-16 string: u16 LE character count, then
    /// two bytes LE per character.
    ///
    /// # Panics
    ///
    /// Panics if there are more than 65535 characters.
    pub fn write_utf16(&mut self, chars: &[u16]) -> io::Result<()> {
        self.write_len_prefix(chars.len())?;
        for &ch in chars {
            self.sink.write_u16::<LittleEndian>(ch)?;
        }
        Ok(())
    }

    /// Write a length-prefixed sequence of trivially copyable elements:
    /// u16 LE count, then `count * size_of::<T>()` raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if there are more than 65535 elements.
    pub fn write_seq<T: bytemuck::Pod>(&mut self, items: &[T]) -> io::Result<()> {
        self.write_len_prefix(items.len())?;
        self.sink.write_bytes(bytemuck::cast_slice(items))
    }

    /// Write a length-prefixed sequence element-wise: u16 LE count, then
    /// one `each` invocation per element.
    ///
    /// # Panics
    ///
    /// Panics if there are more than 65535 elements.
    pub fn write_seq_with<T>(
        &mut self,
        items: &[T],
        mut each: impl FnMut(&mut Self, &T) -> io::Result<()>,
    ) -> io::Result<()> {
        self.write_len_prefix(items.len())?;
        for item in items {
            each(self, item)?;
        }
        Ok(())
    }

    fn write_len_prefix(&mut self, len: usize) -> io::Result<()> {
        assert!(
            len <= u16::MAX as usize,
            "length {} exceeds the u16 prefix",
            len
        );
        self.sink.write_u16::<LittleEndian>(len as u16)
    }
}

/// Writes into a fixed-size inline array.
pub type ArrayWriter<const N: usize> = BinaryWriter<ArraySink<N>>;
/// Writes into a caller-supplied byte region.
pub type ViewWriter<'a> = BinaryWriter<ViewSink<'a>>;
/// Writes into a dynamically growing buffer.
pub type BufferWriter = BinaryWriter<BufferSink>;
/// Writes into a file.
pub type FileWriter = BinaryWriter<FileSink>;
/// Writes into a borrowed TCP stream.
pub type SocketWriter<'a> = BinaryWriter<SocketSink<'a>>;
/// Buffers through `B` and flushes into storage `S`.
pub type StreamWriter<B, S> = BinaryWriter<Composite<B, S>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_writer() -> BufferWriter {
        BinaryWriter::new(BufferSink::new())
    }

    #[test]
    fn test_integer_encodings_are_little_endian() {
        let mut w = buffer_writer();
        w.write_u16(0x0201).unwrap();
        w.write_u32(0x0605_0403).unwrap();
        w.write_u64(0x0e0d_0c0b_0a09_0807).unwrap();
        assert_eq!(
            w.data(),
            Some(&[1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14][..])
        );
    }

    #[test]
    fn test_signed_and_bool_encodings() {
        let mut w = buffer_writer();
        w.write_bool(true).unwrap();
        w.write_i8(-1).unwrap();
        w.write_i16(-2).unwrap();
        w.write_i32(-3).unwrap();
        assert_eq!(
            w.data(),
            Some(&[1u8, 0xff, 0xfe, 0xff, 0xfd, 0xff, 0xff, 0xff][..])
        );
    }

    #[test]
    fn test_float_encodings() {
        let mut w = buffer_writer();
        w.write_f32(1.0).unwrap();
        w.write_f64(-2.0).unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&1.0f32.to_le_bytes());
        expected.extend_from_slice(&(-2.0f64).to_le_bytes());
        assert_eq!(w.data(), Some(&expected[..]));
    }

    #[test]
    fn test_length_prefixed_string() {
        let mut w = buffer_writer();
        w.write_str("hello").unwrap();
        assert_eq!(
            w.data(),
            Some(&[5u8, 0, b'h', b'e', b'l', b'l', b'o'][..])
        );
    }

    #[test]
    fn test_empty_string() {
        let mut w = buffer_writer();
        w.write_str("").unwrap();
        assert_eq!(w.data(), Some(&[0u8, 0][..]));
    }

    #[test]
    fn test_utf16_string() {
        let mut w = buffer_writer();
        let wide: Vec<u16> = "hi".encode_utf16().collect();
        w.write_utf16(&wide).unwrap();
        assert_eq!(w.data(), Some(&[2u8, 0, b'h', 0, b'i', 0][..]));
    }

    #[test]
    fn test_pod_sequence_bulk_bytes() {
        let mut w = buffer_writer();
        w.write_seq(&[0x0201u16, 0x0403]).unwrap();
        assert_eq!(w.data(), Some(&[2u8, 0, 1, 2, 3, 4][..]));
    }

    #[test]
    fn test_sequence_with_element_hook() {
        let mut w = buffer_writer();
        let words = ["ab", "c"];
        w.write_seq_with(&words, |w, s| w.write_str(s)).unwrap();
        assert_eq!(
            w.data(),
            Some(&[2u8, 0, 2, 0, b'a', b'b', 1, 0, b'c'][..])
        );
    }

    #[test]
    #[should_panic(expected = "exceeds the u16 prefix")]
    fn test_oversized_length_prefix_panics() {
        let mut w = buffer_writer();
        let long = "x".repeat(70_000);
        let _ = w.write_str(&long);
    }

    #[test]
    fn test_chained_into_fixed_array() {
        let mut w: ArrayWriter<16> = BinaryWriter::new(ArraySink::new());
        w.write_u16(4).unwrap();
        w.write_bytes(b"abcd").unwrap();
        assert_eq!(w.size(), 6);
        assert_eq!(w.data(), Some(&[4u8, 0, b'a', b'b', b'c', b'd'][..]));
    }
}
