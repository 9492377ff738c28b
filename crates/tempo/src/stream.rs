use std::collections::VecDeque;

use crate::Primitive;

/// Trait for types which can be seen as a binary data source.
pub trait BinaryStream {
    /// Prepares the stream for reading.
    fn prepare(&mut self) {}

    /// The currently available data.
    fn data(&self) -> &[u8];

    /// Consumes `amount` bytes from the data.
    fn consume(&mut self, amount: usize);

    /// Returns a reader for the data.
    fn reader(&mut self) -> BinReader<'_>
    where
        Self: Sized,
    {
        BinReader::new(self)
    }
}

impl BinaryStream for &[u8] {
    fn data(&self) -> &[u8] {
        self
    }

    fn consume(&mut self, amount: usize) {
        *self = &self[amount..];
    }
}

pub struct BinReader<'a> {
    data: &'a mut dyn BinaryStream,
    read: usize,
}

impl<'a> BinReader<'a> {
    pub fn new(data: &'a mut dyn BinaryStream) -> Self {
        data.prepare();
        Self { data, read: 0 }
    }

    /// Reads a primitive if there is enough data for it.
    pub fn read_be<P>(&mut self) -> Option<P>
    where
        P: Primitive,
    {
        let slice = &self.data.data()[self.read..];
        (slice.len() >= size_of::<P>()).then(|| {
            self.read += size_of::<P>();
            P::read_be_bytes(slice)
        })
    }

    /// Reads a sequence of `length` bytes if there is enough data for it.
    pub fn read_bytes(&mut self, length: usize) -> Option<Vec<u8>> {
        let slice = &self.data.data()[self.read..];
        (slice.len() >= length).then(|| {
            self.read += length;
            slice[..length].to_vec()
        })
    }

    /// Returns how many bytes of data are remaining in the data.
    pub fn remaining(&mut self) -> usize {
        self.data.data().len() - self.read
    }

    /// Consumes the read bytes and returns how many bytes were read.
    pub fn finish(self) -> usize {
        self.data.consume(self.read);
        self.read
    }
}

/// A ring buffer of binary data.
#[derive(Debug, Clone, Default)]
pub struct BinRingBuffer {
    data: VecDeque<u8>,
}

impl BinRingBuffer {
    /// Pushes the given primitive onto the buffer encoded as big-endian.
    pub fn push_be<P>(&mut self, value: P)
    where
        P: Primitive,
    {
        let mut bytes = [0; 8];
        value.write_be_bytes(&mut bytes);

        for byte in &bytes[0..size_of::<P>()] {
            self.data.push_back(*byte);
        }
    }

    /// Pushes the given bytes onto the buffer.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.data.extend(bytes.iter().copied());
    }

    /// Current length of the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty or not.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BinaryStream for BinRingBuffer {
    fn prepare(&mut self) {
        self.data.make_contiguous();
    }

    fn data(&self) -> &[u8] {
        self.data.as_slices().0
    }

    fn consume(&mut self, amount: usize) {
        self.data.drain(..amount);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn primitives_roundtrip() {
        let mut buffer = BinRingBuffer::default();
        buffer.push_be(0xAB_u8);
        buffer.push_be(0xDEAD_BEEF_u32);
        buffer.push_be(-1234_i64);
        buffer.push_be(1.5_f32);

        let mut reader = buffer.reader();
        assert_eq!(reader.read_be::<u8>(), Some(0xAB));
        assert_eq!(reader.read_be::<u32>(), Some(0xDEAD_BEEF));
        assert_eq!(reader.read_be::<i64>(), Some(-1234));
        assert_eq!(reader.read_be::<f32>(), Some(1.5));
        assert_eq!(reader.read_be::<u8>(), None);
    }

    #[test]
    fn reader_consumes_only_on_finish() {
        let mut buffer = BinRingBuffer::default();
        buffer.push_be(0x0102_0304_u32);
        buffer.push_be(0x05_u8);

        let mut reader = buffer.reader();
        assert_eq!(reader.read_be::<u32>(), Some(0x0102_0304));
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.finish(), 4);

        assert_eq!(buffer.len(), 1);
        let mut reader = buffer.reader();
        assert_eq!(reader.read_be::<u8>(), Some(0x05));
    }

    #[test]
    fn read_bytes_respects_bounds() {
        let mut buffer = BinRingBuffer::default();
        buffer.push_bytes(b"abcd");

        let mut reader = buffer.reader();
        assert_eq!(reader.read_bytes(3), Some(b"abc".to_vec()));
        assert_eq!(reader.read_bytes(2), None);
        assert_eq!(reader.read_bytes(1), Some(b"d".to_vec()));
    }
}
