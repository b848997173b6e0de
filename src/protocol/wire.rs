//! Byte-order-aware reading and writing of protocol data
//!
//! Every request, reply, event and error on a connection uses the byte
//! order chosen by the first handshake byte. `ByteOrderWriter` and
//! `ByteOrderReader` encapsulate that choice on top of the `byteorder`
//! crate, together with the 4-byte padding rules of the protocol.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian, WriteBytesExt};

use super::types::ByteOrder;

/// Number of pad bytes required to bring `n` to a 4-byte boundary.
pub fn pad(n: usize) -> usize {
    (4 - n % 4) % 4
}

pub struct ByteOrderWriter {
    buffer: Vec<u8>,
    byte_order: ByteOrder,
}

impl ByteOrderWriter {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self {
            buffer: Vec::new(),
            byte_order,
        }
    }

    pub fn with_capacity(byte_order: ByteOrder, capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            byte_order,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.write_u8(value).unwrap();
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buffer.write_i8(value).unwrap();
    }

    pub fn write_u16(&mut self, value: u16) {
        match self.byte_order {
            ByteOrder::BigEndian => self.buffer.write_u16::<BigEndian>(value).unwrap(),
            ByteOrder::LittleEndian => self.buffer.write_u16::<LittleEndian>(value).unwrap(),
        }
    }

    pub fn write_i16(&mut self, value: i16) {
        match self.byte_order {
            ByteOrder::BigEndian => self.buffer.write_i16::<BigEndian>(value).unwrap(),
            ByteOrder::LittleEndian => self.buffer.write_i16::<LittleEndian>(value).unwrap(),
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        match self.byte_order {
            ByteOrder::BigEndian => self.buffer.write_u32::<BigEndian>(value).unwrap(),
            ByteOrder::LittleEndian => self.buffer.write_u32::<LittleEndian>(value).unwrap(),
        }
    }

    pub fn write_i32(&mut self, value: i32) {
        match self.byte_order {
            ByteOrder::BigEndian => self.buffer.write_i32::<BigEndian>(value).unwrap(),
            ByteOrder::LittleEndian => self.buffer.write_i32::<LittleEndian>(value).unwrap(),
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Write `bytes` followed by padding to a 4-byte boundary.
    pub fn write_padded_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        self.write_padding(pad(bytes.len()));
    }

    pub fn write_padding(&mut self, count: usize) {
        self.buffer.resize(self.buffer.len() + count, 0);
    }

    /// Overwrite a previously written u16 at `offset`.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        let slot = &mut self.buffer[offset..offset + 2];
        match self.byte_order {
            ByteOrder::BigEndian => BigEndian::write_u16(slot, value),
            ByteOrder::LittleEndian => LittleEndian::write_u16(slot, value),
        }
    }

    /// Overwrite a previously written u32 at `offset`.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        let slot = &mut self.buffer[offset..offset + 4];
        match self.byte_order {
            ByteOrder::BigEndian => BigEndian::write_u32(slot, value),
            ByteOrder::LittleEndian => LittleEndian::write_u32(slot, value),
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }
}

/// Truncated-read error; surfaces as a Length protocol error upstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("short read: wanted {wanted} bytes at offset {offset}, had {available}")]
pub struct ShortRead {
    pub wanted: usize,
    pub offset: usize,
    pub available: usize,
}

pub struct ByteOrderReader<'a> {
    data: &'a [u8],
    offset: usize,
    byte_order: ByteOrder,
}

impl<'a> ByteOrderReader<'a> {
    pub fn new(data: &'a [u8], byte_order: ByteOrder) -> Self {
        Self {
            data,
            offset: 0,
            byte_order,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], ShortRead> {
        if self.remaining() < count {
            return Err(ShortRead {
                wanted: count,
                offset: self.offset,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, ShortRead> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, ShortRead> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, ShortRead> {
        let bytes = self.take(2)?;
        Ok(match self.byte_order {
            ByteOrder::BigEndian => BigEndian::read_u16(bytes),
            ByteOrder::LittleEndian => LittleEndian::read_u16(bytes),
        })
    }

    pub fn read_i16(&mut self) -> Result<i16, ShortRead> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, ShortRead> {
        let bytes = self.take(4)?;
        Ok(match self.byte_order {
            ByteOrder::BigEndian => BigEndian::read_u32(bytes),
            ByteOrder::LittleEndian => LittleEndian::read_u32(bytes),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, ShortRead> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], ShortRead> {
        self.take(count)
    }

    /// Read `count` bytes and skip the pad to the next 4-byte boundary.
    pub fn read_padded_bytes(&mut self, count: usize) -> Result<&'a [u8], ShortRead> {
        let bytes = self.take(count)?;
        self.skip(pad(count).min(self.remaining()))?;
        Ok(bytes)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), ShortRead> {
        self.take(count)?;
        Ok(())
    }

    /// Read an unpadded latin-1 string of `count` bytes.
    pub fn read_string(&mut self, count: usize) -> Result<String, ShortRead> {
        let bytes = self.take(count)?;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad() {
        assert_eq!(pad(0), 0);
        assert_eq!(pad(1), 3);
        assert_eq!(pad(2), 2);
        assert_eq!(pad(3), 1);
        assert_eq!(pad(4), 0);
        assert_eq!(pad(5), 3);
    }

    #[test]
    fn test_writer_reader_round_trip_little_endian() {
        let mut writer = ByteOrderWriter::new(ByteOrder::LittleEndian);
        writer.write_u8(0x7f);
        writer.write_u16(0xbeef);
        writer.write_u32(0xdead_beef);
        writer.write_i16(-7);
        let bytes = writer.into_vec();

        let mut reader = ByteOrderReader::new(&bytes, ByteOrder::LittleEndian);
        assert_eq!(reader.read_u8().unwrap(), 0x7f);
        assert_eq!(reader.read_u16().unwrap(), 0xbeef);
        assert_eq!(reader.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(reader.read_i16().unwrap(), -7);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_writer_reader_round_trip_big_endian() {
        let mut writer = ByteOrderWriter::new(ByteOrder::BigEndian);
        writer.write_u32(0x0102_0304);
        let bytes = writer.into_vec();
        assert_eq!(bytes, [1, 2, 3, 4]);

        let mut reader = ByteOrderReader::new(&bytes, ByteOrder::BigEndian);
        assert_eq!(reader.read_u32().unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_padded_bytes() {
        let mut writer = ByteOrderWriter::new(ByteOrder::LittleEndian);
        writer.write_padded_bytes(b"hi");
        assert_eq!(writer.len(), 4);

        let bytes = writer.into_vec();
        let mut reader = ByteOrderReader::new(&bytes, ByteOrder::LittleEndian);
        assert_eq!(reader.read_padded_bytes(2).unwrap(), b"hi");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_short_read() {
        let bytes = [0u8; 2];
        let mut reader = ByteOrderReader::new(&bytes, ByteOrder::LittleEndian);
        let err = reader.read_u32().unwrap_err();
        assert_eq!(err.wanted, 4);
        assert_eq!(err.available, 2);
    }

    #[test]
    fn test_patch_u32() {
        let mut writer = ByteOrderWriter::new(ByteOrder::LittleEndian);
        writer.write_u32(0);
        writer.write_u32(0x1111_1111);
        writer.patch_u32(0, 42);
        let bytes = writer.into_vec();
        let mut reader = ByteOrderReader::new(&bytes, ByteOrder::LittleEndian);
        assert_eq!(reader.read_u32().unwrap(), 42);
    }
}
