//! Protocol error records
//!
//! X11 errors are 32-byte messages sharing the reply/event stream. The
//! first byte is 0, the second the error code; the offending value, the
//! minor and major opcodes and the sequence number follow.

use super::types::{ByteOrder, SequenceNumber};
use super::wire::ByteOrderWriter;

/// The core protocol error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    Request = 1,
    Value = 2,
    Window = 3,
    Pixmap = 4,
    Atom = 5,
    Cursor = 6,
    Font = 7,
    Match = 8,
    Drawable = 9,
    Access = 10,
    Alloc = 11,
    Colormap = 12,
    GContext = 13,
    IdChoice = 14,
    Name = 15,
    Length = 16,
    Implementation = 17,
}

/// A protocol error raised by a request handler, before the dispatcher
/// stamps it with the sequence and opcodes of the offending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XError {
    pub kind: ErrorKind,
    /// The offending resource ID or value; 0 where the error carries none.
    pub bad_value: u32,
}

impl XError {
    pub fn new(kind: ErrorKind, bad_value: u32) -> Self {
        Self { kind, bad_value }
    }

    pub fn window(id: u32) -> Self {
        Self::new(ErrorKind::Window, id)
    }

    pub fn pixmap(id: u32) -> Self {
        Self::new(ErrorKind::Pixmap, id)
    }

    pub fn drawable(id: u32) -> Self {
        Self::new(ErrorKind::Drawable, id)
    }

    pub fn gcontext(id: u32) -> Self {
        Self::new(ErrorKind::GContext, id)
    }

    pub fn cursor(id: u32) -> Self {
        Self::new(ErrorKind::Cursor, id)
    }

    pub fn colormap(id: u32) -> Self {
        Self::new(ErrorKind::Colormap, id)
    }

    pub fn font(id: u32) -> Self {
        Self::new(ErrorKind::Font, id)
    }

    pub fn atom(id: u32) -> Self {
        Self::new(ErrorKind::Atom, id)
    }

    pub fn value(value: u32) -> Self {
        Self::new(ErrorKind::Value, value)
    }

    pub fn match_error() -> Self {
        Self::new(ErrorKind::Match, 0)
    }

    pub fn access() -> Self {
        Self::new(ErrorKind::Access, 0)
    }

    pub fn alloc() -> Self {
        Self::new(ErrorKind::Alloc, 0)
    }

    pub fn name() -> Self {
        Self::new(ErrorKind::Name, 0)
    }

    pub fn length() -> Self {
        Self::new(ErrorKind::Length, 0)
    }

    pub fn implementation() -> Self {
        Self::new(ErrorKind::Implementation, 0)
    }

    pub fn request() -> Self {
        Self::new(ErrorKind::Request, 0)
    }

    pub fn id_choice(id: u32) -> Self {
        Self::new(ErrorKind::IdChoice, id)
    }

    /// Encode the 32-byte error record.
    pub fn encode(
        &self,
        order: ByteOrder,
        sequence: SequenceNumber,
        minor_opcode: u16,
        major_opcode: u8,
    ) -> Vec<u8> {
        let mut w = ByteOrderWriter::with_capacity(order, 32);
        w.write_u8(0);
        w.write_u8(self.kind as u8);
        w.write_u16(sequence);
        w.write_u32(self.bad_value);
        w.write_u16(minor_opcode);
        w.write_u8(major_opcode);
        w.write_padding(21);
        w.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_encoding_is_32_bytes() {
        let err = XError::window(0x0040_0002);
        let bytes = err.encode(ByteOrder::LittleEndian, 7, 0, 8);
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], ErrorKind::Window as u8);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 7);
        assert_eq!(
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            0x0040_0002
        );
        assert_eq!(bytes[10], 8);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorKind::Request as u8, 1);
        assert_eq!(ErrorKind::Length as u8, 16);
        assert_eq!(ErrorKind::Implementation as u8, 17);
    }
}
