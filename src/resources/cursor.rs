//! Cursor resources
//!
//! A cursor is opaque to clients after creation; the server records the
//! source glyphs/pixmaps and colors so the frontend can (re)paint it.

use crate::protocol::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorSource {
    Pixmap {
        source: PixmapId,
        mask: PixmapId,
        x: u16,
        y: u16,
    },
    Glyph {
        source_font: FontId,
        mask_font: FontId,
        source_char: u16,
        mask_char: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub id: CursorId,
    pub owner: ClientId,
    pub source: CursorSource,
    pub fore: (u16, u16, u16),
    pub back: (u16, u16, u16),
}
