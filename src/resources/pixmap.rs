//! Pixmap resources

use crate::protocol::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixmap {
    pub id: PixmapId,
    pub owner: ClientId,
    pub width: u16,
    pub height: u16,
    pub depth: u8,
}
