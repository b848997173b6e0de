//! Font resources
//!
//! The server stores the name and the metrics reported by the frontend
//! when the font was opened; glyph rendering stays in the frontend.

use crate::protocol::replies::FontInfo;
use crate::protocol::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub id: FontId,
    pub owner: ClientId,
    pub name: String,
    pub info: FontInfo,
}
