//! Cursor request handlers

use crate::frontend::Frontend;
use crate::protocol::error::XError;
use crate::protocol::types::*;
use crate::resources::cursor::{Cursor, CursorSource};
use crate::server::state::ServerState;

use super::{HandlerResult, check_id_choice};

#[allow(clippy::too_many_arguments)]
pub async fn create_cursor(
    state: &mut ServerState,
    fe: &dyn Frontend,
    client: ClientId,
    cid: CursorId,
    source: PixmapId,
    mask: PixmapId,
    fore: (u16, u16, u16),
    back: (u16, u16, u16),
    x: u16,
    y: u16,
) -> HandlerResult {
    check_id_choice(state, client, cid)?;
    let src = state.registry.pixmap(source)?;
    if src.depth != 1 {
        return Err(XError::match_error());
    }
    let (src_width, src_height) = (src.width, src.height);
    if mask != NONE {
        let mask_pixmap = state.registry.pixmap(mask)?;
        if mask_pixmap.depth != 1 {
            return Err(XError::match_error());
        }
        if mask_pixmap.width != src_width || mask_pixmap.height != src_height {
            return Err(XError::match_error());
        }
    }
    if x >= src_width || y >= src_height {
        return Err(XError::match_error());
    }
    let cursor = Cursor {
        id: cid,
        owner: client,
        source: CursorSource::Pixmap {
            source,
            mask,
            x,
            y,
        },
        fore,
        back,
    };
    fe.create_cursor(&cursor)
        .await
        .map_err(|_| XError::implementation())?;
    state.registry.cursors.insert(cid, cursor);
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub async fn create_glyph_cursor(
    state: &mut ServerState,
    fe: &dyn Frontend,
    client: ClientId,
    cid: CursorId,
    source_font: FontId,
    mask_font: FontId,
    source_char: u16,
    mask_char: u16,
    fore: (u16, u16, u16),
    back: (u16, u16, u16),
) -> HandlerResult {
    check_id_choice(state, client, cid)?;
    state.registry.font(source_font)?;
    if mask_font != NONE {
        state.registry.font(mask_font)?;
    }
    let cursor = Cursor {
        id: cid,
        owner: client,
        source: CursorSource::Glyph {
            source_font,
            mask_font,
            source_char,
            mask_char,
        },
        fore,
        back,
    };
    fe.create_cursor(&cursor)
        .await
        .map_err(|_| XError::implementation())?;
    state.registry.cursors.insert(cid, cursor);
    Ok(None)
}

pub async fn free_cursor(
    state: &mut ServerState,
    fe: &dyn Frontend,
    cursor: CursorId,
) -> HandlerResult {
    state.registry.cursor(cursor)?;
    state.registry.cursors.remove(&cursor);
    // windows referencing the cursor revert to their parent's
    let ids: Vec<WindowId> = state.registry.windows.ids().collect();
    for id in ids {
        if let Some(window) = state.registry.windows.get_mut(id)
            && window.cursor == Some(cursor)
        {
            window.cursor = None;
        }
    }
    fe.free_cursor(cursor)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn recolor_cursor(
    state: &mut ServerState,
    fe: &dyn Frontend,
    cursor: CursorId,
    fore: (u16, u16, u16),
    back: (u16, u16, u16),
) -> HandlerResult {
    state.registry.cursor(cursor)?;
    let cur = state
        .registry
        .cursors
        .get_mut(&cursor)
        .expect("checked above");
    cur.fore = fore;
    cur.back = back;
    let snapshot = *cur;
    fe.recolor_cursor(&snapshot)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}
