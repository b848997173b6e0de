//! Font and text request handlers
//!
//! Metrics come from the frontend when a font is opened and are served
//! from the font resource afterwards; glyph painting is forwarded.

use crate::frontend::Frontend;
use crate::protocol::error::XError;
use crate::protocol::replies::Reply;
use crate::protocol::requests::TextItem;
use crate::protocol::types::*;
use crate::resources::Font;
use crate::server::state::ServerState;

use super::{HandlerResult, check_id_choice};

pub async fn open_font(
    state: &mut ServerState,
    fe: &dyn Frontend,
    client: ClientId,
    fid: FontId,
    name: &str,
) -> HandlerResult {
    check_id_choice(state, client, fid)?;
    let info = fe
        .open_font(name)
        .await
        .map_err(|_| XError::implementation())?
        .ok_or(XError::name())?;
    state.registry.fonts.insert(
        fid,
        Font {
            id: fid,
            owner: client,
            name: name.to_string(),
            info,
        },
    );
    Ok(None)
}

pub async fn close_font(state: &mut ServerState, fe: &dyn Frontend, font: FontId) -> HandlerResult {
    state.registry.font(font)?;
    state.registry.fonts.remove(&font);
    fe.close_font(font)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub fn query_font(state: &ServerState, font: FontId) -> HandlerResult {
    // a fontable is a font or a GC with a font
    let info = match state.registry.fonts.get(&font) {
        Some(font) => font.info.clone(),
        None => {
            let gc = state.registry.gcontext(font).map_err(|_| XError::font(font))?;
            let fid = gc.font.ok_or(XError::font(font))?;
            state.registry.font(fid)?.info.clone()
        }
    };
    Ok(Some(Reply::QueryFont { info }))
}

pub fn query_text_extents(state: &ServerState, font: FontId, string: &[u16]) -> HandlerResult {
    let info = match state.registry.fonts.get(&font) {
        Some(font) => &font.info,
        None => {
            let gc = state.registry.gcontext(font).map_err(|_| XError::font(font))?;
            let fid = gc.font.ok_or(XError::font(font))?;
            &state.registry.font(fid)?.info
        }
    };
    let width = info.max_bounds.character_width as i32 * string.len() as i32;
    Ok(Some(Reply::QueryTextExtents {
        draw_direction: info.draw_direction,
        font_ascent: info.font_ascent,
        font_descent: info.font_descent,
        overall_ascent: info.max_bounds.ascent,
        overall_descent: info.max_bounds.descent,
        overall_width: width,
        overall_left: info.min_bounds.left_side_bearing as i32,
        overall_right: width,
    }))
}

pub async fn list_fonts(
    fe: &dyn Frontend,
    max_names: u16,
    pattern: &str,
) -> HandlerResult {
    let names = fe
        .list_fonts(pattern, max_names as usize)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(Some(Reply::ListFonts { names }))
}

/// One reply per font, closed by a zero-length-name reply; the per-font
/// replies are pushed directly and the terminator returned.
pub async fn list_fonts_with_info(
    state: &ServerState,
    fe: &dyn Frontend,
    client: ClientId,
    max_names: u16,
    pattern: &str,
) -> HandlerResult {
    let names = fe
        .list_fonts(pattern, max_names as usize)
        .await
        .map_err(|_| XError::implementation())?;
    let Some(session) = state.client(client) else {
        return Ok(None);
    };
    let total = names.len();
    for (index, name) in names.into_iter().enumerate() {
        let info = fe
            .open_font(&name)
            .await
            .map_err(|_| XError::implementation())?
            .unwrap_or_else(crate::frontend::fixed_font_info);
        let reply = Reply::ListFontsWithInfo {
            name,
            info,
            replies_hint: (total - index - 1) as u32,
        };
        session.send(reply.encode(session.byte_order, session.sequence));
    }
    Ok(Some(Reply::ListFontsWithInfoEnd))
}

pub fn set_font_path(paths: &[String]) -> HandlerResult {
    // the font path is fixed; accept the request for compatibility
    let _ = paths;
    Ok(None)
}

pub fn get_font_path() -> HandlerResult {
    Ok(Some(Reply::GetFontPath {
        paths: vec!["built-ins".to_string()],
    }))
}

pub async fn poly_text8(
    state: &mut ServerState,
    fe: &dyn Frontend,
    drawable: DrawableId,
    gc: GContextId,
    x: i16,
    y: i16,
    items: &[TextItem<u8>],
) -> HandlerResult {
    state.registry.drawable(drawable)?;
    let context = state.registry.gcontext(gc)?.clone();
    for item in items {
        if let TextItem::Font(fid) = item {
            state.registry.font(*fid)?;
        }
    }
    // font switches persist in the GC
    if let Some(TextItem::Font(fid)) = items
        .iter()
        .rev()
        .find(|i| matches!(i, TextItem::Font(_)))
    {
        state.registry.gcontext_mut(gc)?.font = Some(*fid);
    }
    state.mark_dirty(drawable);
    fe.poly_text8(drawable, &context, x, y, items)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn poly_text16(
    state: &mut ServerState,
    fe: &dyn Frontend,
    drawable: DrawableId,
    gc: GContextId,
    x: i16,
    y: i16,
    items: &[TextItem<u16>],
) -> HandlerResult {
    state.registry.drawable(drawable)?;
    let context = state.registry.gcontext(gc)?.clone();
    for item in items {
        if let TextItem::Font(fid) = item {
            state.registry.font(*fid)?;
        }
    }
    if let Some(TextItem::Font(fid)) = items
        .iter()
        .rev()
        .find(|i| matches!(i, TextItem::Font(_)))
    {
        state.registry.gcontext_mut(gc)?.font = Some(*fid);
    }
    state.mark_dirty(drawable);
    fe.poly_text16(drawable, &context, x, y, items)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn image_text8(
    state: &mut ServerState,
    fe: &dyn Frontend,
    drawable: DrawableId,
    gc: GContextId,
    x: i16,
    y: i16,
    text: &[u8],
) -> HandlerResult {
    state.registry.drawable(drawable)?;
    let context = state.registry.gcontext(gc)?.clone();
    state.mark_dirty(drawable);
    fe.image_text8(drawable, &context, x, y, text)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn image_text16(
    state: &mut ServerState,
    fe: &dyn Frontend,
    drawable: DrawableId,
    gc: GContextId,
    x: i16,
    y: i16,
    text: &[u16],
) -> HandlerResult {
    state.registry.drawable(drawable)?;
    let context = state.registry.gcontext(gc)?.clone();
    state.mark_dirty(drawable);
    fe.image_text16(drawable, &context, x, y, text)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}
