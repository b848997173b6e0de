//! Graphics context request handlers

use crate::frontend::Frontend;
use crate::protocol::error::XError;
use crate::protocol::requests::GcValues;
use crate::protocol::types::*;
use crate::resources::GContext;
use crate::server::state::ServerState;

use super::{HandlerResult, check_id_choice};

fn validate_values(state: &ServerState, values: &GcValues) -> Result<(), XError> {
    if let Some(tile) = values.tile
        && tile != NONE
    {
        state.registry.pixmap(tile)?;
    }
    if let Some(stipple) = values.stipple
        && stipple != NONE
    {
        state.registry.pixmap(stipple)?;
    }
    if let Some(font) = values.font
        && font != NONE
    {
        state.registry.font(font)?;
    }
    if let Some(clip_mask) = values.clip_mask
        && clip_mask != NONE
    {
        let pixmap = state.registry.pixmap(clip_mask)?;
        if pixmap.depth != 1 {
            return Err(XError::match_error());
        }
    }
    if let Some(function) = values.function
        && function > 15
    {
        return Err(XError::value(function as u32));
    }
    Ok(())
}

pub async fn create_gc(
    state: &mut ServerState,
    fe: &dyn Frontend,
    client: ClientId,
    cid: GContextId,
    drawable: DrawableId,
    values: &GcValues,
) -> HandlerResult {
    check_id_choice(state, client, cid)?;
    state.registry.drawable(drawable)?;
    validate_values(state, values)?;
    let mut gc = GContext::new(cid, client, drawable);
    gc.apply(values);
    fe.create_gc(&gc).await.map_err(|_| XError::implementation())?;
    state.registry.gcontexts.insert(cid, gc);
    Ok(None)
}

pub async fn change_gc(
    state: &mut ServerState,
    fe: &dyn Frontend,
    gc: GContextId,
    values: &GcValues,
) -> HandlerResult {
    state.registry.gcontext(gc)?;
    validate_values(state, values)?;
    let context = state.registry.gcontext_mut(gc)?;
    context.apply(values);
    let snapshot = context.clone();
    fe.change_gc(&snapshot)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn copy_gc(
    state: &mut ServerState,
    fe: &dyn Frontend,
    src_gc: GContextId,
    dst_gc: GContextId,
    value_mask: u32,
) -> HandlerResult {
    let src = state.registry.gcontext(src_gc)?.clone();
    let dst = state.registry.gcontext_mut(dst_gc)?;
    dst.copy_from(&src, value_mask);
    fe.copy_gc(src_gc, dst_gc, value_mask)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn set_dashes(
    state: &mut ServerState,
    fe: &dyn Frontend,
    gc: GContextId,
    dash_offset: u16,
    dashes: &[u8],
) -> HandlerResult {
    if dashes.is_empty() || dashes.contains(&0) {
        return Err(XError::value(0));
    }
    let context = state.registry.gcontext_mut(gc)?;
    context.dash_offset = dash_offset;
    context.dashes = dashes.to_vec();
    fe.set_dashes(gc, dash_offset, dashes)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn set_clip_rectangles(
    state: &mut ServerState,
    fe: &dyn Frontend,
    ordering: u8,
    gc: GContextId,
    clip_x_origin: i16,
    clip_y_origin: i16,
    rectangles: &[Rectangle],
) -> HandlerResult {
    if ordering > 3 {
        return Err(XError::value(ordering as u32));
    }
    let context = state.registry.gcontext_mut(gc)?;
    context.clip_x_origin = clip_x_origin;
    context.clip_y_origin = clip_y_origin;
    context.clip_mask = None;
    context.clip_rectangles = Some(rectangles.to_vec());
    fe.set_clip_rectangles(
        gc,
        Point {
            x: clip_x_origin,
            y: clip_y_origin,
        },
        rectangles,
    )
    .await
    .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn free_gc(state: &mut ServerState, fe: &dyn Frontend, gc: GContextId) -> HandlerResult {
    state.registry.gcontext(gc)?;
    state.registry.gcontexts.remove(&gc);
    fe.free_gc(gc).await.map_err(|_| XError::implementation())?;
    Ok(None)
}
