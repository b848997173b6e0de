//! Pixmap and drawing request handlers
//!
//! The core validates drawable/GC pairs, forwards the operation to the
//! frontend, and marks the destination dirty so the dispatcher requests
//! a repaint after the request completes.

use crate::frontend::Frontend;
use crate::protocol::error::XError;
use crate::protocol::events::Event;
use crate::protocol::replies::Reply;
use crate::protocol::types::*;
use crate::resources::{GContext, Pixmap};
use crate::server::state::ServerState;

use super::{HandlerResult, check_id_choice};

/// A drawing request's (drawable, gc) pair; the GC must be valid for
/// the drawable's depth.
fn checked_pair(
    state: &ServerState,
    drawable: DrawableId,
    gc: GContextId,
) -> Result<GContext, XError> {
    state.registry.drawable(drawable)?;
    Ok(state.registry.gcontext(gc)?.clone())
}

pub async fn create_pixmap(
    state: &mut ServerState,
    fe: &dyn Frontend,
    client: ClientId,
    depth: u8,
    pid: PixmapId,
    drawable: DrawableId,
    width: u16,
    height: u16,
) -> HandlerResult {
    check_id_choice(state, client, pid)?;
    state.registry.drawable(drawable)?;
    if width == 0 || height == 0 {
        return Err(XError::value(0));
    }
    if !matches!(depth, 1 | 8 | 24 | 32) {
        return Err(XError::value(depth as u32));
    }
    let pixmap = Pixmap {
        id: pid,
        owner: client,
        width,
        height,
        depth,
    };
    fe.create_pixmap(&pixmap)
        .await
        .map_err(|_| XError::implementation())?;
    state.registry.pixmaps.insert(pid, pixmap);
    Ok(None)
}

pub async fn free_pixmap(
    state: &mut ServerState,
    fe: &dyn Frontend,
    pixmap: PixmapId,
) -> HandlerResult {
    state.registry.pixmap(pixmap)?;
    state.registry.pixmaps.remove(&pixmap);
    fe.free_pixmap(pixmap)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn clear_area(
    state: &mut ServerState,
    fe: &dyn Frontend,
    exposures: bool,
    window: WindowId,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
) -> HandlerResult {
    let win = state.registry.window(window)?;
    if win.class == WindowClass::InputOnly {
        return Err(XError::match_error());
    }
    let width = if width == 0 {
        (win.width as i32 - x as i32).max(0) as u16
    } else {
        width
    };
    let height = if height == 0 {
        (win.height as i32 - y as i32).max(0) as u16
    } else {
        height
    };
    if exposures {
        let event = Event::Expose {
            window,
            x: x.max(0) as u16,
            y: y.max(0) as u16,
            width,
            height,
            count: 0,
        };
        state.deliver_to_selecting(window, EventMask::EXPOSURE, &event);
    }
    state.mark_dirty(window);
    fe.clear_area(
        window,
        Rectangle {
            x,
            y,
            width,
            height,
        },
    )
    .await
    .map_err(|_| XError::implementation())?;
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub async fn copy_area(
    state: &mut ServerState,
    fe: &dyn Frontend,
    src_drawable: DrawableId,
    dst_drawable: DrawableId,
    gc: GContextId,
    src_x: i16,
    src_y: i16,
    dst_x: i16,
    dst_y: i16,
    width: u16,
    height: u16,
) -> HandlerResult {
    let src = state.registry.drawable(src_drawable)?;
    let dst = state.registry.drawable(dst_drawable)?;
    if src.depth != dst.depth {
        return Err(XError::match_error());
    }
    let context = state.registry.gcontext(gc)?.clone();
    state.mark_dirty(dst_drawable);
    fe.copy_area(
        src_drawable,
        dst_drawable,
        &context,
        src_x,
        src_y,
        dst_x,
        dst_y,
        width,
        height,
    )
    .await
    .map_err(|_| XError::implementation())?;
    // out-of-bounds sources surface as exposure bookkeeping
    if context.graphics_exposures {
        let event = Event::NoExposure {
            drawable: dst_drawable,
            minor_opcode: 0,
            major_opcode: crate::protocol::opcodes::graphics::COPY_AREA,
        };
        if let Some(client) = state.client(context.owner) {
            client.send_event(&event);
        }
    }
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub async fn copy_plane(
    state: &mut ServerState,
    fe: &dyn Frontend,
    src_drawable: DrawableId,
    dst_drawable: DrawableId,
    gc: GContextId,
    src_x: i16,
    src_y: i16,
    dst_x: i16,
    dst_y: i16,
    width: u16,
    height: u16,
    bit_plane: u32,
) -> HandlerResult {
    state.registry.drawable(src_drawable)?;
    state.registry.drawable(dst_drawable)?;
    if bit_plane == 0 || !bit_plane.is_power_of_two() {
        return Err(XError::value(bit_plane));
    }
    let context = checked_pair(state, dst_drawable, gc)?;
    state.mark_dirty(dst_drawable);
    fe.copy_plane(
        src_drawable,
        dst_drawable,
        &context,
        src_x,
        src_y,
        dst_x,
        dst_y,
        width,
        height,
        bit_plane,
    )
    .await
    .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn poly_point(
    state: &mut ServerState,
    fe: &dyn Frontend,
    relative: bool,
    drawable: DrawableId,
    gc: GContextId,
    points: &[Point],
) -> HandlerResult {
    let context = checked_pair(state, drawable, gc)?;
    state.mark_dirty(drawable);
    fe.poly_point(drawable, &context, relative, points)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn poly_line(
    state: &mut ServerState,
    fe: &dyn Frontend,
    relative: bool,
    drawable: DrawableId,
    gc: GContextId,
    points: &[Point],
) -> HandlerResult {
    let context = checked_pair(state, drawable, gc)?;
    state.mark_dirty(drawable);
    fe.poly_line(drawable, &context, relative, points)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn poly_segment(
    state: &mut ServerState,
    fe: &dyn Frontend,
    drawable: DrawableId,
    gc: GContextId,
    segments: &[Segment],
) -> HandlerResult {
    let context = checked_pair(state, drawable, gc)?;
    state.mark_dirty(drawable);
    fe.poly_segment(drawable, &context, segments)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn poly_rectangle(
    state: &mut ServerState,
    fe: &dyn Frontend,
    drawable: DrawableId,
    gc: GContextId,
    rectangles: &[Rectangle],
    fill: bool,
) -> HandlerResult {
    let context = checked_pair(state, drawable, gc)?;
    state.mark_dirty(drawable);
    fe.poly_rectangle(drawable, &context, rectangles, fill)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn poly_arc(
    state: &mut ServerState,
    fe: &dyn Frontend,
    drawable: DrawableId,
    gc: GContextId,
    arcs: &[Arc],
    fill: bool,
) -> HandlerResult {
    let context = checked_pair(state, drawable, gc)?;
    state.mark_dirty(drawable);
    fe.poly_arc(drawable, &context, arcs, fill)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn fill_poly(
    state: &mut ServerState,
    fe: &dyn Frontend,
    drawable: DrawableId,
    gc: GContextId,
    shape: u8,
    relative: bool,
    points: &[Point],
) -> HandlerResult {
    if shape > 2 {
        return Err(XError::value(shape as u32));
    }
    let context = checked_pair(state, drawable, gc)?;
    state.mark_dirty(drawable);
    fe.fill_poly(drawable, &context, shape, relative, points)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub async fn put_image(
    state: &mut ServerState,
    fe: &dyn Frontend,
    format: u8,
    drawable: DrawableId,
    gc: GContextId,
    width: u16,
    height: u16,
    dst_x: i16,
    dst_y: i16,
    left_pad: u8,
    depth: u8,
    data: &[u8],
) -> HandlerResult {
    if format > 2 {
        return Err(XError::value(format as u32));
    }
    let geom = state.registry.drawable(drawable)?;
    // ZPixmap carries no left-pad and must match the drawable's depth
    if format == 2 && (left_pad != 0 || depth != geom.depth) {
        return Err(XError::match_error());
    }
    if format == 0 && depth != 1 {
        return Err(XError::match_error());
    }
    let context = checked_pair(state, drawable, gc)?;
    state.mark_dirty(drawable);
    fe.put_image(
        drawable,
        &context,
        format,
        Rectangle {
            x: dst_x,
            y: dst_y,
            width,
            height,
        },
        left_pad,
        depth,
        data,
    )
    .await
    .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn get_image(
    state: &mut ServerState,
    fe: &dyn Frontend,
    format: u8,
    drawable: DrawableId,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
    plane_mask: u32,
) -> HandlerResult {
    if !matches!(format, 1 | 2) {
        return Err(XError::value(format as u32));
    }
    let geom = state.registry.drawable(drawable)?;
    if x < 0
        || y < 0
        || (x as i32 + width as i32) > geom.width as i32
        || (y as i32 + height as i32) > geom.height as i32
    {
        return Err(XError::match_error());
    }
    let data = fe
        .get_image(
            drawable,
            format,
            Rectangle {
                x,
                y,
                width,
                height,
            },
            plane_mask,
        )
        .await
        .map_err(|_| XError::implementation())?;
    let visual = if geom.is_window {
        state.setup.root_visual
    } else {
        NONE
    };
    Ok(Some(Reply::GetImage {
        depth: geom.depth,
        visual,
        data,
    }))
}

pub fn query_best_size(
    state: &ServerState,
    class: u8,
    drawable: DrawableId,
    width: u16,
    height: u16,
) -> HandlerResult {
    if class > 2 {
        return Err(XError::value(class as u32));
    }
    state.registry.drawable(drawable)?;
    // tiles and stipples round up to an 8-pixel granularity
    let (width, height) = if class == 0 {
        (width, height)
    } else {
        (width.next_multiple_of(8).max(8), height.next_multiple_of(8).max(8))
    };
    Ok(Some(Reply::QueryBestSize { width, height }))
}
