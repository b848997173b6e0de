//! Window request handlers

use std::collections::HashMap;

use crate::frontend::Frontend;
use crate::protocol::error::XError;
use crate::protocol::events::Event;
use crate::protocol::requests::{ConfigureValues, WindowAttributes};
use crate::protocol::replies::Reply;
use crate::protocol::types::*;
use crate::resources::window::Window;
use crate::server::state::ServerState;

use super::{HandlerResult, check_id_choice};

#[allow(clippy::too_many_arguments)]
pub async fn create_window(
    state: &mut ServerState,
    fe: &dyn Frontend,
    client: ClientId,
    depth: u8,
    wid: WindowId,
    parent: WindowId,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
    border_width: u16,
    class: WindowClass,
    visual: VisualId,
    attrs: &WindowAttributes,
) -> HandlerResult {
    check_id_choice(state, client, wid)?;
    let parent_win = state.registry.window(parent)?;
    if width == 0 || height == 0 {
        return Err(XError::value(0));
    }
    let class = match class {
        WindowClass::CopyFromParent => parent_win.class,
        other => other,
    };
    let visual = if visual == NONE {
        parent_win.visual
    } else {
        if state.setup.visual(visual).is_none() {
            return Err(XError::value(visual));
        }
        visual
    };
    let depth = if depth == 0 { parent_win.depth } else { depth };
    let colormap = parent_win.colormap;
    if let Some(cmap) = attrs.colormap
        && cmap != NONE
    {
        state.registry.colormap(cmap)?;
    }
    if let Some(cursor) = attrs.cursor
        && cursor != NONE
    {
        state.registry.cursor(cursor)?;
    }

    let mut window = Window {
        id: wid,
        owner: client,
        parent: Some(parent),
        x,
        y,
        width,
        height,
        border_width,
        depth,
        visual,
        class,
        mapped: false,
        override_redirect: false,
        save_under: false,
        bit_gravity: 0,
        win_gravity: 1,
        background_pixel: None,
        background_pixmap: None,
        border_pixel: None,
        colormap,
        cursor: None,
        children: Vec::new(),
        event_masks: HashMap::new(),
        do_not_propagate_mask: EventMask::empty(),
        properties: HashMap::new(),
    };
    window.apply_attributes(client, attrs);
    let override_redirect = window.override_redirect;
    state.registry.windows.insert(window);

    let event = Event::CreateNotify {
        parent,
        window: wid,
        x,
        y,
        width,
        height,
        border_width,
        override_redirect,
    };
    state.deliver_to_selecting(parent, EventMask::SUBSTRUCTURE_NOTIFY, &event);

    fe.create_window(
        wid,
        parent,
        Rectangle {
            x,
            y,
            width,
            height,
        },
        border_width,
        override_redirect,
    )
    .await
    .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn change_window_attributes(
    state: &mut ServerState,
    client: ClientId,
    window: WindowId,
    attrs: &WindowAttributes,
) -> HandlerResult {
    state.registry.window(window)?;
    if let Some(cmap) = attrs.colormap
        && cmap != NONE
    {
        state.registry.colormap(cmap)?;
    }
    if let Some(cursor) = attrs.cursor
        && cursor != NONE
    {
        state.registry.cursor(cursor)?;
    }
    let win = state.registry.window_mut(window)?;
    win.apply_attributes(client, attrs);
    Ok(None)
}

pub fn get_window_attributes(
    state: &ServerState,
    client: ClientId,
    window: WindowId,
) -> HandlerResult {
    let win = state.registry.window(window)?;
    let map_state = if !win.mapped {
        map_state::UNMAPPED
    } else if state.registry.windows.is_viewable(window) {
        map_state::VIEWABLE
    } else {
        map_state::UNVIEWABLE
    };
    Ok(Some(Reply::GetWindowAttributes {
        backing_store: 0,
        visual: win.visual,
        class: win.class as u16,
        bit_gravity: win.bit_gravity,
        win_gravity: win.win_gravity,
        backing_planes: u32::MAX,
        backing_pixel: 0,
        save_under: win.save_under,
        map_is_installed: true,
        map_state,
        override_redirect: win.override_redirect,
        colormap: win.colormap,
        all_event_masks: win.all_event_masks(),
        your_event_mask: win.event_mask_of(client),
        do_not_propagate_mask: win.do_not_propagate_mask,
    }))
}

pub async fn destroy_window(
    state: &mut ServerState,
    fe: &dyn Frontend,
    window: WindowId,
) -> HandlerResult {
    if window == ROOT_WINDOW {
        return Ok(None);
    }
    state.registry.window(window)?;
    for dead in state.destroy_window_subtree(window) {
        fe.destroy_window(dead.id)
            .await
            .map_err(|_| XError::implementation())?;
    }
    Ok(None)
}

pub async fn destroy_subwindows(
    state: &mut ServerState,
    fe: &dyn Frontend,
    window: WindowId,
) -> HandlerResult {
    let children = state.registry.window(window)?.children.clone();
    for child in children {
        for dead in state.destroy_window_subtree(child) {
            fe.destroy_window(dead.id)
                .await
                .map_err(|_| XError::implementation())?;
        }
    }
    Ok(None)
}

pub fn change_save_set(
    state: &mut ServerState,
    client: ClientId,
    insert: bool,
    window: WindowId,
) -> HandlerResult {
    let win = state.registry.window(window)?;
    // a client cannot put its own windows in its save-set
    if win.owner == client {
        return Err(XError::match_error());
    }
    let session = state.client_mut(client).expect("dispatching client exists");
    if insert {
        session.save_set.insert(window);
    } else {
        session.save_set.remove(&window);
    }
    Ok(None)
}

pub async fn reparent_window(
    state: &mut ServerState,
    fe: &dyn Frontend,
    window: WindowId,
    parent: WindowId,
    x: i16,
    y: i16,
) -> HandlerResult {
    let win = state.registry.window(window)?;
    let was_mapped = win.mapped;
    let old_parent = win.parent.unwrap_or(ROOT_WINDOW);
    state.registry.window(parent)?;
    if window == ROOT_WINDOW
        || window == parent
        || state.registry.windows.is_ancestor(window, parent)
    {
        return Err(XError::match_error());
    }

    if was_mapped {
        let _ = unmap_window(state, fe, window).await?;
    }
    state.registry.windows.reparent(window, parent, x, y);
    let override_redirect = state.registry.window(window)?.override_redirect;
    let event = Event::ReparentNotify {
        event: window,
        window,
        parent,
        x,
        y,
        override_redirect,
    };
    state.deliver_to_selecting(window, EventMask::STRUCTURE_NOTIFY, &event);
    for interested in [old_parent, parent] {
        let event = Event::ReparentNotify {
            event: interested,
            window,
            parent,
            x,
            y,
            override_redirect,
        };
        state.deliver_to_selecting(interested, EventMask::SUBSTRUCTURE_NOTIFY, &event);
    }
    fe.reparent_window(window, parent, x, y)
        .await
        .map_err(|_| XError::implementation())?;
    if was_mapped {
        let _ = map_window(state, fe, window).await?;
    }
    Ok(None)
}

pub async fn map_window(
    state: &mut ServerState,
    fe: &dyn Frontend,
    window: WindowId,
) -> HandlerResult {
    let win = state.registry.window(window)?;
    if win.mapped {
        return Ok(None);
    }
    let parent = win.parent.unwrap_or(ROOT_WINDOW);
    let override_redirect = win.override_redirect;
    state.registry.window_mut(window)?.mapped = true;

    let event = Event::MapNotify {
        event: window,
        window,
        override_redirect,
    };
    state.deliver_to_selecting(window, EventMask::STRUCTURE_NOTIFY, &event);
    let event = Event::MapNotify {
        event: parent,
        window,
        override_redirect,
    };
    state.deliver_to_selecting(parent, EventMask::SUBSTRUCTURE_NOTIFY, &event);

    let (width, height) = {
        let win = state.registry.window(window)?;
        (win.width, win.height)
    };
    let expose = Event::Expose {
        window,
        x: 0,
        y: 0,
        width,
        height,
        count: 0,
    };
    state.deliver_to_selecting(window, EventMask::EXPOSURE, &expose);

    // a newly viewable window may now be under the pointer
    state.input.pointer_window = state
        .registry
        .windows
        .window_at(state.input.pointer_x, state.input.pointer_y);

    state.mark_dirty(window);
    fe.map_window(window)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn map_subwindows(
    state: &mut ServerState,
    fe: &dyn Frontend,
    window: WindowId,
) -> HandlerResult {
    let children = state.registry.window(window)?.children.clone();
    for child in children {
        let _ = map_window(state, fe, child).await?;
    }
    Ok(None)
}

pub async fn unmap_window(
    state: &mut ServerState,
    fe: &dyn Frontend,
    window: WindowId,
) -> HandlerResult {
    let win = state.registry.window(window)?;
    if !win.mapped {
        return Ok(None);
    }
    let parent = win.parent.unwrap_or(ROOT_WINDOW);
    state.registry.window_mut(window)?.mapped = false;

    let event = Event::UnmapNotify {
        event: window,
        window,
        from_configure: false,
    };
    state.deliver_to_selecting(window, EventMask::STRUCTURE_NOTIFY, &event);
    let event = Event::UnmapNotify {
        event: parent,
        window,
        from_configure: false,
    };
    state.deliver_to_selecting(parent, EventMask::SUBSTRUCTURE_NOTIFY, &event);

    state.input.pointer_window = state
        .registry
        .windows
        .window_at(state.input.pointer_x, state.input.pointer_y);

    state.mark_dirty(parent);
    fe.unmap_window(window)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn unmap_subwindows(
    state: &mut ServerState,
    fe: &dyn Frontend,
    window: WindowId,
) -> HandlerResult {
    let children = state.registry.window(window)?.children.clone();
    for child in children.into_iter().rev() {
        let _ = unmap_window(state, fe, child).await?;
    }
    Ok(None)
}

pub async fn configure_window(
    state: &mut ServerState,
    fe: &dyn Frontend,
    window: WindowId,
    values: &ConfigureValues,
) -> HandlerResult {
    let win = state.registry.window(window)?;
    if window == ROOT_WINDOW {
        return Err(XError::match_error());
    }
    let parent = win.parent.unwrap_or(ROOT_WINDOW);
    if let Some(width) = values.width
        && width == 0
    {
        return Err(XError::value(0));
    }
    if let Some(height) = values.height
        && height == 0
    {
        return Err(XError::value(0));
    }
    if values.sibling.is_some() && values.stack_mode.is_none() {
        return Err(XError::match_error());
    }
    if let Some(sibling) = values.sibling {
        let sib = state.registry.window(sibling)?;
        if sib.parent != Some(parent) {
            return Err(XError::match_error());
        }
    }

    let win = state.registry.window_mut(window)?;
    if let Some(x) = values.x {
        win.x = x;
    }
    if let Some(y) = values.y {
        win.y = y;
    }
    if let Some(width) = values.width {
        win.width = width;
    }
    if let Some(height) = values.height {
        win.height = height;
    }
    if let Some(border_width) = values.border_width {
        win.border_width = border_width;
    }
    let (x, y, width, height, border_width, override_redirect) = (
        win.x,
        win.y,
        win.width,
        win.height,
        win.border_width,
        win.override_redirect,
    );
    if let Some(mode) = values.stack_mode {
        state.registry.windows.restack(window, values.sibling, mode);
    }

    let above_sibling = {
        let siblings = &state.registry.window(parent)?.children;
        let pos = siblings.iter().position(|&c| c == window);
        match pos {
            Some(0) | None => NONE,
            Some(p) => siblings[p - 1],
        }
    };
    let event = Event::ConfigureNotify {
        event: window,
        window,
        above_sibling,
        x,
        y,
        width,
        height,
        border_width,
        override_redirect,
    };
    state.deliver_to_selecting(window, EventMask::STRUCTURE_NOTIFY, &event);
    let event = Event::ConfigureNotify {
        event: parent,
        window,
        above_sibling,
        x,
        y,
        width,
        height,
        border_width,
        override_redirect,
    };
    state.deliver_to_selecting(parent, EventMask::SUBSTRUCTURE_NOTIFY, &event);

    state.input.pointer_window = state
        .registry
        .windows
        .window_at(state.input.pointer_x, state.input.pointer_y);
    state.mark_dirty(window);
    fe.configure_window(
        window,
        Rectangle {
            x,
            y,
            width,
            height,
        },
        border_width,
    )
    .await
    .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn circulate_window(
    state: &mut ServerState,
    fe: &dyn Frontend,
    raise_lowest: bool,
    window: WindowId,
) -> HandlerResult {
    let children = state.registry.window(window)?.children.clone();
    let mapped: Vec<WindowId> = children
        .into_iter()
        .filter(|&c| state.registry.windows.get(c).is_some_and(|w| w.mapped))
        .collect();
    let target = if raise_lowest {
        mapped.first().copied()
    } else {
        mapped.last().copied()
    };
    let Some(target) = target else {
        return Ok(None);
    };
    if !state.registry.windows.circulate(target, raise_lowest) {
        return Ok(None);
    }
    let place = if raise_lowest { 0 } else { 1 };
    let event = Event::CirculateNotify {
        event: window,
        window: target,
        place,
    };
    state.deliver_to_selecting(window, EventMask::SUBSTRUCTURE_NOTIFY, &event);
    let event = Event::CirculateNotify {
        event: target,
        window: target,
        place,
    };
    state.deliver_to_selecting(target, EventMask::STRUCTURE_NOTIFY, &event);
    state.mark_dirty(window);
    fe.circulate_window(target, raise_lowest)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub fn get_geometry(state: &ServerState, drawable: DrawableId) -> HandlerResult {
    let geom = state.registry.drawable(drawable)?;
    Ok(Some(Reply::GetGeometry {
        depth: geom.depth,
        root: ROOT_WINDOW,
        x: geom.x,
        y: geom.y,
        width: geom.width,
        height: geom.height,
        border_width: geom.border_width,
    }))
}

pub fn query_tree(state: &ServerState, window: WindowId) -> HandlerResult {
    let win = state.registry.window(window)?;
    Ok(Some(Reply::QueryTree {
        root: ROOT_WINDOW,
        parent: win.parent.unwrap_or(NONE),
        children: win.children.clone(),
    }))
}
