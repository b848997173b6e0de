//! Colormap and color request handlers

use crate::protocol::error::XError;
use crate::protocol::events::Event;
use crate::protocol::replies::Reply;
use crate::protocol::requests::ColorItem;
use crate::protocol::types::*;
use crate::resources::Colormap;
use crate::server::state::ServerState;

use super::{HandlerResult, check_id_choice};

/// A few well-known color names; richer name databases belong to the
/// frontend's platform.
const NAMED_COLORS: &[(&str, (u16, u16, u16))] = &[
    ("black", (0x0000, 0x0000, 0x0000)),
    ("white", (0xffff, 0xffff, 0xffff)),
    ("red", (0xffff, 0x0000, 0x0000)),
    ("green", (0x0000, 0xffff, 0x0000)),
    ("blue", (0x0000, 0x0000, 0xffff)),
    ("yellow", (0xffff, 0xffff, 0x0000)),
    ("cyan", (0x0000, 0xffff, 0xffff)),
    ("magenta", (0xffff, 0x0000, 0xffff)),
    ("gray", (0xbebe, 0xbebe, 0xbebe)),
    ("grey", (0xbebe, 0xbebe, 0xbebe)),
];

fn lookup_named(name: &str) -> Option<(u16, u16, u16)> {
    let lower = name.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|&(_, rgb)| rgb)
}

pub fn create_colormap(
    state: &mut ServerState,
    client: ClientId,
    alloc_all: bool,
    mid: ColormapId,
    window: WindowId,
    visual: VisualId,
) -> HandlerResult {
    check_id_choice(state, client, mid)?;
    state.registry.window(window)?;
    let Some(visual) = state.setup.visual(visual) else {
        return Err(XError::match_error());
    };
    if alloc_all && !visual.is_writable() {
        return Err(XError::match_error());
    }
    let mut cmap = Colormap::new(mid, client, visual);
    if alloc_all {
        cmap.alloc_cells(visual.colormap_entries)?;
    }
    state.registry.colormaps.insert(mid, cmap);
    Ok(None)
}

pub fn free_colormap(state: &mut ServerState, cmap: ColormapId) -> HandlerResult {
    state.registry.colormap(cmap)?;
    if cmap == DEFAULT_COLORMAP {
        // the default map outlives every client
        return Ok(None);
    }
    let was_installed = state.registry.colormap(cmap)?.installed;
    state.registry.colormaps.remove(&cmap);
    if was_installed {
        notify_colormap(state, cmap, false, 1);
    }
    // windows referring to the freed map fall back to the default
    let ids: Vec<WindowId> = state.registry.windows.ids().collect();
    for id in ids {
        if let Some(window) = state.registry.windows.get_mut(id)
            && window.colormap == cmap
        {
            window.colormap = DEFAULT_COLORMAP;
        }
    }
    Ok(None)
}

pub fn copy_colormap_and_free(
    state: &mut ServerState,
    client: ClientId,
    mid: ColormapId,
    src_cmap: ColormapId,
) -> HandlerResult {
    check_id_choice(state, client, mid)?;
    state.registry.colormap(src_cmap)?;
    let src = state.registry.colormap_mut(src_cmap)?;
    let copy = Colormap::copy_and_free(mid, client, src);
    state.registry.colormaps.insert(mid, copy);
    Ok(None)
}

fn notify_colormap(state: &ServerState, cmap: ColormapId, new: bool, cm_state: u8) {
    // ColormapNotify goes to windows using the map
    for id in state.registry.windows.ids() {
        let Some(window) = state.registry.windows.get(id) else {
            continue;
        };
        if window.colormap != cmap {
            continue;
        }
        let event = Event::ColormapNotify {
            window: id,
            colormap: cmap,
            new,
            state: cm_state,
        };
        state.deliver_to_selecting(id, EventMask::COLORMAP_CHANGE, &event);
    }
}

pub fn install_colormap(state: &mut ServerState, cmap: ColormapId) -> HandlerResult {
    state.registry.colormap(cmap)?;
    state.registry.colormap_mut(cmap)?.installed = true;
    notify_colormap(state, cmap, false, 1); // Installed
    Ok(None)
}

pub fn uninstall_colormap(state: &mut ServerState, cmap: ColormapId) -> HandlerResult {
    state.registry.colormap(cmap)?;
    if cmap != DEFAULT_COLORMAP {
        state.registry.colormap_mut(cmap)?.installed = false;
        notify_colormap(state, cmap, false, 0); // Uninstalled
    }
    Ok(None)
}

pub fn list_installed_colormaps(state: &ServerState, window: WindowId) -> HandlerResult {
    state.registry.window(window)?;
    let mut cmaps: Vec<ColormapId> = state
        .registry
        .colormaps
        .values()
        .filter(|c| c.installed)
        .map(|c| c.id)
        .collect();
    cmaps.sort_unstable();
    Ok(Some(Reply::ListInstalledColormaps { cmaps }))
}

pub fn alloc_color(
    state: &mut ServerState,
    cmap: ColormapId,
    red: u16,
    green: u16,
    blue: u16,
) -> HandlerResult {
    let map = state.registry.colormap_mut(cmap)?;
    let (pixel, red, green, blue) = map.alloc_color(red, green, blue)?;
    Ok(Some(Reply::AllocColor {
        red,
        green,
        blue,
        pixel,
    }))
}

pub fn alloc_named_color(state: &mut ServerState, cmap: ColormapId, name: &str) -> HandlerResult {
    let (red, green, blue) = lookup_named(name).ok_or(XError::name())?;
    let map = state.registry.colormap_mut(cmap)?;
    let (pixel, vr, vg, vb) = map.alloc_color(red, green, blue)?;
    Ok(Some(Reply::AllocNamedColor {
        pixel,
        exact: (red, green, blue),
        visual: (vr, vg, vb),
    }))
}

pub fn alloc_color_cells(
    state: &mut ServerState,
    contiguous: bool,
    cmap: ColormapId,
    colors: u16,
    planes: u16,
) -> HandlerResult {
    if colors == 0 {
        return Err(XError::value(0));
    }
    // plane allocation is not provided on this server's visuals
    if planes != 0 && contiguous {
        return Err(XError::alloc());
    }
    let map = state.registry.colormap_mut(cmap)?;
    let pixels = map.alloc_cells(colors)?;
    Ok(Some(Reply::AllocColorCells {
        pixels,
        masks: vec![0; planes as usize],
    }))
}

pub fn alloc_color_planes(
    state: &mut ServerState,
    cmap: ColormapId,
    colors: u16,
    reds: u16,
    greens: u16,
    blues: u16,
) -> HandlerResult {
    if colors == 0 {
        return Err(XError::value(0));
    }
    if reds != 0 || greens != 0 || blues != 0 {
        return Err(XError::alloc());
    }
    let map = state.registry.colormap_mut(cmap)?;
    let pixels = map.alloc_cells(colors)?;
    Ok(Some(Reply::AllocColorPlanes {
        pixels,
        red_mask: 0,
        green_mask: 0,
        blue_mask: 0,
    }))
}

pub fn free_colors(
    state: &mut ServerState,
    cmap: ColormapId,
    _plane_mask: u32,
    pixels: &[u32],
) -> HandlerResult {
    let map = state.registry.colormap_mut(cmap)?;
    map.free_pixels(pixels);
    Ok(None)
}

pub fn store_colors(state: &mut ServerState, cmap: ColormapId, items: &[ColorItem]) -> HandlerResult {
    // validate everything first so a failure leaves the map unchanged
    {
        let map = state.registry.colormap(cmap)?;
        for item in items {
            if !map.is_writable_cell(item.pixel) {
                return if map.cell(item.pixel).is_some() {
                    Err(XError::access())
                } else {
                    Err(XError::value(item.pixel))
                };
            }
        }
    }
    let map = state.registry.colormap_mut(cmap)?;
    for item in items {
        map.store(item.pixel, item.red, item.green, item.blue, item.flags)?;
    }
    Ok(None)
}

pub fn store_named_color(
    state: &mut ServerState,
    flags: u8,
    cmap: ColormapId,
    pixel: u32,
    name: &str,
) -> HandlerResult {
    let (red, green, blue) = lookup_named(name).ok_or(XError::name())?;
    let map = state.registry.colormap_mut(cmap)?;
    map.store(pixel, red, green, blue, flags)?;
    Ok(None)
}

pub fn query_colors(state: &ServerState, cmap: ColormapId, pixels: &[u32]) -> HandlerResult {
    let map = state.registry.colormap(cmap)?;
    let mut colors = Vec::with_capacity(pixels.len());
    for &pixel in pixels {
        colors.push(map.query(pixel)?);
    }
    Ok(Some(Reply::QueryColors { colors }))
}

pub fn lookup_color(state: &ServerState, cmap: ColormapId, name: &str) -> HandlerResult {
    state.registry.colormap(cmap)?;
    let rgb = lookup_named(name).ok_or(XError::name())?;
    Ok(Some(Reply::LookupColor {
        exact: rgb,
        visual: rgb,
    }))
}
