//! Grab request handlers
//!
//! Active grabs are granted or refused with a status reply; passive
//! grabs are installed on their window and wait for a matching press.
//! GrabServer defers every other client until release.

use tracing::debug;

use crate::input::grabs::{ActiveGrab, GrabState, PassiveGrab};
use crate::input::router;
use crate::protocol::error::XError;
use crate::protocol::replies::Reply;
use crate::protocol::types::*;
use crate::server::state::ServerState;

use super::HandlerResult;

#[allow(clippy::too_many_arguments)]
pub fn grab_pointer(
    state: &mut ServerState,
    client: ClientId,
    owner_events: bool,
    grab_window: WindowId,
    event_mask: EventMask,
    pointer_mode: GrabMode,
    keyboard_mode: GrabMode,
    confine_to: WindowId,
    cursor: CursorId,
    time: Timestamp,
) -> HandlerResult {
    state.registry.window(grab_window)?;
    if confine_to != NONE {
        state.registry.window(confine_to)?;
    }
    if cursor != NONE {
        state.registry.cursor(cursor)?;
    }
    let time = state.resolve_time(time);

    if let Some(active) = state.grabs.pointer.active() {
        if active.client != client {
            return Ok(Some(Reply::GrabPointer {
                status: grab_status::ALREADY_GRABBED,
            }));
        }
        if time < active.time {
            return Ok(Some(Reply::GrabPointer {
                status: grab_status::INVALID_TIME,
            }));
        }
    }
    if !state.registry.windows.is_viewable(grab_window) {
        return Ok(Some(Reply::GrabPointer {
            status: grab_status::NOT_VIEWABLE,
        }));
    }

    state.grabs.pointer = GrabState::Active(ActiveGrab {
        window: grab_window,
        client,
        owner_events,
        event_mask,
        pointer_mode,
        keyboard_mode,
        confine_to: (confine_to != NONE).then_some(confine_to),
        cursor: (cursor != NONE).then_some(cursor),
        time,
        activating_detail: None,
    });
    router::pointer_grab_transition(state, grab_window, true);
    debug!("Pointer grab activated for client {} on {:#x}", client, grab_window);
    Ok(Some(Reply::GrabPointer {
        status: grab_status::SUCCESS,
    }))
}

pub fn ungrab_pointer(state: &mut ServerState, client: ClientId, time: Timestamp) -> HandlerResult {
    let time = state.resolve_time(time);
    if let Some(active) = state.grabs.pointer.active()
        && active.client == client
        && time >= active.time
    {
        let window = active.window;
        state.grabs.pointer = GrabState::Idle;
        router::pointer_grab_transition(state, window, false);
    }
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub fn grab_button(
    state: &mut ServerState,
    client: ClientId,
    owner_events: bool,
    grab_window: WindowId,
    event_mask: EventMask,
    pointer_mode: GrabMode,
    keyboard_mode: GrabMode,
    confine_to: WindowId,
    cursor: CursorId,
    button: Button,
    modifiers: u16,
) -> HandlerResult {
    state.registry.window(grab_window)?;
    if confine_to != NONE {
        state.registry.window(confine_to)?;
    }
    if cursor != NONE {
        state.registry.cursor(cursor)?;
    }
    state.grabs.add_button_grab(PassiveGrab {
        window: grab_window,
        client,
        detail: button,
        modifiers,
        owner_events,
        event_mask,
        pointer_mode,
        keyboard_mode,
        confine_to: (confine_to != NONE).then_some(confine_to),
        cursor: (cursor != NONE).then_some(cursor),
    });
    Ok(None)
}

pub fn ungrab_button(
    state: &mut ServerState,
    grab_window: WindowId,
    button: Button,
    modifiers: u16,
) -> HandlerResult {
    state.registry.window(grab_window)?;
    state.grabs.remove_button_grab(grab_window, button, modifiers);
    Ok(None)
}

pub fn change_active_pointer_grab(
    state: &mut ServerState,
    client: ClientId,
    cursor: CursorId,
    time: Timestamp,
    event_mask: EventMask,
) -> HandlerResult {
    if cursor != NONE {
        state.registry.cursor(cursor)?;
    }
    let time = state.resolve_time(time);
    if let GrabState::Active(active) = &mut state.grabs.pointer
        && active.client == client
        && time >= active.time
    {
        active.event_mask = event_mask;
        active.cursor = (cursor != NONE).then_some(cursor);
    }
    Ok(None)
}

pub fn grab_keyboard(
    state: &mut ServerState,
    client: ClientId,
    owner_events: bool,
    grab_window: WindowId,
    time: Timestamp,
    pointer_mode: GrabMode,
    keyboard_mode: GrabMode,
) -> HandlerResult {
    state.registry.window(grab_window)?;
    let time = state.resolve_time(time);

    if let Some(active) = state.grabs.keyboard.active() {
        if active.client != client {
            return Ok(Some(Reply::GrabKeyboard {
                status: grab_status::ALREADY_GRABBED,
            }));
        }
        if time < active.time {
            return Ok(Some(Reply::GrabKeyboard {
                status: grab_status::INVALID_TIME,
            }));
        }
    }
    if !state.registry.windows.is_viewable(grab_window) {
        return Ok(Some(Reply::GrabKeyboard {
            status: grab_status::NOT_VIEWABLE,
        }));
    }

    state.grabs.keyboard = GrabState::Active(ActiveGrab {
        window: grab_window,
        client,
        owner_events,
        event_mask: EventMask::KEY_PRESS | EventMask::KEY_RELEASE,
        pointer_mode,
        keyboard_mode,
        confine_to: None,
        cursor: None,
        time,
        activating_detail: None,
    });
    Ok(Some(Reply::GrabKeyboard {
        status: grab_status::SUCCESS,
    }))
}

pub fn ungrab_keyboard(
    state: &mut ServerState,
    client: ClientId,
    time: Timestamp,
) -> HandlerResult {
    let time = state.resolve_time(time);
    if let Some(active) = state.grabs.keyboard.active()
        && active.client == client
        && time >= active.time
    {
        state.grabs.keyboard = GrabState::Idle;
    }
    Ok(None)
}

pub fn grab_key(
    state: &mut ServerState,
    client: ClientId,
    owner_events: bool,
    grab_window: WindowId,
    modifiers: u16,
    key: KeyCode,
    pointer_mode: GrabMode,
    keyboard_mode: GrabMode,
) -> HandlerResult {
    state.registry.window(grab_window)?;
    state.grabs.add_key_grab(PassiveGrab {
        window: grab_window,
        client,
        detail: key,
        modifiers,
        owner_events,
        event_mask: EventMask::KEY_PRESS | EventMask::KEY_RELEASE,
        pointer_mode,
        keyboard_mode,
        confine_to: None,
        cursor: None,
    });
    Ok(None)
}

pub fn ungrab_key(
    state: &mut ServerState,
    grab_window: WindowId,
    key: KeyCode,
    modifiers: u16,
) -> HandlerResult {
    state.registry.window(grab_window)?;
    state.grabs.remove_key_grab(grab_window, key, modifiers);
    Ok(None)
}

/// Only the replay modes change state in this implementation: both
/// grabs run asynchronously, so the Async/Sync modes have nothing to
/// thaw.
pub fn allow_events(
    state: &mut ServerState,
    client: ClientId,
    mode: AllowEventsMode,
    _time: Timestamp,
) -> HandlerResult {
    match mode {
        AllowEventsMode::ReplayPointer => {
            if state.grabs.pointer.active().is_some_and(|g| g.client == client) {
                state.grabs.pointer = GrabState::Replayed;
            }
        }
        AllowEventsMode::ReplayKeyboard => {
            if state
                .grabs
                .keyboard
                .active()
                .is_some_and(|g| g.client == client)
            {
                state.grabs.keyboard = GrabState::Replayed;
            }
        }
        _ => {}
    }
    Ok(None)
}

pub fn grab_server(state: &mut ServerState, client: ClientId) -> HandlerResult {
    state.server_grab = Some(client);
    debug!("Server grabbed by client {}", client);
    Ok(None)
}

pub fn ungrab_server(state: &mut ServerState, client: ClientId) -> HandlerResult {
    if state.server_grab == Some(client) {
        state.server_grab = None;
        state.signal_grab_released();
        debug!("Server grab released by client {}", client);
    }
    Ok(None)
}
