//! Selection and SendEvent handlers

use crate::frontend::Frontend;
use crate::protocol::error::XError;
use crate::protocol::events::{self, Event};
use crate::protocol::replies::Reply;
use crate::protocol::types::*;
use crate::resources::atoms;
use crate::resources::window::Property;
use crate::server::state::{Selection, ServerState};

use super::HandlerResult;

pub fn set_selection_owner(
    state: &mut ServerState,
    owner: WindowId,
    selection: Atom,
    time: Timestamp,
) -> HandlerResult {
    if owner != NONE {
        state.registry.window(owner)?;
    }
    if !state.atoms.exists(selection) {
        return Err(XError::atom(selection));
    }
    let time = state.resolve_time(time);

    let previous = state.selections.get(&selection).copied();
    // stale timestamps never steal ownership
    if let Some(previous) = previous
        && time <= previous.time
    {
        return Ok(None);
    }

    if let Some(previous) = previous
        && previous.owner != NONE
        && previous.owner != owner
        && let Ok(prev_window) = state.registry.window(previous.owner)
    {
        let event = Event::SelectionClear {
            time,
            owner: previous.owner,
            selection,
        };
        state.deliver_to_client(prev_window.owner, &event);
    }

    if owner == NONE {
        state.selections.remove(&selection);
    } else {
        state.selections.insert(selection, Selection { owner, time });
    }
    Ok(None)
}

pub fn get_selection_owner(state: &ServerState, selection: Atom) -> HandlerResult {
    if !state.atoms.exists(selection) {
        return Err(XError::atom(selection));
    }
    Ok(Some(Reply::GetSelectionOwner {
        owner: state
            .selections
            .get(&selection)
            .map(|s| s.owner)
            .unwrap_or(NONE),
    }))
}

pub async fn convert_selection(
    state: &mut ServerState,
    fe: &dyn Frontend,
    requestor: WindowId,
    selection: Atom,
    target: Atom,
    property: Atom,
    time: Timestamp,
) -> HandlerResult {
    state.registry.window(requestor)?;
    if !state.atoms.exists(selection) || !state.atoms.exists(target) {
        return Err(XError::atom(selection));
    }
    let time = state.resolve_time(time);

    if let Some(owner) = state.selections.get(&selection).copied()
        && let Ok(owner_window) = state.registry.window(owner.owner)
    {
        // forward as SelectionRequest to the current owner
        let event = Event::SelectionRequest {
            time,
            owner: owner.owner,
            requestor,
            selection,
            target,
            property,
        };
        state.deliver_to_client(owner_window.owner, &event);
        return Ok(None);
    }

    // no owner: PRIMARY/CLIPBOARD fall back to the frontend clipboard
    let is_clipboard = selection == 1
        || state
            .atoms
            .name(selection)
            .is_some_and(|name| name == "CLIPBOARD");
    let notify_property = if is_clipboard && property != NONE {
        let data = fe
            .clipboard_read()
            .await
            .map_err(|_| XError::implementation())?;
        let win = state.registry.window_mut(requestor)?;
        win.properties.insert(
            property,
            Property {
                property_type: atoms::STRING,
                format: 8,
                data,
            },
        );
        property
    } else {
        NONE
    };

    let event = Event::SelectionNotify {
        time,
        requestor,
        selection,
        target,
        property: notify_property,
    };
    let requestor_client = state.registry.window(requestor)?.owner;
    state.deliver_to_client(requestor_client, &event);
    Ok(None)
}

pub fn send_event(
    state: &mut ServerState,
    destination: WindowId,
    propagate: bool,
    event_mask: EventMask,
    event: &[u8; 32],
) -> HandlerResult {
    // 0 = PointerWindow, 1 = InputFocus
    let window = match destination {
        0 => state.input.pointer_window,
        1 => match state.input.focus {
            crate::input::FocusTarget::Window(w) => w,
            _ => state.input.pointer_window,
        },
        id => id,
    };
    state.registry.window(window)?;

    if event_mask.is_empty() {
        // delivered to the creator of the destination window
        let owner = state.registry.window(window)?.owner;
        if let Some(client) = state.client(owner) {
            client.send(events::mark_sent(event, client.byte_order, client.sequence));
        }
        return Ok(None);
    }

    let mut current = window;
    loop {
        let Some(win) = state.registry.windows.get(current) else {
            return Ok(None);
        };
        let mut delivered = false;
        for (&client_id, &selected) in &win.event_masks {
            if selected.intersects(event_mask)
                && let Some(client) = state.client(client_id)
            {
                client.send(events::mark_sent(event, client.byte_order, client.sequence));
                delivered = true;
            }
        }
        if delivered || !propagate {
            return Ok(None);
        }
        if win.do_not_propagate_mask.intersects(event_mask) {
            return Ok(None);
        }
        match win.parent {
            Some(parent) => current = parent,
            None => return Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::resources::window::Window;
    use std::collections::HashMap;

    fn state_with_window(id: WindowId) -> ServerState {
        let mut state = ServerState::new(&ServerConfig::default());
        state.registry.windows.insert(Window {
            id,
            owner: 1,
            parent: Some(ROOT_WINDOW),
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            border_width: 0,
            depth: 24,
            visual: ROOT_VISUAL,
            class: WindowClass::InputOutput,
            mapped: true,
            override_redirect: false,
            save_under: false,
            bit_gravity: 0,
            win_gravity: 1,
            background_pixel: None,
            background_pixmap: None,
            border_pixel: None,
            colormap: DEFAULT_COLORMAP,
            cursor: None,
            children: Vec::new(),
            event_masks: HashMap::new(),
            do_not_propagate_mask: EventMask::empty(),
            properties: HashMap::new(),
        });
        state
    }

    #[test]
    fn test_set_selection_owner_and_get() {
        let window = 0x0020_0001;
        let mut state = state_with_window(window);
        set_selection_owner(&mut state, window, 1, 100).unwrap();
        let Reply::GetSelectionOwner { owner } =
            get_selection_owner(&state, 1).unwrap().unwrap()
        else {
            panic!("expected GetSelectionOwner reply");
        };
        assert_eq!(owner, window);
    }

    #[test]
    fn test_stale_timestamp_does_not_steal_ownership() {
        let first = 0x0020_0001;
        let second = 0x0020_0002;
        let mut state = state_with_window(first);
        state.registry.windows.insert(Window {
            id: second,
            ..state.registry.windows.get(first).unwrap().clone()
        });
        state.registry.windows.get_mut(second).unwrap().parent = Some(ROOT_WINDOW);

        set_selection_owner(&mut state, first, 1, 200).unwrap();
        set_selection_owner(&mut state, second, 1, 150).unwrap();
        assert_eq!(state.selections[&1].owner, first);

        set_selection_owner(&mut state, second, 1, 300).unwrap();
        assert_eq!(state.selections[&1].owner, second);
    }

    #[test]
    fn test_current_time_is_substituted() {
        let window = 0x0020_0001;
        let mut state = state_with_window(window);
        set_selection_owner(&mut state, window, 1, CURRENT_TIME).unwrap();
        // the recorded time is the server clock at request time
        assert!(state.selections[&1].time <= state.now());
        assert_eq!(state.selections[&1].owner, window);
    }

    #[test]
    fn test_owner_none_clears_selection() {
        let window = 0x0020_0001;
        let mut state = state_with_window(window);
        set_selection_owner(&mut state, window, 1, 100).unwrap();
        set_selection_owner(&mut state, NONE, 1, 200).unwrap();
        assert!(state.selections.is_empty());
    }

    #[test]
    fn test_unknown_selection_atom_is_atom_error() {
        let mut state = state_with_window(0x0020_0001);
        let err = get_selection_owner(&state, 9999).unwrap_err();
        assert_eq!(err, XError::atom(9999));
    }
}
