//! Event router
//!
//! Decides, for each input occurrence, which clients receive which
//! events. Pointer and keyboard share one pipeline:
//!
//! 1. XI2 raw events selected on the root window
//! 2. an active XInput device grab (suppresses core events)
//! 3. passive device grab activation on press
//! 4. an active core grab, honoring owner-events
//! 5. passive core grab activation on press
//! 6. normal dispatch through window event masks with propagation
//! 7. XI 1.x / 2.x dispatch in parallel with (6)
//!
//! Crossing events are emitted on pointer transitions and on grab
//! activation/release, with details computed by the ancestry walk
//! between the old and new windows.

use tracing::trace;

use crate::input::FocusTarget;
use crate::input::grabs::{ActiveGrab, DeviceGrab, GrabState};
use crate::input::xinput::DeviceKind;
use crate::protocol::events::{Event, InputEventData};
use crate::protocol::types::*;
use crate::protocol::xinput::{
    XiEventMask, device_event, encode_device_event, encode_xi2_device_event,
    encode_xi2_raw_event, xi2_event,
};
use crate::server::state::ServerState;

/// The input occurrences the embedding application can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    ButtonPress(Button),
    ButtonRelease(Button),
    Motion,
    KeyPress(KeyCode),
    KeyRelease(KeyCode),
}

impl Kind {
    fn detail(self) -> u8 {
        match self {
            Kind::ButtonPress(b) | Kind::ButtonRelease(b) => b,
            Kind::Motion => 0,
            Kind::KeyPress(k) | Kind::KeyRelease(k) => k,
        }
    }

    fn is_press(self) -> bool {
        matches!(self, Kind::ButtonPress(_) | Kind::KeyPress(_))
    }

    fn is_release(self) -> bool {
        matches!(self, Kind::ButtonRelease(_) | Kind::KeyRelease(_))
    }

    fn device(self) -> DeviceKind {
        match self {
            Kind::KeyPress(_) | Kind::KeyRelease(_) => DeviceKind::Keyboard,
            _ => DeviceKind::Pointer,
        }
    }

    fn xi1_offset(self) -> u8 {
        match self {
            Kind::ButtonPress(_) => device_event::DEVICE_BUTTON_PRESS,
            Kind::ButtonRelease(_) => device_event::DEVICE_BUTTON_RELEASE,
            Kind::Motion => device_event::DEVICE_MOTION_NOTIFY,
            Kind::KeyPress(_) => device_event::DEVICE_KEY_PRESS,
            Kind::KeyRelease(_) => device_event::DEVICE_KEY_RELEASE,
        }
    }

    fn xi2_type(self) -> u16 {
        match self {
            Kind::ButtonPress(_) => xi2_event::BUTTON_PRESS,
            Kind::ButtonRelease(_) => xi2_event::BUTTON_RELEASE,
            Kind::Motion => xi2_event::MOTION,
            Kind::KeyPress(_) => xi2_event::KEY_PRESS,
            Kind::KeyRelease(_) => xi2_event::KEY_RELEASE,
        }
    }

    fn xi2_raw_type(self) -> u16 {
        match self {
            Kind::ButtonPress(_) => xi2_event::RAW_BUTTON_PRESS,
            Kind::ButtonRelease(_) => xi2_event::RAW_BUTTON_RELEASE,
            Kind::Motion => xi2_event::RAW_MOTION,
            Kind::KeyPress(_) => xi2_event::RAW_KEY_PRESS,
            Kind::KeyRelease(_) => xi2_event::RAW_KEY_RELEASE,
        }
    }

    /// Mask a window selection must intersect for normal dispatch.
    fn required_mask(self, buttons: u16) -> EventMask {
        match self {
            Kind::ButtonPress(_) => EventMask::BUTTON_PRESS,
            Kind::ButtonRelease(_) => EventMask::BUTTON_RELEASE,
            Kind::KeyPress(_) => EventMask::KEY_PRESS,
            Kind::KeyRelease(_) => EventMask::KEY_RELEASE,
            Kind::Motion => {
                let mut mask = EventMask::POINTER_MOTION;
                if buttons != 0 {
                    mask |= EventMask::BUTTON_MOTION;
                    for button in 1..=5u8 {
                        if buttons & state_mask::button_bit(button) != 0 {
                            mask |= EventMask::button_motion(button);
                        }
                    }
                }
                mask
            }
        }
    }

    fn core_event(self, data: InputEventData) -> Event {
        match self {
            Kind::ButtonPress(_) => Event::ButtonPress(data),
            Kind::ButtonRelease(_) => Event::ButtonRelease(data),
            Kind::Motion => Event::MotionNotify(data),
            Kind::KeyPress(_) => Event::KeyPress(data),
            Kind::KeyRelease(_) => Event::KeyRelease(data),
        }
    }
}

/// Inject a pointer move to root coordinates.
pub fn pointer_moved(state: &mut ServerState, x: i16, y: i16) {
    let time = state.now();
    state.input.pointer_x = x;
    state.input.pointer_y = y;
    let old = state.input.pointer_window;
    let new = state.registry.windows.window_at(x, y);
    if new != old {
        emit_crossing(state, old, new, notify_mode::NORMAL, time);
        state.input.pointer_window = new;
    }
    state.input.record_motion(time, x, y, new);
    let wire_state = state.input.state_bits();
    route(state, Kind::Motion, wire_state, time);
}

/// Inject a button transition at the current pointer position.
pub fn button_changed(state: &mut ServerState, button: Button, pressed: bool) {
    let time = state.now();
    // press events carry the state before the transition, releases after
    let wire_state = if pressed {
        let s = state.input.state_bits();
        state.input.press_button(button);
        s
    } else {
        let s = state.input.state_bits();
        state.input.release_button(button);
        s
    };
    let kind = if pressed {
        Kind::ButtonPress(button)
    } else {
        Kind::ButtonRelease(button)
    };
    route(state, kind, wire_state, time);
}

/// Inject a key transition.
pub fn key_changed(state: &mut ServerState, keycode: KeyCode, pressed: bool) {
    let time = state.now();
    let wire_state = state.input.state_bits();
    state.input.set_key(keycode, pressed);
    let kind = if pressed {
        Kind::KeyPress(keycode)
    } else {
        Kind::KeyRelease(keycode)
    };
    route(state, kind, wire_state, time);
}

/// Crossing events for an active pointer grab coming or going.
pub fn pointer_grab_transition(state: &mut ServerState, to_window: WindowId, activating: bool) {
    let time = state.now();
    let from = state.input.pointer_window;
    if from != to_window && state.registry.windows.contains(to_window) {
        let mode = if activating {
            notify_mode::GRAB
        } else {
            notify_mode::UNGRAB
        };
        emit_crossing(state, from, to_window, mode, time);
    }
}

fn route(state: &mut ServerState, kind: Kind, wire_state: u16, time: Timestamp) {
    let device = kind.device();
    let target = match device {
        DeviceKind::Pointer => state.input.pointer_window,
        DeviceKind::Keyboard => focus_target_window(state),
    };
    trace!(
        "Routing {:?} detail {} to window {:#x}",
        kind,
        kind.detail(),
        target
    );

    // 1. XI2 raw events selected on the root window.
    for client in state.clients.values() {
        if client.xi2_selects(ROOT_WINDOW, device, kind.xi2_raw_type()) {
            client.send(encode_xi2_raw_event(
                client.byte_order,
                kind.xi2_raw_type(),
                device.id(),
                kind.detail() as u32,
                client.sequence,
                time,
            ));
        }
    }

    // 2. Active device grab: XI events to the grabbing client only,
    //    core events suppressed.
    if state.grabs.devices.contains_key(&device.id()) {
        deliver_device_grab(state, kind, wire_state, time, target);
        if kind.is_release()
            && let Some(grab) = state.grabs.devices.get(&device.id())
            && grab.activating_detail == Some(kind.detail())
        {
            state.grabs.devices.remove(&device.id());
        }
        return;
    }

    // 3. Passive device grab activation on a press.
    if kind.is_press()
        && let Some(passive) = state
            .grabs
            .find_device_grab(target, device.id(), kind.detail(), wire_state)
            .cloned()
    {
        state.grabs.devices.insert(
            device.id(),
            DeviceGrab {
                deviceid: device.id(),
                window: passive.window,
                client: passive.client,
                owner_events: passive.owner_events,
                classes: Vec::new(),
                mask: passive.mask.clone(),
                time,
                activating_detail: Some(kind.detail()),
            },
        );
        deliver_device_grab(state, kind, wire_state, time, target);
        return;
    }

    // 4. Active core grab.
    let grab_state = match device {
        DeviceKind::Pointer => &state.grabs.pointer,
        DeviceKind::Keyboard => &state.grabs.keyboard,
    };
    match grab_state {
        GrabState::Active(grab) => {
            let grab = grab.clone();
            deliver_via_grab(state, &grab, kind, wire_state, time, target);
            xi_dispatch(state, kind, wire_state, time, target);
            if kind.is_release() && grab.activating_detail == Some(kind.detail()) {
                match device {
                    DeviceKind::Pointer => {
                        state.grabs.pointer = GrabState::Idle;
                        pointer_grab_transition(state, grab.window, false);
                    }
                    DeviceKind::Keyboard => state.grabs.keyboard = GrabState::Idle,
                }
            }
            return;
        }
        GrabState::Replayed => {
            // the replayed press starts over from the passive grabs
            match device {
                DeviceKind::Pointer => state.grabs.pointer = GrabState::Idle,
                DeviceKind::Keyboard => state.grabs.keyboard = GrabState::Idle,
            }
        }
        GrabState::Idle => {}
    }

    // 5. Passive core grab activation on a press: the original window
    //    first, then its ancestors.
    if kind.is_press() {
        let mut scan = vec![target];
        scan.extend(state.registry.windows.ancestors(target));
        for window in scan {
            let passive = match device {
                DeviceKind::Pointer => {
                    state
                        .grabs
                        .find_button_grab(window, kind.detail(), wire_state)
                }
                DeviceKind::Keyboard => {
                    state.grabs.find_key_grab(window, kind.detail(), wire_state)
                }
            };
            if let Some(passive) = passive.cloned() {
                let grab = ActiveGrab {
                    window: passive.window,
                    client: passive.client,
                    owner_events: passive.owner_events,
                    event_mask: passive.event_mask,
                    pointer_mode: passive.pointer_mode,
                    keyboard_mode: passive.keyboard_mode,
                    confine_to: passive.confine_to,
                    cursor: passive.cursor,
                    time,
                    activating_detail: Some(kind.detail()),
                };
                match device {
                    DeviceKind::Pointer => {
                        state.grabs.pointer = GrabState::Active(grab.clone());
                        pointer_grab_transition(state, grab.window, true);
                    }
                    DeviceKind::Keyboard => {
                        state.grabs.keyboard = GrabState::Active(grab.clone())
                    }
                }
                deliver_via_grab(state, &grab, kind, wire_state, time, target);
                xi_dispatch(state, kind, wire_state, time, target);
                return;
            }
        }
    }

    // 6. Normal dispatch with upward propagation.
    normal_dispatch(state, kind, wire_state, time, target);
    // 7. XInput dispatch runs in parallel with (6).
    xi_dispatch(state, kind, wire_state, time, target);
}

/// Keyboard events go to the focus; the pointer window wins while it is
/// inside the focus subtree (and always under PointerRoot focus).
fn focus_target_window(state: &ServerState) -> WindowId {
    match state.input.focus {
        FocusTarget::PointerRoot => state.input.pointer_window,
        FocusTarget::None => ROOT_WINDOW,
        FocusTarget::Window(focus) => {
            let pointer = state.input.pointer_window;
            if pointer == focus || state.registry.windows.is_ancestor(focus, pointer) {
                pointer
            } else {
                focus
            }
        }
    }
}

fn event_data(
    state: &ServerState,
    event_window: WindowId,
    deepest: WindowId,
    kind: Kind,
    wire_state: u16,
    time: Timestamp,
) -> InputEventData {
    let (abs_x, abs_y) = state.registry.windows.absolute_position(event_window);
    InputEventData {
        detail: kind.detail(),
        time,
        root: ROOT_WINDOW,
        event: event_window,
        child: state.registry.windows.child_toward(event_window, deepest),
        root_x: state.input.pointer_x,
        root_y: state.input.pointer_y,
        event_x: state.input.pointer_x - abs_x,
        event_y: state.input.pointer_y - abs_y,
        state: wire_state,
        same_screen: true,
    }
}

fn deliver_via_grab(
    state: &ServerState,
    grab: &ActiveGrab,
    kind: Kind,
    wire_state: u16,
    time: Timestamp,
    target: WindowId,
) {
    let mask = kind.required_mask(state.input.button_bits());
    if grab.event_mask.intersects(mask) {
        let data = event_data(state, grab.window, target, kind, wire_state, time);
        state.deliver_to_client(grab.client, &kind.core_event(data));
    }
    // owner-events: the original window's client may see it too
    if grab.owner_events
        && let Some(window) = state.registry.windows.get(target)
        && window.owner != grab.client
    {
        let owner_mask = window.event_mask_of(window.owner);
        if owner_mask.intersects(mask) {
            let data = event_data(state, target, target, kind, wire_state, time);
            state.deliver_to_client(window.owner, &kind.core_event(data));
        }
    }
}

fn normal_dispatch(
    state: &ServerState,
    kind: Kind,
    wire_state: u16,
    time: Timestamp,
    target: WindowId,
) {
    let mask = kind.required_mask(state.input.button_bits());
    let mut window = target;
    loop {
        let Some(win) = state.registry.windows.get(window) else {
            return;
        };
        if win.all_event_masks().intersects(mask) {
            let data = event_data(state, window, target, kind, wire_state, time);
            let event = kind.core_event(data);
            for (&client_id, &selected) in &win.event_masks {
                if selected.intersects(mask) {
                    state.deliver_to_client(client_id, &event);
                }
            }
            return;
        }
        if win.do_not_propagate_mask.intersects(mask) {
            return;
        }
        match win.parent {
            Some(parent) => window = parent,
            None => return,
        }
    }
}

fn deliver_device_grab(
    state: &ServerState,
    kind: Kind,
    wire_state: u16,
    time: Timestamp,
    target: WindowId,
) {
    let device = kind.device();
    let Some(grab) = state.grabs.devices.get(&device.id()) else {
        return;
    };
    let Some(client) = state.client(grab.client) else {
        return;
    };
    let data = event_data(state, grab.window, target, kind, wire_state, time);
    // XI1 and XI2 masks are checked independently.
    let class = crate::input::xinput::event_class(device.id() as u8, kind.xi1_offset());
    if grab.classes.contains(&class) {
        client.send(encode_device_event(
            client.byte_order,
            kind.xi1_offset(),
            kind.detail(),
            client.sequence,
            time,
            ROOT_WINDOW,
            grab.window,
            data.child,
            data.root_x,
            data.root_y,
            data.event_x,
            data.event_y,
            wire_state,
            device.id() as u8,
        ));
    }
    let xi2_mask = XiEventMask {
        deviceid: device.id(),
        mask: grab.mask.clone(),
    };
    if xi2_mask.selects(kind.xi2_type()) {
        client.send(encode_xi2_device_event(
            client.byte_order,
            kind.xi2_type(),
            device.id(),
            kind.detail() as u32,
            client.sequence,
            time,
            ROOT_WINDOW,
            grab.window,
            data.child,
            data.root_x,
            data.root_y,
            data.event_x,
            data.event_y,
            wire_state as u32,
        ));
    }
}

fn xi_dispatch(
    state: &ServerState,
    kind: Kind,
    wire_state: u16,
    time: Timestamp,
    target: WindowId,
) {
    let device = kind.device();
    let data = event_data(state, target, target, kind, wire_state, time);
    for client in state.clients.values() {
        if client.xi1_selects(target, device, kind.xi1_offset()) {
            client.send(encode_device_event(
                client.byte_order,
                kind.xi1_offset(),
                kind.detail(),
                client.sequence,
                time,
                ROOT_WINDOW,
                target,
                data.child,
                data.root_x,
                data.root_y,
                data.event_x,
                data.event_y,
                wire_state,
                device.id() as u8,
            ));
        }
        if client.xi2_selects(target, device, kind.xi2_type()) {
            client.send(encode_xi2_device_event(
                client.byte_order,
                kind.xi2_type(),
                device.id(),
                kind.detail() as u32,
                client.sequence,
                time,
                ROOT_WINDOW,
                target,
                data.child,
                data.root_x,
                data.root_y,
                data.event_x,
                data.event_y,
                wire_state as u32,
            ));
        }
    }
}

/// Emit Enter/Leave events for a pointer transition from `from` to
/// `to`, with details from the standard ancestry walk.
fn emit_crossing(
    state: &ServerState,
    from: WindowId,
    to: WindowId,
    mode: u8,
    time: Timestamp,
) {
    if from == to {
        return;
    }
    let windows = &state.registry.windows;
    if !windows.contains(from) || !windows.contains(to) {
        return;
    }

    let mut leaves: Vec<(WindowId, u8)> = Vec::new();
    let mut enters: Vec<(WindowId, u8)> = Vec::new();

    if windows.is_ancestor(to, from) {
        // moving out to an ancestor
        leaves.push((from, notify_detail::ANCESTOR));
        for &mid in windows.ancestors(from).iter().take_while(|&&a| a != to) {
            leaves.push((mid, notify_detail::VIRTUAL));
        }
        enters.push((to, notify_detail::INFERIOR));
    } else if windows.is_ancestor(from, to) {
        // moving down into a descendant
        leaves.push((from, notify_detail::INFERIOR));
        let chain: Vec<WindowId> = windows
            .ancestors(to)
            .into_iter()
            .take_while(|&a| a != from)
            .collect();
        for &mid in chain.iter().rev() {
            enters.push((mid, notify_detail::VIRTUAL));
        }
        enters.push((to, notify_detail::ANCESTOR));
    } else {
        // lateral move through a common ancestor
        let mut from_chain = vec![from];
        from_chain.extend(windows.ancestors(from));
        let mut to_chain = vec![to];
        to_chain.extend(windows.ancestors(to));
        let common = from_chain
            .iter()
            .copied()
            .find(|a| to_chain.contains(a))
            .unwrap_or(ROOT_WINDOW);

        leaves.push((from, notify_detail::NONLINEAR));
        for &mid in from_chain[1..].iter().take_while(|&&a| a != common) {
            leaves.push((mid, notify_detail::NONLINEAR_VIRTUAL));
        }
        let down: Vec<WindowId> = to_chain[1..]
            .iter()
            .copied()
            .take_while(|&a| a != common)
            .collect();
        for &mid in down.iter().rev() {
            enters.push((mid, notify_detail::NONLINEAR_VIRTUAL));
        }
        enters.push((to, notify_detail::NONLINEAR));
    }

    let wire_state = state.input.state_bits();
    for (window, detail) in leaves {
        let data = crossing_data(state, window, from, wire_state, time);
        let event = Event::LeaveNotify { detail, mode, data };
        state.deliver_to_selecting(window, EventMask::LEAVE_WINDOW, &event);
    }
    for (window, detail) in enters {
        let data = crossing_data(state, window, to, wire_state, time);
        let event = Event::EnterNotify { detail, mode, data };
        state.deliver_to_selecting(window, EventMask::ENTER_WINDOW, &event);
    }
}

fn crossing_data(
    state: &ServerState,
    window: WindowId,
    toward: WindowId,
    wire_state: u16,
    time: Timestamp,
) -> InputEventData {
    let (abs_x, abs_y) = state.registry.windows.absolute_position(window);
    InputEventData {
        detail: 0,
        time,
        root: ROOT_WINDOW,
        event: window,
        child: state.registry.windows.child_toward(window, toward),
        root_x: state.input.pointer_x,
        root_y: state.input.pointer_y,
        event_x: state.input.pointer_x - abs_x,
        event_y: state.input.pointer_y - abs_y,
        state: wire_state,
        same_screen: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::input::grabs::PassiveGrab;
    use crate::protocol::events::code;
    use crate::protocol::xinput;
    use crate::resources::window::Window as WindowRes;
    use crate::server::client::Client;
    use std::collections::HashMap;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
    use tokio_util::sync::CancellationToken;

    fn state() -> ServerState {
        ServerState::new(&ServerConfig::default())
    }

    fn add_client(state: &mut ServerState) -> (ClientId, UnboundedReceiver<Vec<u8>>) {
        let (id, base, mask) = state.allocate_client_id();
        let (tx, rx) = unbounded_channel();
        state.clients.insert(
            id,
            Client::new(
                id,
                ByteOrder::LittleEndian,
                base,
                mask,
                tx,
                CancellationToken::new(),
            ),
        );
        (id, rx)
    }

    fn add_window(
        state: &mut ServerState,
        id: WindowId,
        parent: WindowId,
        owner: ClientId,
        x: i16,
        y: i16,
        w: u16,
        h: u16,
    ) {
        state.registry.windows.insert(WindowRes {
            id,
            owner,
            parent: Some(parent),
            x,
            y,
            width: w,
            height: h,
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
    }

    fn select(state: &mut ServerState, window: WindowId, client: ClientId, mask: EventMask) {
        state
            .registry
            .windows
            .get_mut(window)
            .unwrap()
            .event_masks
            .insert(client, mask);
    }

    fn drain(rx: &mut UnboundedReceiver<Vec<u8>>) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Ok(bytes) = rx.try_recv() {
            out.push(bytes);
        }
        out
    }

    #[test]
    fn test_button_press_delivery_with_root_coordinates() {
        let mut state = state();
        let (client, mut rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, client, 0, 10, 100, 100);
        select(&mut state, 0x0020_0001, client, EventMask::BUTTON_PRESS);

        pointer_moved(&mut state, 10, 20);
        drain(&mut rx);
        button_changed(&mut state, 1, true);

        let packets = drain(&mut rx);
        assert_eq!(packets.len(), 1);
        let packet = &packets[0];
        assert_eq!(packet.len(), 32);
        assert_eq!(packet[0], code::BUTTON_PRESS);
        assert_eq!(packet[1], 1); // detail
        let event = u32::from_le_bytes([packet[12], packet[13], packet[14], packet[15]]);
        assert_eq!(event, 0x0020_0001);
        let root_x = i16::from_le_bytes([packet[20], packet[21]]);
        let root_y = i16::from_le_bytes([packet[22], packet[23]]);
        assert_eq!((root_x, root_y), (10, 20));
        let event_y = i16::from_le_bytes([packet[26], packet[27]]);
        assert_eq!(event_y, 10); // window sits at y=10
    }

    #[test]
    fn test_release_carries_button_in_state() {
        let mut state = state();
        let (client, mut rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, client, 0, 0, 100, 100);
        select(
            &mut state,
            0x0020_0001,
            client,
            EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
        );
        pointer_moved(&mut state, 5, 5);
        button_changed(&mut state, 1, true);
        drain(&mut rx);
        button_changed(&mut state, 1, false);
        let packets = drain(&mut rx);
        assert_eq!(packets.len(), 1);
        let wire_state = u16::from_le_bytes([packets[0][28], packets[0][29]]);
        assert_eq!(wire_state, 0x0100); // Button1 bit
    }

    #[test]
    fn test_propagation_stops_at_do_not_propagate() {
        let mut state = state();
        let (client, mut rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, client, 0, 0, 100, 100);
        add_window(&mut state, 0x0020_0002, 0x0020_0001, client, 0, 0, 50, 50);
        select(&mut state, 0x0020_0001, client, EventMask::BUTTON_PRESS);
        state
            .registry
            .windows
            .get_mut(0x0020_0002)
            .unwrap()
            .do_not_propagate_mask = EventMask::BUTTON_PRESS;

        pointer_moved(&mut state, 5, 5);
        drain(&mut rx);
        button_changed(&mut state, 1, true);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_propagation_reaches_ancestor() {
        let mut state = state();
        let (client, mut rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, client, 0, 0, 100, 100);
        add_window(&mut state, 0x0020_0002, 0x0020_0001, client, 10, 10, 50, 50);
        select(&mut state, 0x0020_0001, client, EventMask::BUTTON_PRESS);

        pointer_moved(&mut state, 20, 20);
        drain(&mut rx);
        button_changed(&mut state, 1, true);
        let packets = drain(&mut rx);
        assert_eq!(packets.len(), 1);
        // event window is the selecting ancestor, child points toward the press
        let event = u32::from_le_bytes([packets[0][12], packets[0][13], packets[0][14], packets[0][15]]);
        let child = u32::from_le_bytes([packets[0][16], packets[0][17], packets[0][18], packets[0][19]]);
        assert_eq!(event, 0x0020_0001);
        assert_eq!(child, 0x0020_0002);
    }

    #[test]
    fn test_passive_button_grab_activates_and_wins() {
        let mut state = state();
        let (grabber, mut grab_rx) = add_client(&mut state);
        let (other, mut other_rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, other, 0, 0, 100, 100);
        select(&mut state, 0x0020_0001, other, EventMask::BUTTON_PRESS);
        state.grabs.add_button_grab(PassiveGrab {
            window: 0x0020_0001,
            client: grabber,
            detail: 1,
            modifiers: ANY_MODIFIER,
            owner_events: false,
            event_mask: EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
            pointer_mode: GrabMode::Async,
            keyboard_mode: GrabMode::Async,
            confine_to: None,
            cursor: None,
        });

        pointer_moved(&mut state, 5, 5);
        drain(&mut grab_rx);
        drain(&mut other_rx);
        button_changed(&mut state, 1, true);

        assert!(state.grabs.pointer.is_active());
        assert_eq!(state.grabs.pointer.active().unwrap().client, grabber);
        assert_eq!(drain(&mut grab_rx).len(), 1);
        // normal dispatch is suppressed while the grab handles the press
        assert!(drain(&mut other_rx).is_empty());

        // matching release dissolves the grab
        button_changed(&mut state, 1, false);
        assert!(!state.grabs.pointer.is_active());
    }

    #[test]
    fn test_passive_key_grab_activates_keyboard_grab() {
        let mut state = state();
        let (client, _rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, client, 0, 0, 100, 100);
        state.grabs.add_key_grab(PassiveGrab {
            window: 0x0020_0001,
            client,
            detail: 38,
            modifiers: ANY_MODIFIER,
            owner_events: false,
            event_mask: EventMask::KEY_PRESS | EventMask::KEY_RELEASE,
            pointer_mode: GrabMode::Async,
            keyboard_mode: GrabMode::Async,
            confine_to: None,
            cursor: None,
        });

        pointer_moved(&mut state, 5, 5);
        key_changed(&mut state, 38, true);
        assert!(state.grabs.keyboard.is_active());
        assert_eq!(state.grabs.keyboard.active().unwrap().window, 0x0020_0001);
        key_changed(&mut state, 38, false);
        assert!(!state.grabs.keyboard.is_active());
    }

    #[test]
    fn test_active_grab_mask_gates_delivery() {
        let mut state = state();
        let (grabber, mut rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, grabber, 0, 0, 100, 100);
        state.grabs.pointer = GrabState::Active(ActiveGrab {
            window: 0x0020_0001,
            client: grabber,
            owner_events: false,
            event_mask: EventMask::BUTTON_RELEASE,
            pointer_mode: GrabMode::Async,
            keyboard_mode: GrabMode::Async,
            confine_to: None,
            cursor: None,
            time: 0,
            activating_detail: None,
        });
        pointer_moved(&mut state, 5, 5);
        drain(&mut rx);
        button_changed(&mut state, 1, true);
        // press not in the grab mask
        assert!(drain(&mut rx).is_empty());
        button_changed(&mut state, 1, false);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_owner_events_also_delivers_to_window_owner() {
        let mut state = state();
        let (grabber, mut grab_rx) = add_client(&mut state);
        let (owner, mut owner_rx) = add_client(&mut state);
        add_window(&mut state, 0x0040_0001, ROOT_WINDOW, owner, 0, 0, 100, 100);
        select(&mut state, 0x0040_0001, owner, EventMask::BUTTON_PRESS);
        state.grabs.pointer = GrabState::Active(ActiveGrab {
            window: ROOT_WINDOW,
            client: grabber,
            owner_events: true,
            event_mask: EventMask::BUTTON_PRESS,
            pointer_mode: GrabMode::Async,
            keyboard_mode: GrabMode::Async,
            confine_to: None,
            cursor: None,
            time: 0,
            activating_detail: None,
        });
        pointer_moved(&mut state, 5, 5);
        drain(&mut grab_rx);
        drain(&mut owner_rx);
        button_changed(&mut state, 1, true);
        assert_eq!(drain(&mut grab_rx).len(), 1);
        assert_eq!(drain(&mut owner_rx).len(), 1);
    }

    #[test]
    fn test_crossing_events_on_motion() {
        let mut state = state();
        let (client, mut rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, client, 0, 0, 50, 50);
        add_window(&mut state, 0x0020_0002, ROOT_WINDOW, client, 100, 0, 50, 50);
        select(
            &mut state,
            0x0020_0001,
            client,
            EventMask::ENTER_WINDOW | EventMask::LEAVE_WINDOW,
        );
        select(
            &mut state,
            0x0020_0002,
            client,
            EventMask::ENTER_WINDOW | EventMask::LEAVE_WINDOW,
        );

        pointer_moved(&mut state, 10, 10);
        let entering = drain(&mut rx);
        assert_eq!(entering.len(), 1);
        assert_eq!(entering[0][0], code::ENTER_NOTIFY);
        assert_eq!(entering[0][1], notify_detail::NONLINEAR);

        pointer_moved(&mut state, 110, 10);
        let crossing = drain(&mut rx);
        assert_eq!(crossing.len(), 2);
        assert_eq!(crossing[0][0], code::LEAVE_NOTIFY);
        assert_eq!(crossing[1][0], code::ENTER_NOTIFY);
    }

    #[test]
    fn test_crossing_into_child_uses_inferior_detail() {
        let mut state = state();
        let (client, mut rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, client, 0, 0, 100, 100);
        add_window(&mut state, 0x0020_0002, 0x0020_0001, client, 40, 40, 20, 20);
        select(&mut state, 0x0020_0001, client, EventMask::LEAVE_WINDOW);
        select(&mut state, 0x0020_0002, client, EventMask::ENTER_WINDOW);

        pointer_moved(&mut state, 10, 10); // into parent
        drain(&mut rx);
        pointer_moved(&mut state, 45, 45); // into child
        let crossing = drain(&mut rx);
        assert_eq!(crossing.len(), 2);
        assert_eq!(crossing[0][0], code::LEAVE_NOTIFY);
        assert_eq!(crossing[0][1], notify_detail::INFERIOR);
        assert_eq!(crossing[1][0], code::ENTER_NOTIFY);
        assert_eq!(crossing[1][1], notify_detail::ANCESTOR);
    }

    #[test]
    fn test_motion_history_records_through_router() {
        let mut state = state();
        pointer_moved(&mut state, 1, 2);
        pointer_moved(&mut state, 3, 4);
        let records = state.input.motion_between(0, u32::MAX);
        assert_eq!(records.len(), 2);
        assert_eq!((records[1].x, records[1].y), (3, 4));
    }

    #[test]
    fn test_motion_requires_matching_derived_mask() {
        let mut state = state();
        let (client, mut rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, client, 0, 0, 100, 100);
        select(&mut state, 0x0020_0001, client, EventMask::BUTTON1_MOTION);

        pointer_moved(&mut state, 5, 5);
        assert!(drain(&mut rx).is_empty()); // no button held

        button_changed(&mut state, 1, true);
        pointer_moved(&mut state, 6, 6);
        let packets = drain(&mut rx);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0][0], code::MOTION_NOTIFY);
    }

    #[test]
    fn test_raw_events_reach_root_selectors_even_under_grab() {
        let mut state = state();
        let (watcher, mut watcher_rx) = add_client(&mut state);
        let (grabber, _grab_rx) = add_client(&mut state);
        // bit 15 = RawButtonPress
        state
            .clients
            .get_mut(&watcher)
            .unwrap()
            .xi2_masks
            .insert((ROOT_WINDOW, xinput::XI_ALL_MASTER_DEVICES), vec![0, 0x80, 0, 0]);
        state.grabs.pointer = GrabState::Active(ActiveGrab {
            window: ROOT_WINDOW,
            client: grabber,
            owner_events: false,
            event_mask: EventMask::BUTTON_PRESS,
            pointer_mode: GrabMode::Async,
            keyboard_mode: GrabMode::Async,
            confine_to: None,
            cursor: None,
            time: 0,
            activating_detail: None,
        });

        button_changed(&mut state, 1, true);
        let packets = drain(&mut watcher_rx);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0][0], code::GENERIC_EVENT);
        let evtype = u16::from_le_bytes([packets[0][8], packets[0][9]]);
        assert_eq!(evtype, xi2_event::RAW_BUTTON_PRESS);
    }

    #[test]
    fn test_active_device_grab_suppresses_core() {
        let mut state = state();
        let (grabber, mut grab_rx) = add_client(&mut state);
        let (other, mut other_rx) = add_client(&mut state);
        add_window(&mut state, 0x0040_0001, ROOT_WINDOW, other, 0, 0, 100, 100);
        select(&mut state, 0x0040_0001, other, EventMask::BUTTON_PRESS);
        // XI2 device grab selecting ButtonPress (bit 4)
        state.grabs.devices.insert(
            xinput::MASTER_POINTER,
            DeviceGrab {
                deviceid: xinput::MASTER_POINTER,
                window: ROOT_WINDOW,
                client: grabber,
                owner_events: false,
                classes: Vec::new(),
                mask: vec![0x10, 0, 0, 0],
                time: 0,
                activating_detail: None,
            },
        );

        pointer_moved(&mut state, 5, 5);
        drain(&mut grab_rx);
        drain(&mut other_rx);
        button_changed(&mut state, 1, true);

        let grab_packets = drain(&mut grab_rx);
        assert_eq!(grab_packets.len(), 1);
        assert_eq!(grab_packets[0][0], code::GENERIC_EVENT);
        assert!(drain(&mut other_rx).is_empty());
    }

    #[test]
    fn test_keyboard_focus_window_routing() {
        let mut state = state();
        let (client, mut rx) = add_client(&mut state);
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, client, 200, 200, 50, 50);
        select(&mut state, 0x0020_0001, client, EventMask::KEY_PRESS);
        state.input.focus = FocusTarget::Window(0x0020_0001);

        // pointer elsewhere; focus window still receives
        pointer_moved(&mut state, 5, 5);
        drain(&mut rx);
        key_changed(&mut state, 38, true);
        let packets = drain(&mut rx);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0][0], code::KEY_PRESS);
        let event = u32::from_le_bytes([packets[0][12], packets[0][13], packets[0][14], packets[0][15]]);
        assert_eq!(event, 0x0020_0001);
    }
}
