//! Pointer, keyboard and focus request handlers

use crate::frontend::Frontend;
use crate::input::FocusTarget;
use crate::input::router;
use crate::protocol::error::XError;
use crate::protocol::events::Event;
use crate::protocol::replies::Reply;
use crate::protocol::requests::KeyboardControlValues;
use crate::protocol::types::*;
use crate::server::state::ServerState;

use super::HandlerResult;

pub fn query_pointer(state: &ServerState, window: WindowId) -> HandlerResult {
    state.registry.window(window)?;
    let (abs_x, abs_y) = state.registry.windows.absolute_position(window);
    Ok(Some(Reply::QueryPointer {
        same_screen: true,
        root: ROOT_WINDOW,
        child: state
            .registry
            .windows
            .child_toward(window, state.input.pointer_window),
        root_x: state.input.pointer_x,
        root_y: state.input.pointer_y,
        win_x: state.input.pointer_x - abs_x,
        win_y: state.input.pointer_y - abs_y,
        mask: state.input.state_bits(),
    }))
}

pub fn get_motion_events(
    state: &ServerState,
    window: WindowId,
    start: Timestamp,
    stop: Timestamp,
) -> HandlerResult {
    state.registry.window(window)?;
    let stop = state.resolve_time(stop);
    let events = state
        .input
        .motion_between(start, stop)
        .into_iter()
        .map(|r| (r.time, r.x, r.y))
        .collect();
    Ok(Some(Reply::GetMotionEvents { events }))
}

pub fn translate_coordinates(
    state: &ServerState,
    src_window: WindowId,
    dst_window: WindowId,
    src_x: i16,
    src_y: i16,
) -> HandlerResult {
    state.registry.window(src_window)?;
    state.registry.window(dst_window)?;
    let (src_abs_x, src_abs_y) = state.registry.windows.absolute_position(src_window);
    let (dst_abs_x, dst_abs_y) = state.registry.windows.absolute_position(dst_window);
    let root_x = src_abs_x + src_x;
    let root_y = src_abs_y + src_y;
    Ok(Some(Reply::TranslateCoordinates {
        same_screen: true,
        child: state
            .registry
            .windows
            .child_toward(dst_window, state.registry.windows.window_at(root_x, root_y)),
        dst_x: root_x - dst_abs_x,
        dst_y: root_y - dst_abs_y,
    }))
}

#[allow(clippy::too_many_arguments)]
pub fn warp_pointer(
    state: &mut ServerState,
    src_window: WindowId,
    dst_window: WindowId,
    src_x: i16,
    src_y: i16,
    src_width: u16,
    src_height: u16,
    dst_x: i16,
    dst_y: i16,
) -> HandlerResult {
    if src_window != NONE {
        state.registry.window(src_window)?;
    }
    if dst_window != NONE {
        state.registry.window(dst_window)?;
    }

    if src_window != NONE {
        // the pointer must currently be inside the source rectangle
        let (abs_x, abs_y) = state.registry.windows.absolute_position(src_window);
        let x = state.input.pointer_x - abs_x - src_x;
        let y = state.input.pointer_y - abs_y - src_y;
        let geom = state.registry.window(src_window)?;
        let width = if src_width == 0 {
            geom.width as i16 - src_x
        } else {
            src_width as i16
        };
        let height = if src_height == 0 {
            geom.height as i16 - src_y
        } else {
            src_height as i16
        };
        if x < 0 || y < 0 || x >= width || y >= height {
            return Ok(None);
        }
    }

    let (new_x, new_y) = if dst_window == NONE {
        (
            state.input.pointer_x + dst_x,
            state.input.pointer_y + dst_y,
        )
    } else {
        let (abs_x, abs_y) = state.registry.windows.absolute_position(dst_window);
        (abs_x + dst_x, abs_y + dst_y)
    };
    router::pointer_moved(state, new_x, new_y);
    Ok(None)
}

pub fn set_input_focus(
    state: &mut ServerState,
    revert_to: RevertTo,
    focus: WindowId,
    _time: Timestamp,
) -> HandlerResult {
    let new_focus = match focus {
        NONE => FocusTarget::None,
        POINTER_ROOT => FocusTarget::PointerRoot,
        id => {
            state.registry.window(id)?;
            if !state.registry.windows.is_viewable(id) {
                return Err(XError::match_error());
            }
            FocusTarget::Window(id)
        }
    };
    let old_focus = state.input.focus;
    if old_focus == new_focus {
        state.input.focus_revert = revert_to;
        return Ok(None);
    }

    if let FocusTarget::Window(old) = old_focus
        && state.registry.windows.contains(old)
    {
        let event = Event::FocusOut {
            detail: notify_detail::NONLINEAR,
            event: old,
            mode: notify_mode::NORMAL,
        };
        state.deliver_to_selecting(old, EventMask::FOCUS_CHANGE, &event);
    }
    if let FocusTarget::Window(new) = new_focus {
        let event = Event::FocusIn {
            detail: notify_detail::NONLINEAR,
            event: new,
            mode: notify_mode::NORMAL,
        };
        state.deliver_to_selecting(new, EventMask::FOCUS_CHANGE, &event);
    }
    state.input.focus = new_focus;
    state.input.focus_revert = revert_to;
    Ok(None)
}

pub fn get_input_focus(state: &ServerState) -> HandlerResult {
    Ok(Some(Reply::GetInputFocus {
        revert_to: state.input.focus_revert,
        focus: state.input.focus.to_wire(),
    }))
}

pub fn query_keymap(state: &ServerState) -> HandlerResult {
    Ok(Some(Reply::QueryKeymap {
        keys: state.input.keys_down,
    }))
}

pub fn get_keyboard_mapping(state: &ServerState, first_keycode: KeyCode, count: u8) -> HandlerResult {
    if first_keycode < state.input.first_keycode {
        return Err(XError::value(first_keycode as u32));
    }
    let per = state.input.keysyms_per_keycode as usize;
    let start = (first_keycode - state.input.first_keycode) as usize * per;
    let len = count as usize * per;
    let keysyms = state
        .input
        .keysyms
        .iter()
        .skip(start)
        .take(len)
        .copied()
        .collect();
    Ok(Some(Reply::GetKeyboardMapping {
        keysyms_per_keycode: state.input.keysyms_per_keycode,
        keysyms,
    }))
}

pub fn change_keyboard_mapping(
    state: &mut ServerState,
    first_keycode: KeyCode,
    keysyms_per_keycode: u8,
    keysyms: &[u32],
) -> HandlerResult {
    if first_keycode < state.input.first_keycode {
        return Err(XError::value(first_keycode as u32));
    }
    let count = if keysyms_per_keycode == 0 {
        0
    } else {
        keysyms.len() / keysyms_per_keycode as usize
    };
    let per = state.input.keysyms_per_keycode as usize;
    if keysyms_per_keycode as usize != per {
        // keep the table rectangular; remap wholesale instead
        state.input.keysyms_per_keycode = keysyms_per_keycode;
        let total =
            (255 - state.input.first_keycode as usize + 1) * keysyms_per_keycode as usize;
        state.input.keysyms = vec![0; total];
    }
    let per = state.input.keysyms_per_keycode as usize;
    let start = (first_keycode - state.input.first_keycode) as usize * per;
    for (i, &keysym) in keysyms.iter().enumerate() {
        if let Some(slot) = state.input.keysyms.get_mut(start + i) {
            *slot = keysym;
        }
    }

    let event = Event::MappingNotify {
        request: 1, // Keyboard
        first_keycode,
        count: count as u8,
    };
    for client in state.clients.values() {
        client.send_event(&event);
    }
    Ok(None)
}

pub async fn change_keyboard_control(
    state: &mut ServerState,
    fe: &dyn Frontend,
    values: &KeyboardControlValues,
) -> HandlerResult {
    let control = &mut state.input.keyboard_control;
    if let Some(v) = values.key_click_percent {
        control.key_click_percent = if v < 0 { 50 } else { v as u8 };
    }
    if let Some(v) = values.bell_percent {
        control.bell_percent = if v < 0 { 50 } else { v as u8 };
    }
    if let Some(v) = values.bell_pitch {
        control.bell_pitch = if v < 0 { 400 } else { v as u16 };
    }
    if let Some(v) = values.bell_duration {
        control.bell_duration = if v < 0 { 100 } else { v as u16 };
    }
    if let Some(led) = values.led {
        let mode_on = values.led_mode == Some(1);
        if mode_on {
            control.led_mask |= 1 << (led.saturating_sub(1));
        } else {
            control.led_mask &= !(1 << (led.saturating_sub(1)));
        }
    } else if let Some(mode) = values.led_mode {
        control.led_mask = if mode == 1 { u32::MAX } else { 0 };
    }
    if let Some(v) = values.auto_repeat_mode {
        // 0 off, 1 on, 2 default
        control.global_auto_repeat = if v == 2 { 1 } else { v };
    }
    fe.set_keyboard_control(values)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub fn get_keyboard_control(state: &ServerState) -> HandlerResult {
    let control = &state.input.keyboard_control;
    Ok(Some(Reply::GetKeyboardControl {
        global_auto_repeat: control.global_auto_repeat,
        led_mask: control.led_mask,
        key_click_percent: control.key_click_percent,
        bell_percent: control.bell_percent,
        bell_pitch: control.bell_pitch,
        bell_duration: control.bell_duration,
        auto_repeats: [0xff; 32],
    }))
}

pub async fn bell(state: &ServerState, fe: &dyn Frontend, percent: i8) -> HandlerResult {
    if !(-100..=100).contains(&percent) {
        return Err(XError::value(percent as u32));
    }
    let _ = state; // volume blending is the frontend's concern
    fe.bell(percent).await.map_err(|_| XError::implementation())?;
    Ok(None)
}

pub async fn change_pointer_control(
    state: &mut ServerState,
    fe: &dyn Frontend,
    acceleration_numerator: i16,
    acceleration_denominator: i16,
    threshold: i16,
    do_acceleration: bool,
    do_threshold: bool,
) -> HandlerResult {
    if do_acceleration {
        if acceleration_denominator == 0 {
            return Err(XError::value(0));
        }
        state.input.pointer_control.acceleration_numerator = acceleration_numerator;
        state.input.pointer_control.acceleration_denominator = acceleration_denominator;
    }
    if do_threshold {
        state.input.pointer_control.threshold = threshold;
    }
    fe.set_pointer_control(
        (acceleration_numerator, acceleration_denominator),
        threshold,
    )
    .await
    .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub fn get_pointer_control(state: &ServerState) -> HandlerResult {
    let control = &state.input.pointer_control;
    Ok(Some(Reply::GetPointerControl {
        acceleration_numerator: control.acceleration_numerator as u16,
        acceleration_denominator: control.acceleration_denominator as u16,
        threshold: control.threshold as u16,
    }))
}

pub async fn set_screen_saver(
    state: &mut ServerState,
    fe: &dyn Frontend,
    timeout: i16,
    interval: i16,
    prefer_blanking: u8,
    allow_exposures: u8,
) -> HandlerResult {
    if prefer_blanking > 2 || allow_exposures > 2 {
        return Err(XError::value(prefer_blanking.max(allow_exposures) as u32));
    }
    let saver = &mut state.input.screen_saver;
    if timeout >= 0 {
        saver.timeout = timeout;
    }
    if interval >= 0 {
        saver.interval = interval;
    }
    if prefer_blanking < 2 {
        saver.prefer_blanking = prefer_blanking;
    }
    if allow_exposures < 2 {
        saver.allow_exposures = allow_exposures;
    }
    fe.set_screen_saver(timeout, interval, prefer_blanking, allow_exposures)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub fn get_screen_saver(state: &ServerState) -> HandlerResult {
    let saver = &state.input.screen_saver;
    Ok(Some(Reply::GetScreenSaver {
        timeout: saver.timeout as u16,
        interval: saver.interval as u16,
        prefer_blanking: saver.prefer_blanking,
        allow_exposures: saver.allow_exposures,
    }))
}

pub async fn force_screen_saver(
    fe: &dyn Frontend,
    activate: bool,
) -> HandlerResult {
    fe.force_screen_saver(activate)
        .await
        .map_err(|_| XError::implementation())?;
    Ok(None)
}

pub fn set_pointer_mapping(state: &mut ServerState, map: &[u8]) -> HandlerResult {
    if map.len() != state.input.pointer_mapping.len() {
        return Err(XError::value(map.len() as u32));
    }
    // refuse to remap a pressed button
    if state.input.any_button_down() {
        return Ok(Some(Reply::SetPointerMapping { status: 1 }));
    }
    state.input.pointer_mapping = map.to_vec();
    let event = Event::MappingNotify {
        request: 2, // Pointer
        first_keycode: 0,
        count: 0,
    };
    for client in state.clients.values() {
        client.send_event(&event);
    }
    Ok(Some(Reply::SetPointerMapping { status: 0 }))
}

pub fn get_pointer_mapping(state: &ServerState) -> HandlerResult {
    Ok(Some(Reply::GetPointerMapping {
        map: state.input.pointer_mapping.clone(),
    }))
}

pub fn set_modifier_mapping(
    state: &mut ServerState,
    keycodes_per_modifier: u8,
    keycodes: &[KeyCode],
) -> HandlerResult {
    if keycodes.len() != 8 * keycodes_per_modifier as usize {
        return Err(XError::length());
    }
    state.input.keycodes_per_modifier = keycodes_per_modifier;
    state.input.modifier_keycodes = keycodes.to_vec();
    let event = Event::MappingNotify {
        request: 0, // Modifier
        first_keycode: 0,
        count: 0,
    };
    for client in state.clients.values() {
        client.send_event(&event);
    }
    Ok(Some(Reply::SetModifierMapping { status: 0 }))
}

pub fn get_modifier_mapping(state: &ServerState) -> HandlerResult {
    Ok(Some(Reply::GetModifierMapping {
        keycodes_per_modifier: state.input.keycodes_per_modifier,
        keycodes: state.input.modifier_keycodes.clone(),
    }))
}
