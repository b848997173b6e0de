//! XInput extension request handlers

use crate::input::grabs::DeviceGrab;
use crate::input::xinput::DeviceKind;
use crate::protocol::error::XError;
use crate::protocol::replies::Reply;
use crate::protocol::types::*;
use crate::protocol::xinput::{
    MASTER_KEYBOARD, MASTER_POINTER, XI_ALL_DEVICES, XI_ALL_MASTER_DEVICES, XiEventMask,
    XiRequest, device_event,
};
use crate::server::state::ServerState;

use super::HandlerResult;

pub fn dispatch(state: &mut ServerState, client: ClientId, request: &XiRequest) -> HandlerResult {
    match request {
        XiRequest::GetExtensionVersion { .. } => Ok(Some(Reply::XiGetExtensionVersion {
            present: true,
            major: 2,
            minor: 2,
        })),
        XiRequest::ListInputDevices => Ok(Some(Reply::XiListInputDevices {
            devices: DeviceKind::all().iter().map(|d| d.describe()).collect(),
        })),
        XiRequest::OpenDevice { device } => open_device(state, client, *device),
        XiRequest::CloseDevice { device } => {
            if let Some(session) = state.client_mut(client) {
                session.open_devices.remove(device);
            }
            Ok(None)
        }
        XiRequest::SelectExtensionEvent { window, classes } => {
            select_extension_event(state, client, *window, classes)
        }
        XiRequest::GrabDevice {
            window,
            time,
            this_device_mode: _,
            other_device_mode: _,
            owner_events,
            device,
            classes,
        } => grab_device(state, client, *window, *time, *owner_events, *device, classes),
        XiRequest::UngrabDevice { time, device } => {
            ungrab_device(state, client, *time, *device as u16)
        }
        XiRequest::XiQueryVersion { major, minor } => {
            // never claim more than the client understands
            let (major, minor) = if (*major, *minor) < (2, 2) {
                (*major, *minor)
            } else {
                (2, 2)
            };
            Ok(Some(Reply::XiQueryVersion { major, minor }))
        }
        XiRequest::XiSelectEvents { window, masks } => {
            xi_select_events(state, client, *window, masks)
        }
        XiRequest::XiQueryDevice { deviceid } => xi_query_device(*deviceid),
        XiRequest::XiGrabDevice {
            window,
            time,
            cursor,
            deviceid,
            grab_mode: _,
            paired_device_mode: _,
            owner_events,
            mask,
        } => xi_grab_device(
            state,
            client,
            *window,
            *time,
            *cursor,
            *deviceid,
            *owner_events,
            mask,
        ),
        XiRequest::XiUngrabDevice { time, deviceid } => {
            ungrab_device(state, client, *time, *deviceid)
        }
        XiRequest::Unknown { .. } => Err(XError::request()),
    }
}

fn open_device(state: &mut ServerState, client: ClientId, device: u8) -> HandlerResult {
    let kind = DeviceKind::from_id(device as u16).ok_or(XError::value(device as u32))?;
    if let Some(session) = state.client_mut(client) {
        session.open_devices.insert(device);
    }
    let base = crate::protocol::opcodes::extension::XINPUT_EVENT_BASE;
    // (input class, event type base) pairs: 0 key, 1 button, 2 valuator
    let classes = match kind {
        DeviceKind::Pointer => vec![
            (1, base + device_event::DEVICE_BUTTON_PRESS),
            (2, base + device_event::DEVICE_MOTION_NOTIFY),
        ],
        DeviceKind::Keyboard => vec![(0, base + device_event::DEVICE_KEY_PRESS)],
    };
    Ok(Some(Reply::XiOpenDevice { classes }))
}

fn select_extension_event(
    state: &mut ServerState,
    client: ClientId,
    window: WindowId,
    classes: &[u32],
) -> HandlerResult {
    state.registry.window(window)?;
    for &class in classes {
        let (device, _) = crate::input::xinput::split_class(class);
        if DeviceKind::from_id(device as u16).is_none() {
            return Err(XError::value(class));
        }
    }
    let session = state.client_mut(client).expect("dispatching client exists");
    if classes.is_empty() {
        session.xi1_selections.remove(&window);
    } else {
        session.xi1_selections.insert(window, classes.to_vec());
    }
    Ok(None)
}

fn grab_device(
    state: &mut ServerState,
    client: ClientId,
    window: WindowId,
    time: Timestamp,
    owner_events: bool,
    device: u8,
    classes: &[u32],
) -> HandlerResult {
    state.registry.window(window)?;
    let kind = DeviceKind::from_id(device as u16).ok_or(XError::value(device as u32))?;
    let time = state.resolve_time(time);
    if let Some(existing) = state.grabs.devices.get(&kind.id())
        && existing.client != client
    {
        return Ok(Some(Reply::XiGrabDevice {
            status: grab_status::ALREADY_GRABBED,
        }));
    }
    state.grabs.devices.insert(
        kind.id(),
        DeviceGrab {
            deviceid: kind.id(),
            window,
            client,
            owner_events,
            classes: classes.to_vec(),
            mask: Vec::new(),
            time,
            activating_detail: None,
        },
    );
    Ok(Some(Reply::XiGrabDevice {
        status: grab_status::SUCCESS,
    }))
}

#[allow(clippy::too_many_arguments)]
fn xi_grab_device(
    state: &mut ServerState,
    client: ClientId,
    window: WindowId,
    time: Timestamp,
    cursor: CursorId,
    deviceid: u16,
    owner_events: bool,
    mask: &[u8],
) -> HandlerResult {
    state.registry.window(window)?;
    if cursor != NONE {
        state.registry.cursor(cursor)?;
    }
    let kind = DeviceKind::from_id(deviceid).ok_or(XError::value(deviceid as u32))?;
    let time = state.resolve_time(time);
    if let Some(existing) = state.grabs.devices.get(&kind.id())
        && existing.client != client
    {
        return Ok(Some(Reply::XiGrabDevice {
            status: grab_status::ALREADY_GRABBED,
        }));
    }
    state.grabs.devices.insert(
        kind.id(),
        DeviceGrab {
            deviceid: kind.id(),
            window,
            client,
            owner_events,
            classes: Vec::new(),
            mask: mask.to_vec(),
            time,
            activating_detail: None,
        },
    );
    Ok(Some(Reply::XiGrabDevice {
        status: grab_status::SUCCESS,
    }))
}

fn ungrab_device(
    state: &mut ServerState,
    client: ClientId,
    time: Timestamp,
    deviceid: u16,
) -> HandlerResult {
    let kind = DeviceKind::from_id(deviceid).ok_or(XError::value(deviceid as u32))?;
    let time = state.resolve_time(time);
    if let Some(existing) = state.grabs.devices.get(&kind.id())
        && existing.client == client
        && time >= existing.time
    {
        state.grabs.devices.remove(&kind.id());
    }
    Ok(None)
}

fn xi_select_events(
    state: &mut ServerState,
    client: ClientId,
    window: WindowId,
    masks: &[XiEventMask],
) -> HandlerResult {
    state.registry.window(window)?;
    for mask in masks {
        let valid = matches!(
            mask.deviceid,
            XI_ALL_DEVICES | XI_ALL_MASTER_DEVICES | MASTER_POINTER | MASTER_KEYBOARD
        );
        if !valid {
            return Err(XError::value(mask.deviceid as u32));
        }
    }
    let session = state.client_mut(client).expect("dispatching client exists");
    for mask in masks {
        if mask.mask.iter().all(|&b| b == 0) {
            session.xi2_masks.remove(&(window, mask.deviceid));
        } else {
            session
                .xi2_masks
                .insert((window, mask.deviceid), mask.mask.clone());
        }
    }
    Ok(None)
}

fn xi_query_device(deviceid: u16) -> HandlerResult {
    let devices = match deviceid {
        XI_ALL_DEVICES | XI_ALL_MASTER_DEVICES => {
            DeviceKind::all().iter().map(|d| d.describe()).collect()
        }
        id => vec![
            DeviceKind::from_id(id)
                .ok_or(XError::value(id as u32))?
                .describe(),
        ],
    };
    Ok(Some(Reply::XiQueryDevice { devices }))
}
