//! XInput extension wire subset
//!
//! The server advertises a single XInput major opcode; the request's
//! data byte carries the minor opcode. Supported minors cover the XInput
//! 1.x device surface (open/list/select/grab) and the XInput 2 entry
//! points (version/select/query/grab). XI2 events ride on GenericEvent
//! frames; XI1 device events mirror the core input events with the
//! device ID in the trailing byte.

use super::opcodes::extension;
use super::requests::ParseError;
use super::types::*;
use super::wire::{ByteOrderReader, ByteOrderWriter};

/// XInput minor opcodes.
pub mod minor {
    pub const GET_EXTENSION_VERSION: u8 = 1;
    pub const LIST_INPUT_DEVICES: u8 = 2;
    pub const OPEN_DEVICE: u8 = 3;
    pub const CLOSE_DEVICE: u8 = 4;
    pub const SELECT_EXTENSION_EVENT: u8 = 6;
    pub const GRAB_DEVICE: u8 = 13;
    pub const UNGRAB_DEVICE: u8 = 14;
    pub const XI_SELECT_EVENTS: u8 = 46;
    pub const XI_QUERY_VERSION: u8 = 47;
    pub const XI_QUERY_DEVICE: u8 = 48;
    pub const XI_GRAB_DEVICE: u8 = 51;
    pub const XI_UNGRAB_DEVICE: u8 = 52;
}

/// XI2 device wildcard: every device.
pub const XI_ALL_DEVICES: u16 = 0;
/// XI2 device wildcard: every master device. This is the canonical
/// meaning of the value 1 per the XInput 2 specification.
pub const XI_ALL_MASTER_DEVICES: u16 = 1;
/// The two devices this server exposes.
pub const MASTER_POINTER: u16 = 2;
pub const MASTER_KEYBOARD: u16 = 3;

/// XI2 event type numbers (mask bit = event type).
pub mod xi2_event {
    pub const KEY_PRESS: u16 = 2;
    pub const KEY_RELEASE: u16 = 3;
    pub const BUTTON_PRESS: u16 = 4;
    pub const BUTTON_RELEASE: u16 = 5;
    pub const MOTION: u16 = 6;
    pub const RAW_KEY_PRESS: u16 = 13;
    pub const RAW_KEY_RELEASE: u16 = 14;
    pub const RAW_BUTTON_PRESS: u16 = 15;
    pub const RAW_BUTTON_RELEASE: u16 = 16;
    pub const RAW_MOTION: u16 = 17;
}

/// XI1 fixed event offsets, added to the extension's event base.
pub mod device_event {
    pub const DEVICE_KEY_PRESS: u8 = 1;
    pub const DEVICE_KEY_RELEASE: u8 = 2;
    pub const DEVICE_BUTTON_PRESS: u8 = 3;
    pub const DEVICE_BUTTON_RELEASE: u8 = 4;
    pub const DEVICE_MOTION_NOTIFY: u8 = 5;
}

/// An XI2 event-mask selection for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XiEventMask {
    pub deviceid: u16,
    /// Little bag of bits, bit N selects event type N.
    pub mask: Vec<u8>,
}

impl XiEventMask {
    pub fn selects(&self, event_type: u16) -> bool {
        let byte = (event_type / 8) as usize;
        let bit = event_type % 8;
        self.mask.get(byte).is_some_and(|b| b & (1 << bit) != 0)
    }
}

/// Parsed XInput requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XiRequest {
    GetExtensionVersion {
        name: String,
    },
    ListInputDevices,
    OpenDevice {
        device: u8,
    },
    CloseDevice {
        device: u8,
    },
    SelectExtensionEvent {
        window: WindowId,
        /// Event classes: (device id << 8) | event offset.
        classes: Vec<u32>,
    },
    GrabDevice {
        window: WindowId,
        time: Timestamp,
        this_device_mode: GrabMode,
        other_device_mode: GrabMode,
        owner_events: bool,
        device: u8,
        classes: Vec<u32>,
    },
    UngrabDevice {
        time: Timestamp,
        device: u8,
    },
    XiQueryVersion {
        major: u16,
        minor: u16,
    },
    XiSelectEvents {
        window: WindowId,
        masks: Vec<XiEventMask>,
    },
    XiQueryDevice {
        deviceid: u16,
    },
    XiGrabDevice {
        window: WindowId,
        time: Timestamp,
        cursor: CursorId,
        deviceid: u16,
        grab_mode: GrabMode,
        paired_device_mode: GrabMode,
        owner_events: bool,
        mask: Vec<u8>,
    },
    XiUngrabDevice {
        time: Timestamp,
        deviceid: u16,
    },
    Unknown {
        minor: u8,
    },
}

impl XiRequest {
    pub fn minor_opcode(&self) -> u8 {
        match self {
            XiRequest::GetExtensionVersion { .. } => minor::GET_EXTENSION_VERSION,
            XiRequest::ListInputDevices => minor::LIST_INPUT_DEVICES,
            XiRequest::OpenDevice { .. } => minor::OPEN_DEVICE,
            XiRequest::CloseDevice { .. } => minor::CLOSE_DEVICE,
            XiRequest::SelectExtensionEvent { .. } => minor::SELECT_EXTENSION_EVENT,
            XiRequest::GrabDevice { .. } => minor::GRAB_DEVICE,
            XiRequest::UngrabDevice { .. } => minor::UNGRAB_DEVICE,
            XiRequest::XiQueryVersion { .. } => minor::XI_QUERY_VERSION,
            XiRequest::XiSelectEvents { .. } => minor::XI_SELECT_EVENTS,
            XiRequest::XiQueryDevice { .. } => minor::XI_QUERY_DEVICE,
            XiRequest::XiGrabDevice { .. } => minor::XI_GRAB_DEVICE,
            XiRequest::XiUngrabDevice { .. } => minor::XI_UNGRAB_DEVICE,
            XiRequest::Unknown { minor } => *minor,
        }
    }
}

pub fn parse_request(
    minor_opcode: u8,
    r: &mut ByteOrderReader<'_>,
) -> Result<XiRequest, ParseError> {
    let req = match minor_opcode {
        minor::GET_EXTENSION_VERSION => {
            let name_len = r.read_u16()? as usize;
            r.skip(2)?;
            XiRequest::GetExtensionVersion {
                name: r.read_string(name_len)?,
            }
        }
        minor::LIST_INPUT_DEVICES => XiRequest::ListInputDevices,
        minor::OPEN_DEVICE => XiRequest::OpenDevice {
            device: r.read_u8()?,
        },
        minor::CLOSE_DEVICE => XiRequest::CloseDevice {
            device: r.read_u8()?,
        },
        minor::SELECT_EXTENSION_EVENT => {
            let window = r.read_u32()?;
            let count = r.read_u16()? as usize;
            r.skip(2)?;
            let mut classes = Vec::with_capacity(count);
            for _ in 0..count {
                classes.push(r.read_u32()?);
            }
            XiRequest::SelectExtensionEvent { window, classes }
        }
        minor::GRAB_DEVICE => {
            let window = r.read_u32()?;
            let time = r.read_u32()?;
            let num_classes = r.read_u16()? as usize;
            let this_raw = r.read_u8()?;
            let other_raw = r.read_u8()?;
            let owner_events = r.read_u8()? != 0;
            let device = r.read_u8()?;
            r.skip(2)?;
            let mut classes = Vec::with_capacity(num_classes);
            for _ in 0..num_classes {
                classes.push(r.read_u32()?);
            }
            XiRequest::GrabDevice {
                window,
                time,
                this_device_mode: GrabMode::from_u8(this_raw)
                    .ok_or(ParseError::Value(this_raw as u32))?,
                other_device_mode: GrabMode::from_u8(other_raw)
                    .ok_or(ParseError::Value(other_raw as u32))?,
                owner_events,
                device,
                classes,
            }
        }
        minor::UNGRAB_DEVICE => XiRequest::UngrabDevice {
            time: r.read_u32()?,
            device: r.read_u8()?,
        },
        minor::XI_QUERY_VERSION => XiRequest::XiQueryVersion {
            major: r.read_u16()?,
            minor: r.read_u16()?,
        },
        minor::XI_SELECT_EVENTS => {
            let window = r.read_u32()?;
            let num_masks = r.read_u16()? as usize;
            r.skip(2)?;
            let mut masks = Vec::with_capacity(num_masks);
            for _ in 0..num_masks {
                let deviceid = r.read_u16()?;
                let mask_words = r.read_u16()? as usize;
                masks.push(XiEventMask {
                    deviceid,
                    mask: r.read_bytes(mask_words * 4)?.to_vec(),
                });
            }
            XiRequest::XiSelectEvents { window, masks }
        }
        minor::XI_QUERY_DEVICE => XiRequest::XiQueryDevice {
            deviceid: r.read_u16()?,
        },
        minor::XI_GRAB_DEVICE => {
            let window = r.read_u32()?;
            let time = r.read_u32()?;
            let cursor = r.read_u32()?;
            let deviceid = r.read_u16()?;
            let grab_raw = r.read_u8()?;
            let paired_raw = r.read_u8()?;
            let owner_events = r.read_u8()? != 0;
            r.skip(1)?;
            let mask_words = r.read_u16()? as usize;
            XiRequest::XiGrabDevice {
                window,
                time,
                cursor,
                deviceid,
                grab_mode: GrabMode::from_u8(grab_raw)
                    .ok_or(ParseError::Value(grab_raw as u32))?,
                paired_device_mode: GrabMode::from_u8(paired_raw)
                    .ok_or(ParseError::Value(paired_raw as u32))?,
                owner_events,
                mask: r.read_bytes(mask_words * 4)?.to_vec(),
            }
        }
        minor::XI_UNGRAB_DEVICE => XiRequest::XiUngrabDevice {
            time: r.read_u32()?,
            deviceid: r.read_u16()?,
        },
        other => XiRequest::Unknown { minor: other },
    };
    Ok(req)
}

/// Encode an XI1 device event (32 bytes, device ID in the final byte).
#[allow(clippy::too_many_arguments)]
pub fn encode_device_event(
    order: ByteOrder,
    offset: u8,
    detail: u8,
    sequence: SequenceNumber,
    time: Timestamp,
    root: WindowId,
    event: WindowId,
    child: WindowId,
    root_x: i16,
    root_y: i16,
    event_x: i16,
    event_y: i16,
    state: u16,
    device: u8,
) -> Vec<u8> {
    let mut w = ByteOrderWriter::with_capacity(order, 32);
    w.write_u8(extension::XINPUT_EVENT_BASE + offset);
    w.write_u8(detail);
    w.write_u16(sequence);
    w.write_u32(time);
    w.write_u32(root);
    w.write_u32(event);
    w.write_u32(child);
    w.write_i16(root_x);
    w.write_i16(root_y);
    w.write_i16(event_x);
    w.write_i16(event_y);
    w.write_u16(state);
    w.write_u8(1); // same-screen
    w.write_u8(device);
    w.into_vec()
}

/// Encode an XI2 device event as a GenericEvent frame (80 bytes, no
/// button/valuator masks).
#[allow(clippy::too_many_arguments)]
pub fn encode_xi2_device_event(
    order: ByteOrder,
    evtype: u16,
    deviceid: u16,
    detail: u32,
    sequence: SequenceNumber,
    time: Timestamp,
    root: WindowId,
    event: WindowId,
    child: WindowId,
    root_x: i16,
    root_y: i16,
    event_x: i16,
    event_y: i16,
    mods: u32,
) -> Vec<u8> {
    let mut w = ByteOrderWriter::with_capacity(order, 80);
    w.write_u8(35); // GenericEvent
    w.write_u8(extension::XINPUT);
    w.write_u16(sequence);
    w.write_u32(12); // (80 - 32) / 4
    w.write_u16(evtype);
    w.write_u16(deviceid);
    w.write_u32(time);
    w.write_u32(detail);
    w.write_u32(root);
    w.write_u32(event);
    w.write_u32(child);
    w.write_i32((root_x as i32) << 16); // FP1616
    w.write_i32((root_y as i32) << 16);
    w.write_i32((event_x as i32) << 16);
    w.write_i32((event_y as i32) << 16);
    w.write_u16(0); // buttons_len
    w.write_u16(0); // valuators_len
    w.write_u16(deviceid); // sourceid
    w.write_padding(2);
    w.write_u32(0); // flags
    w.write_u32(mods); // mods.base
    w.write_u32(0); // mods.latched
    w.write_u32(0); // mods.locked
    w.write_u32(mods); // mods.effective
    w.write_u8(0); // group.base
    w.write_u8(0);
    w.write_u8(0);
    w.write_u8(0);
    w.into_vec()
}

/// Encode an XI2 raw event (32 bytes, no valuators).
pub fn encode_xi2_raw_event(
    order: ByteOrder,
    evtype: u16,
    deviceid: u16,
    detail: u32,
    sequence: SequenceNumber,
    time: Timestamp,
) -> Vec<u8> {
    let mut w = ByteOrderWriter::with_capacity(order, 32);
    w.write_u8(35); // GenericEvent
    w.write_u8(extension::XINPUT);
    w.write_u16(sequence);
    w.write_u32(0); // no data past the 32-byte base
    w.write_u16(evtype);
    w.write_u16(deviceid);
    w.write_u32(time);
    w.write_u32(detail);
    w.write_u16(deviceid); // sourceid
    w.write_u16(0); // valuators_len
    w.write_u32(0); // flags
    w.write_padding(4);
    w.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_selects() {
        // bit 4 = ButtonPress, bit 17 = RawMotion
        let mask = XiEventMask {
            deviceid: XI_ALL_MASTER_DEVICES,
            mask: vec![0x10, 0x00, 0x02, 0x00],
        };
        assert!(mask.selects(xi2_event::BUTTON_PRESS));
        assert!(mask.selects(xi2_event::RAW_MOTION));
        assert!(!mask.selects(xi2_event::KEY_PRESS));
    }

    #[test]
    fn test_parse_xi_select_events() {
        let mut body = Vec::new();
        body.extend_from_slice(&0u32.to_le_bytes()); // root window
        body.extend_from_slice(&1u16.to_le_bytes()); // one mask
        body.extend_from_slice(&[0, 0]);
        body.extend_from_slice(&XI_ALL_MASTER_DEVICES.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes()); // one mask word
        body.extend_from_slice(&[0x00, 0x00, 0x02, 0x00]); // RawMotion

        let mut r = ByteOrderReader::new(&body, ByteOrder::LittleEndian);
        let req = parse_request(minor::XI_SELECT_EVENTS, &mut r).unwrap();
        match req {
            XiRequest::XiSelectEvents { window, masks } => {
                assert_eq!(window, ROOT_WINDOW);
                assert_eq!(masks.len(), 1);
                assert!(masks[0].selects(xi2_event::RAW_MOTION));
            }
            other => panic!("expected XiSelectEvents, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_open_device() {
        let body = [2u8, 0, 0, 0];
        let mut r = ByteOrderReader::new(&body, ByteOrder::LittleEndian);
        let req = parse_request(minor::OPEN_DEVICE, &mut r).unwrap();
        assert_eq!(req, XiRequest::OpenDevice { device: 2 });
    }

    #[test]
    fn test_device_event_is_32_bytes_with_trailing_device() {
        let bytes = encode_device_event(
            ByteOrder::LittleEndian,
            device_event::DEVICE_BUTTON_PRESS,
            1,
            9,
            1000,
            ROOT_WINDOW,
            0x0020_0001,
            0,
            10,
            20,
            10,
            20,
            0,
            2,
        );
        assert_eq!(bytes.len(), 32);
        assert_eq!(
            bytes[0],
            extension::XINPUT_EVENT_BASE + device_event::DEVICE_BUTTON_PRESS
        );
        assert_eq!(bytes[31], 2);
    }

    #[test]
    fn test_xi2_device_event_length_field() {
        let bytes = encode_xi2_device_event(
            ByteOrder::LittleEndian,
            xi2_event::MOTION,
            MASTER_POINTER,
            0,
            3,
            1000,
            ROOT_WINDOW,
            0x0020_0001,
            0,
            5,
            6,
            5,
            6,
            0,
        );
        assert_eq!(bytes.len(), 80);
        assert_eq!(bytes[0], 35);
        assert_eq!(bytes[1], extension::XINPUT);
        assert_eq!(
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            12
        );
    }

    #[test]
    fn test_xi2_raw_event_is_bare_generic_frame() {
        let bytes = encode_xi2_raw_event(
            ByteOrder::LittleEndian,
            xi2_event::RAW_BUTTON_PRESS,
            MASTER_POINTER,
            1,
            3,
            1000,
        );
        assert_eq!(bytes.len(), 32);
        assert_eq!(
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            0
        );
        assert_eq!(
            u16::from_le_bytes([bytes[8], bytes[9]]),
            xi2_event::RAW_BUTTON_PRESS
        );
    }
}
