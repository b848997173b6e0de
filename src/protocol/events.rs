//! Event definitions and serialization
//!
//! Core events are fixed 32-byte packets. The first byte is the event
//! code (with bit 0x80 set when the event came from SendEvent), and for
//! all codes except KeymapNotify bytes 2..4 carry the sequence number of
//! the destination client's last dispatched request.

use super::types::*;
use super::wire::ByteOrderWriter;

/// Event codes.
pub mod code {
    pub const KEY_PRESS: u8 = 2;
    pub const KEY_RELEASE: u8 = 3;
    pub const BUTTON_PRESS: u8 = 4;
    pub const BUTTON_RELEASE: u8 = 5;
    pub const MOTION_NOTIFY: u8 = 6;
    pub const ENTER_NOTIFY: u8 = 7;
    pub const LEAVE_NOTIFY: u8 = 8;
    pub const FOCUS_IN: u8 = 9;
    pub const FOCUS_OUT: u8 = 10;
    pub const KEYMAP_NOTIFY: u8 = 11;
    pub const EXPOSE: u8 = 12;
    pub const GRAPHICS_EXPOSURE: u8 = 13;
    pub const NO_EXPOSURE: u8 = 14;
    pub const VISIBILITY_NOTIFY: u8 = 15;
    pub const CREATE_NOTIFY: u8 = 16;
    pub const DESTROY_NOTIFY: u8 = 17;
    pub const UNMAP_NOTIFY: u8 = 18;
    pub const MAP_NOTIFY: u8 = 19;
    pub const MAP_REQUEST: u8 = 20;
    pub const REPARENT_NOTIFY: u8 = 21;
    pub const CONFIGURE_NOTIFY: u8 = 22;
    pub const CONFIGURE_REQUEST: u8 = 23;
    pub const GRAVITY_NOTIFY: u8 = 24;
    pub const RESIZE_REQUEST: u8 = 25;
    pub const CIRCULATE_NOTIFY: u8 = 26;
    pub const CIRCULATE_REQUEST: u8 = 27;
    pub const PROPERTY_NOTIFY: u8 = 28;
    pub const SELECTION_CLEAR: u8 = 29;
    pub const SELECTION_REQUEST: u8 = 30;
    pub const SELECTION_NOTIFY: u8 = 31;
    pub const COLORMAP_NOTIFY: u8 = 32;
    pub const CLIENT_MESSAGE: u8 = 33;
    pub const MAPPING_NOTIFY: u8 = 34;
    pub const GENERIC_EVENT: u8 = 35;
}

/// Common payload of the five core device events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputEventData {
    /// Keycode, button number, or 0/1 (Normal/Hint) for motion.
    pub detail: u8,
    pub time: Timestamp,
    pub root: WindowId,
    pub event: WindowId,
    pub child: WindowId,
    pub root_x: i16,
    pub root_y: i16,
    pub event_x: i16,
    pub event_y: i16,
    pub state: u16,
    pub same_screen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    KeyPress(InputEventData),
    KeyRelease(InputEventData),
    ButtonPress(InputEventData),
    ButtonRelease(InputEventData),
    MotionNotify(InputEventData),
    EnterNotify {
        detail: u8,
        mode: u8,
        data: InputEventData,
    },
    LeaveNotify {
        detail: u8,
        mode: u8,
        data: InputEventData,
    },
    FocusIn {
        detail: u8,
        event: WindowId,
        mode: u8,
    },
    FocusOut {
        detail: u8,
        event: WindowId,
        mode: u8,
    },
    KeymapNotify {
        keys: [u8; 31],
    },
    Expose {
        window: WindowId,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        count: u16,
    },
    GraphicsExposure {
        drawable: DrawableId,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        minor_opcode: u16,
        count: u16,
        major_opcode: u8,
    },
    NoExposure {
        drawable: DrawableId,
        minor_opcode: u16,
        major_opcode: u8,
    },
    VisibilityNotify {
        window: WindowId,
        state: u8,
    },
    CreateNotify {
        parent: WindowId,
        window: WindowId,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        border_width: u16,
        override_redirect: bool,
    },
    DestroyNotify {
        event: WindowId,
        window: WindowId,
    },
    UnmapNotify {
        event: WindowId,
        window: WindowId,
        from_configure: bool,
    },
    MapNotify {
        event: WindowId,
        window: WindowId,
        override_redirect: bool,
    },
    MapRequest {
        parent: WindowId,
        window: WindowId,
    },
    ReparentNotify {
        event: WindowId,
        window: WindowId,
        parent: WindowId,
        x: i16,
        y: i16,
        override_redirect: bool,
    },
    ConfigureNotify {
        event: WindowId,
        window: WindowId,
        above_sibling: WindowId,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        border_width: u16,
        override_redirect: bool,
    },
    ConfigureRequest {
        stack_mode: u8,
        parent: WindowId,
        window: WindowId,
        sibling: WindowId,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        border_width: u16,
        value_mask: u16,
    },
    GravityNotify {
        event: WindowId,
        window: WindowId,
        x: i16,
        y: i16,
    },
    ResizeRequest {
        window: WindowId,
        width: u16,
        height: u16,
    },
    CirculateNotify {
        event: WindowId,
        window: WindowId,
        place: u8,
    },
    CirculateRequest {
        parent: WindowId,
        window: WindowId,
        place: u8,
    },
    PropertyNotify {
        window: WindowId,
        atom: Atom,
        time: Timestamp,
        state: u8,
    },
    SelectionClear {
        time: Timestamp,
        owner: WindowId,
        selection: Atom,
    },
    SelectionRequest {
        time: Timestamp,
        owner: WindowId,
        requestor: WindowId,
        selection: Atom,
        target: Atom,
        property: Atom,
    },
    SelectionNotify {
        time: Timestamp,
        requestor: WindowId,
        selection: Atom,
        target: Atom,
        property: Atom,
    },
    ColormapNotify {
        window: WindowId,
        colormap: ColormapId,
        new: bool,
        state: u8,
    },
    ClientMessage {
        format: u8,
        window: WindowId,
        message_type: Atom,
        data: [u8; 20],
    },
    MappingNotify {
        request: u8,
        first_keycode: KeyCode,
        count: u8,
    },
}

impl Event {
    pub fn code(&self) -> u8 {
        match self {
            Event::KeyPress(_) => code::KEY_PRESS,
            Event::KeyRelease(_) => code::KEY_RELEASE,
            Event::ButtonPress(_) => code::BUTTON_PRESS,
            Event::ButtonRelease(_) => code::BUTTON_RELEASE,
            Event::MotionNotify(_) => code::MOTION_NOTIFY,
            Event::EnterNotify { .. } => code::ENTER_NOTIFY,
            Event::LeaveNotify { .. } => code::LEAVE_NOTIFY,
            Event::FocusIn { .. } => code::FOCUS_IN,
            Event::FocusOut { .. } => code::FOCUS_OUT,
            Event::KeymapNotify { .. } => code::KEYMAP_NOTIFY,
            Event::Expose { .. } => code::EXPOSE,
            Event::GraphicsExposure { .. } => code::GRAPHICS_EXPOSURE,
            Event::NoExposure { .. } => code::NO_EXPOSURE,
            Event::VisibilityNotify { .. } => code::VISIBILITY_NOTIFY,
            Event::CreateNotify { .. } => code::CREATE_NOTIFY,
            Event::DestroyNotify { .. } => code::DESTROY_NOTIFY,
            Event::UnmapNotify { .. } => code::UNMAP_NOTIFY,
            Event::MapNotify { .. } => code::MAP_NOTIFY,
            Event::MapRequest { .. } => code::MAP_REQUEST,
            Event::ReparentNotify { .. } => code::REPARENT_NOTIFY,
            Event::ConfigureNotify { .. } => code::CONFIGURE_NOTIFY,
            Event::ConfigureRequest { .. } => code::CONFIGURE_REQUEST,
            Event::GravityNotify { .. } => code::GRAVITY_NOTIFY,
            Event::ResizeRequest { .. } => code::RESIZE_REQUEST,
            Event::CirculateNotify { .. } => code::CIRCULATE_NOTIFY,
            Event::CirculateRequest { .. } => code::CIRCULATE_REQUEST,
            Event::PropertyNotify { .. } => code::PROPERTY_NOTIFY,
            Event::SelectionClear { .. } => code::SELECTION_CLEAR,
            Event::SelectionRequest { .. } => code::SELECTION_REQUEST,
            Event::SelectionNotify { .. } => code::SELECTION_NOTIFY,
            Event::ColormapNotify { .. } => code::COLORMAP_NOTIFY,
            Event::ClientMessage { .. } => code::CLIENT_MESSAGE,
            Event::MappingNotify { .. } => code::MAPPING_NOTIFY,
        }
    }

    /// Encode this event as a 32-byte packet.
    pub fn encode(&self, order: ByteOrder, sequence: SequenceNumber) -> Vec<u8> {
        let mut w = ByteOrderWriter::with_capacity(order, 32);
        w.write_u8(self.code());
        match self {
            Event::KeyPress(d)
            | Event::KeyRelease(d)
            | Event::ButtonPress(d)
            | Event::ButtonRelease(d)
            | Event::MotionNotify(d) => {
                w.write_u8(d.detail);
                w.write_u16(sequence);
                w.write_u32(d.time);
                w.write_u32(d.root);
                w.write_u32(d.event);
                w.write_u32(d.child);
                w.write_i16(d.root_x);
                w.write_i16(d.root_y);
                w.write_i16(d.event_x);
                w.write_i16(d.event_y);
                w.write_u16(d.state);
                w.write_u8(d.same_screen as u8);
            }
            Event::EnterNotify { detail, mode, data } | Event::LeaveNotify { detail, mode, data } => {
                w.write_u8(*detail);
                w.write_u16(sequence);
                w.write_u32(data.time);
                w.write_u32(data.root);
                w.write_u32(data.event);
                w.write_u32(data.child);
                w.write_i16(data.root_x);
                w.write_i16(data.root_y);
                w.write_i16(data.event_x);
                w.write_i16(data.event_y);
                w.write_u16(data.state);
                w.write_u8(*mode);
                // same-screen (0x02) | focus (0x01)
                w.write_u8(if data.same_screen { 0x02 } else { 0x00 });
            }
            Event::FocusIn {
                detail,
                event,
                mode,
            }
            | Event::FocusOut {
                detail,
                event,
                mode,
            } => {
                w.write_u8(*detail);
                w.write_u16(sequence);
                w.write_u32(*event);
                w.write_u8(*mode);
            }
            Event::KeymapNotify { keys } => {
                w.write_bytes(keys);
            }
            Event::Expose {
                window,
                x,
                y,
                width,
                height,
                count,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*window);
                w.write_u16(*x);
                w.write_u16(*y);
                w.write_u16(*width);
                w.write_u16(*height);
                w.write_u16(*count);
            }
            Event::GraphicsExposure {
                drawable,
                x,
                y,
                width,
                height,
                minor_opcode,
                count,
                major_opcode,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*drawable);
                w.write_u16(*x);
                w.write_u16(*y);
                w.write_u16(*width);
                w.write_u16(*height);
                w.write_u16(*minor_opcode);
                w.write_u16(*count);
                w.write_u8(*major_opcode);
            }
            Event::NoExposure {
                drawable,
                minor_opcode,
                major_opcode,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*drawable);
                w.write_u16(*minor_opcode);
                w.write_u8(*major_opcode);
            }
            Event::VisibilityNotify { window, state } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*window);
                w.write_u8(*state);
            }
            Event::CreateNotify {
                parent,
                window,
                x,
                y,
                width,
                height,
                border_width,
                override_redirect,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*parent);
                w.write_u32(*window);
                w.write_i16(*x);
                w.write_i16(*y);
                w.write_u16(*width);
                w.write_u16(*height);
                w.write_u16(*border_width);
                w.write_u8(*override_redirect as u8);
            }
            Event::DestroyNotify { event, window } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*event);
                w.write_u32(*window);
            }
            Event::UnmapNotify {
                event,
                window,
                from_configure,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*event);
                w.write_u32(*window);
                w.write_u8(*from_configure as u8);
            }
            Event::MapNotify {
                event,
                window,
                override_redirect,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*event);
                w.write_u32(*window);
                w.write_u8(*override_redirect as u8);
            }
            Event::MapRequest { parent, window } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*parent);
                w.write_u32(*window);
            }
            Event::ReparentNotify {
                event,
                window,
                parent,
                x,
                y,
                override_redirect,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*event);
                w.write_u32(*window);
                w.write_u32(*parent);
                w.write_i16(*x);
                w.write_i16(*y);
                w.write_u8(*override_redirect as u8);
            }
            Event::ConfigureNotify {
                event,
                window,
                above_sibling,
                x,
                y,
                width,
                height,
                border_width,
                override_redirect,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*event);
                w.write_u32(*window);
                w.write_u32(*above_sibling);
                w.write_i16(*x);
                w.write_i16(*y);
                w.write_u16(*width);
                w.write_u16(*height);
                w.write_u16(*border_width);
                w.write_u8(*override_redirect as u8);
            }
            Event::ConfigureRequest {
                stack_mode,
                parent,
                window,
                sibling,
                x,
                y,
                width,
                height,
                border_width,
                value_mask,
            } => {
                w.write_u8(*stack_mode);
                w.write_u16(sequence);
                w.write_u32(*parent);
                w.write_u32(*window);
                w.write_u32(*sibling);
                w.write_i16(*x);
                w.write_i16(*y);
                w.write_u16(*width);
                w.write_u16(*height);
                w.write_u16(*border_width);
                w.write_u16(*value_mask);
            }
            Event::GravityNotify {
                event,
                window,
                x,
                y,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*event);
                w.write_u32(*window);
                w.write_i16(*x);
                w.write_i16(*y);
            }
            Event::ResizeRequest {
                window,
                width,
                height,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*window);
                w.write_u16(*width);
                w.write_u16(*height);
            }
            Event::CirculateNotify {
                event,
                window,
                place,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*event);
                w.write_u32(*window);
                w.write_padding(4);
                w.write_u8(*place);
            }
            Event::CirculateRequest {
                parent,
                window,
                place,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*parent);
                w.write_u32(*window);
                w.write_padding(4);
                w.write_u8(*place);
            }
            Event::PropertyNotify {
                window,
                atom,
                time,
                state,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*window);
                w.write_u32(*atom);
                w.write_u32(*time);
                w.write_u8(*state);
            }
            Event::SelectionClear {
                time,
                owner,
                selection,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*time);
                w.write_u32(*owner);
                w.write_u32(*selection);
            }
            Event::SelectionRequest {
                time,
                owner,
                requestor,
                selection,
                target,
                property,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*time);
                w.write_u32(*owner);
                w.write_u32(*requestor);
                w.write_u32(*selection);
                w.write_u32(*target);
                w.write_u32(*property);
            }
            Event::SelectionNotify {
                time,
                requestor,
                selection,
                target,
                property,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*time);
                w.write_u32(*requestor);
                w.write_u32(*selection);
                w.write_u32(*target);
                w.write_u32(*property);
            }
            Event::ColormapNotify {
                window,
                colormap,
                new,
                state,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u32(*window);
                w.write_u32(*colormap);
                w.write_u8(*new as u8);
                w.write_u8(*state);
            }
            Event::ClientMessage {
                format,
                window,
                message_type,
                data,
            } => {
                w.write_u8(*format);
                w.write_u16(sequence);
                w.write_u32(*window);
                w.write_u32(*message_type);
                w.write_bytes(data);
            }
            Event::MappingNotify {
                request,
                first_keycode,
                count,
            } => {
                w.write_u8(0);
                w.write_u16(sequence);
                w.write_u8(*request);
                w.write_u8(*first_keycode);
                w.write_u8(*count);
            }
        }
        let mut bytes = w.into_vec();
        bytes.resize(32, 0);
        bytes
    }
}

/// Patch a raw 32-byte event for SendEvent forwarding: set the
/// send-event bit and stamp the destination's sequence number.
pub fn mark_sent(raw: &[u8; 32], order: ByteOrder, sequence: SequenceNumber) -> Vec<u8> {
    let mut bytes = raw.to_vec();
    bytes[0] |= 0x80;
    if bytes[0] & 0x7f != code::KEYMAP_NOTIFY {
        let seq = match order {
            ByteOrder::LittleEndian => sequence.to_le_bytes(),
            ByteOrder::BigEndian => sequence.to_be_bytes(),
        };
        bytes[2] = seq[0];
        bytes[3] = seq[1];
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_press_is_32_bytes_with_code_4() {
        let event = Event::ButtonPress(InputEventData {
            detail: 1,
            time: 1234,
            root: ROOT_WINDOW,
            event: 0x0020_0001,
            child: 0,
            root_x: 10,
            root_y: 20,
            event_x: 10,
            event_y: 20,
            state: 0,
            same_screen: true,
        });
        let bytes = event.encode(ByteOrder::LittleEndian, 7);
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[0], 4);
        assert_eq!(bytes[1], 1);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 7);
        assert_eq!(i16::from_le_bytes([bytes[24], bytes[25]]), 10); // event-x
        assert_eq!(bytes[30], 1); // same-screen
    }

    #[test]
    fn test_every_event_is_32_bytes() {
        let data = InputEventData::default();
        let events = vec![
            Event::KeyPress(data),
            Event::MotionNotify(data),
            Event::EnterNotify {
                detail: 0,
                mode: 0,
                data,
            },
            Event::FocusIn {
                detail: 0,
                event: 0,
                mode: 0,
            },
            Event::KeymapNotify { keys: [0; 31] },
            Event::Expose {
                window: 0,
                x: 0,
                y: 0,
                width: 1,
                height: 1,
                count: 0,
            },
            Event::GraphicsExposure {
                drawable: 0,
                x: 0,
                y: 0,
                width: 1,
                height: 1,
                minor_opcode: 0,
                count: 0,
                major_opcode: 62,
            },
            Event::NoExposure {
                drawable: 0,
                minor_opcode: 0,
                major_opcode: 62,
            },
            Event::VisibilityNotify { window: 0, state: 0 },
            Event::CreateNotify {
                parent: 0,
                window: 1,
                x: 0,
                y: 0,
                width: 1,
                height: 1,
                border_width: 0,
                override_redirect: false,
            },
            Event::DestroyNotify { event: 0, window: 1 },
            Event::UnmapNotify {
                event: 0,
                window: 1,
                from_configure: false,
            },
            Event::MapNotify {
                event: 0,
                window: 1,
                override_redirect: false,
            },
            Event::MapRequest { parent: 0, window: 1 },
            Event::ReparentNotify {
                event: 0,
                window: 1,
                parent: 2,
                x: 0,
                y: 0,
                override_redirect: false,
            },
            Event::ConfigureNotify {
                event: 0,
                window: 1,
                above_sibling: 0,
                x: 0,
                y: 0,
                width: 1,
                height: 1,
                border_width: 0,
                override_redirect: false,
            },
            Event::ConfigureRequest {
                stack_mode: 0,
                parent: 0,
                window: 1,
                sibling: 0,
                x: 0,
                y: 0,
                width: 1,
                height: 1,
                border_width: 0,
                value_mask: 0,
            },
            Event::GravityNotify {
                event: 0,
                window: 1,
                x: 0,
                y: 0,
            },
            Event::ResizeRequest {
                window: 1,
                width: 1,
                height: 1,
            },
            Event::CirculateNotify {
                event: 0,
                window: 1,
                place: 0,
            },
            Event::CirculateRequest {
                parent: 0,
                window: 1,
                place: 0,
            },
            Event::PropertyNotify {
                window: 1,
                atom: 39,
                time: 0,
                state: 0,
            },
            Event::SelectionClear {
                time: 0,
                owner: 1,
                selection: 1,
            },
            Event::SelectionRequest {
                time: 0,
                owner: 1,
                requestor: 2,
                selection: 1,
                target: 31,
                property: 0,
            },
            Event::SelectionNotify {
                time: 0,
                requestor: 2,
                selection: 1,
                target: 31,
                property: 0,
            },
            Event::ColormapNotify {
                window: 1,
                colormap: 0x20,
                new: true,
                state: 1,
            },
            Event::ClientMessage {
                format: 32,
                window: 1,
                message_type: 4,
                data: [0; 20],
            },
            Event::MappingNotify {
                request: 0,
                first_keycode: 8,
                count: 248,
            },
        ];
        for event in events {
            let bytes = event.encode(ByteOrder::LittleEndian, 1);
            assert_eq!(bytes.len(), 32, "event {:?}", event.code());
            assert_eq!(bytes[0], event.code());
        }
    }

    #[test]
    fn test_property_notify_fields() {
        let bytes = Event::PropertyNotify {
            window: 0x0020_0001,
            atom: 39,
            time: 99,
            state: property_state::NEW_VALUE,
        }
        .encode(ByteOrder::LittleEndian, 5);
        assert_eq!(bytes[0], 28);
        assert_eq!(
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            0x0020_0001
        );
        assert_eq!(
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            39
        );
        assert_eq!(bytes[16], 0);
    }

    #[test]
    fn test_mark_sent_sets_high_bit_and_sequence() {
        let raw = Event::Expose {
            window: 1,
            x: 0,
            y: 0,
            width: 4,
            height: 4,
            count: 0,
        }
        .encode(ByteOrder::LittleEndian, 0);
        let mut fixed = [0u8; 32];
        fixed.copy_from_slice(&raw);
        let sent = mark_sent(&fixed, ByteOrder::LittleEndian, 42);
        assert_eq!(sent[0], 0x80 | 12);
        assert_eq!(u16::from_le_bytes([sent[2], sent[3]]), 42);
    }

    #[test]
    fn test_keymap_notify_has_no_sequence() {
        let mut keys = [0u8; 31];
        keys[0] = 0xff;
        let bytes = Event::KeymapNotify { keys }.encode(ByteOrder::LittleEndian, 1234);
        assert_eq!(bytes[0], 11);
        assert_eq!(bytes[1], 0xff);
    }
}
