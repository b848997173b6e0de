//! Basic X11 protocol types and constants

use bitflags::bitflags;

pub type XId = u32;
pub type WindowId = u32;
pub type PixmapId = u32;
pub type DrawableId = u32;
pub type GContextId = u32;
pub type FontId = u32;
pub type CursorId = u32;
pub type ColormapId = u32;
pub type VisualId = u32;
pub type Atom = u32;
pub type Timestamp = u32;
pub type KeyCode = u8;
pub type Button = u8;
pub type SequenceNumber = u16;
pub type ClientId = u32;

/// The root window carries the reserved ID 0.
pub const ROOT_WINDOW: WindowId = 0;
/// 0 stands in for None, CurrentTime, AnyKey, AnyButton and friends.
pub const NONE: u32 = 0;
pub const CURRENT_TIME: Timestamp = 0;
pub const PARENT_RELATIVE: u32 = 1;
pub const POINTER_ROOT: u32 = 1;
pub const ANY_KEY: KeyCode = 0;
pub const ANY_BUTTON: Button = 0;
pub const ANY_MODIFIER: u16 = 0x8000;

/// The default colormap is visible to every client under this ID.
pub const DEFAULT_COLORMAP: ColormapId = 0x0000_0020;
pub const ROOT_VISUAL: VisualId = 0x0000_0021;
pub const PSEUDOCOLOR_VISUAL: VisualId = 0x0000_0022;

pub const PROTOCOL_MAJOR_VERSION: u16 = 11;
pub const PROTOCOL_MINOR_VERSION: u16 = 0;

/// Upper bound on the motion history ring.
pub const MOTION_BUFFER_SIZE: usize = 1024;

/// Byte order of a connection, chosen by the first handshake byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// 'B' selects big endian, 'l' little endian.
    pub fn from_initial_byte(byte: u8) -> Option<Self> {
        match byte {
            0x42 => Some(ByteOrder::BigEndian),
            0x6c => Some(ByteOrder::LittleEndian),
            _ => None,
        }
    }
}

bitflags! {
    /// Core event selection mask, as stored in window attributes and grabs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventMask: u32 {
        const KEY_PRESS = 0x0000_0001;
        const KEY_RELEASE = 0x0000_0002;
        const BUTTON_PRESS = 0x0000_0004;
        const BUTTON_RELEASE = 0x0000_0008;
        const ENTER_WINDOW = 0x0000_0010;
        const LEAVE_WINDOW = 0x0000_0020;
        const POINTER_MOTION = 0x0000_0040;
        const POINTER_MOTION_HINT = 0x0000_0080;
        const BUTTON1_MOTION = 0x0000_0100;
        const BUTTON2_MOTION = 0x0000_0200;
        const BUTTON3_MOTION = 0x0000_0400;
        const BUTTON4_MOTION = 0x0000_0800;
        const BUTTON5_MOTION = 0x0000_1000;
        const BUTTON_MOTION = 0x0000_2000;
        const KEYMAP_STATE = 0x0000_4000;
        const EXPOSURE = 0x0000_8000;
        const VISIBILITY_CHANGE = 0x0001_0000;
        const STRUCTURE_NOTIFY = 0x0002_0000;
        const RESIZE_REDIRECT = 0x0004_0000;
        const SUBSTRUCTURE_NOTIFY = 0x0008_0000;
        const SUBSTRUCTURE_REDIRECT = 0x0010_0000;
        const FOCUS_CHANGE = 0x0020_0000;
        const PROPERTY_CHANGE = 0x0040_0000;
        const COLORMAP_CHANGE = 0x0080_0000;
        const OWNER_GRAB_BUTTON = 0x0100_0000;
    }
}

impl EventMask {
    /// Derived mask for a motion event while `button` is held.
    pub fn button_motion(button: Button) -> EventMask {
        match button {
            1 => EventMask::BUTTON1_MOTION,
            2 => EventMask::BUTTON2_MOTION,
            3 => EventMask::BUTTON3_MOTION,
            4 => EventMask::BUTTON4_MOTION,
            5 => EventMask::BUTTON5_MOTION,
            _ => EventMask::empty(),
        }
    }
}

/// Modifier/button state carried in input events.
///
/// Bits 0 (shift), 2 (control), 3 (mod1/alt), 6 (mod4/meta); bits 8..13
/// mirror the pointer button mask.
pub mod state_mask {
    pub const SHIFT: u16 = 0x0001;
    pub const LOCK: u16 = 0x0002;
    pub const CONTROL: u16 = 0x0004;
    pub const MOD1: u16 = 0x0008;
    pub const MOD2: u16 = 0x0010;
    pub const MOD3: u16 = 0x0020;
    pub const MOD4: u16 = 0x0040;
    pub const MOD5: u16 = 0x0080;

    pub fn button_bit(button: u8) -> u16 {
        match button {
            1..=5 => 1 << (7 + button as u16),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum WindowClass {
    CopyFromParent = 0,
    InputOutput = 1,
    InputOnly = 2,
}

impl WindowClass {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(WindowClass::CopyFromParent),
            1 => Some(WindowClass::InputOutput),
            2 => Some(WindowClass::InputOnly),
            _ => None,
        }
    }
}

/// Map state reported by GetWindowAttributes.
pub mod map_state {
    pub const UNMAPPED: u8 = 0;
    pub const UNVIEWABLE: u8 = 1;
    pub const VIEWABLE: u8 = 2;
}

/// Stacking mode for ConfigureWindow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StackMode {
    Above = 0,
    Below = 1,
    TopIf = 2,
    BottomIf = 3,
    Opposite = 4,
}

impl StackMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StackMode::Above),
            1 => Some(StackMode::Below),
            2 => Some(StackMode::TopIf),
            3 => Some(StackMode::BottomIf),
            4 => Some(StackMode::Opposite),
            _ => None,
        }
    }
}

/// Close-down mode of a client (SetCloseDownMode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseDownMode {
    #[default]
    Destroy,
    RetainPermanent,
    RetainTemporary,
}

impl CloseDownMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CloseDownMode::Destroy),
            1 => Some(CloseDownMode::RetainPermanent),
            2 => Some(CloseDownMode::RetainTemporary),
            _ => None,
        }
    }
}

/// Grab request status codes.
pub mod grab_status {
    pub const SUCCESS: u8 = 0;
    pub const ALREADY_GRABBED: u8 = 1;
    pub const INVALID_TIME: u8 = 2;
    pub const NOT_VIEWABLE: u8 = 3;
    pub const FROZEN: u8 = 4;
}

/// Synchronous/asynchronous grab modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabMode {
    Sync,
    Async,
}

impl GrabMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(GrabMode::Sync),
            1 => Some(GrabMode::Async),
            _ => None,
        }
    }
}

/// AllowEvents modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AllowEventsMode {
    AsyncPointer = 0,
    SyncPointer = 1,
    ReplayPointer = 2,
    AsyncKeyboard = 3,
    SyncKeyboard = 4,
    ReplayKeyboard = 5,
    AsyncBoth = 6,
    SyncBoth = 7,
}

impl AllowEventsMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::AsyncPointer),
            1 => Some(Self::SyncPointer),
            2 => Some(Self::ReplayPointer),
            3 => Some(Self::AsyncKeyboard),
            4 => Some(Self::SyncKeyboard),
            5 => Some(Self::ReplayKeyboard),
            6 => Some(Self::AsyncBoth),
            7 => Some(Self::SyncBoth),
            _ => None,
        }
    }
}

/// Crossing/focus event modes.
pub mod notify_mode {
    pub const NORMAL: u8 = 0;
    pub const GRAB: u8 = 1;
    pub const UNGRAB: u8 = 2;
    pub const WHILE_GRABBED: u8 = 3;
}

/// Crossing/focus event details.
pub mod notify_detail {
    pub const ANCESTOR: u8 = 0;
    pub const VIRTUAL: u8 = 1;
    pub const INFERIOR: u8 = 2;
    pub const NONLINEAR: u8 = 3;
    pub const NONLINEAR_VIRTUAL: u8 = 4;
    pub const POINTER: u8 = 5;
    pub const POINTER_ROOT: u8 = 6;
    pub const NONE: u8 = 7;
}

/// PropertyNotify states.
pub mod property_state {
    pub const NEW_VALUE: u8 = 0;
    pub const DELETED: u8 = 1;
}

/// ChangeProperty modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyMode {
    Replace,
    Prepend,
    Append,
}

impl PropertyMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PropertyMode::Replace),
            1 => Some(PropertyMode::Prepend),
            2 => Some(PropertyMode::Append),
            _ => None,
        }
    }
}

/// Input focus revert-to values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevertTo {
    #[default]
    None,
    PointerRoot,
    Parent,
}

impl RevertTo {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RevertTo::None),
            1 => Some(RevertTo::PointerRoot),
            2 => Some(RevertTo::Parent),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            RevertTo::None => 0,
            RevertTo::PointerRoot => 1,
            RevertTo::Parent => 2,
        }
    }
}

/// A point in 16-bit signed window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Segment {
    pub x1: i16,
    pub y1: i16,
    pub x2: i16,
    pub y2: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Arc {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub angle1: i16,
    pub angle2: i16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order_selection() {
        assert_eq!(
            ByteOrder::from_initial_byte(b'B'),
            Some(ByteOrder::BigEndian)
        );
        assert_eq!(
            ByteOrder::from_initial_byte(b'l'),
            Some(ByteOrder::LittleEndian)
        );
        assert_eq!(ByteOrder::from_initial_byte(b'x'), None);
    }

    #[test]
    fn test_state_mask_button_bits() {
        assert_eq!(state_mask::button_bit(1), 0x0100);
        assert_eq!(state_mask::button_bit(5), 0x1000);
        assert_eq!(state_mask::button_bit(6), 0);
    }

    #[test]
    fn test_derived_motion_masks() {
        assert_eq!(EventMask::button_motion(3), EventMask::BUTTON3_MOTION);
        assert!(EventMask::button_motion(9).is_empty());
    }
}
