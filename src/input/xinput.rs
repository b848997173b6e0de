//! XInput device model
//!
//! The server exposes exactly two devices: the master pointer (id 2)
//! and the master keyboard (id 3). XI2 wildcard device IDs match per
//! the XInput 2 specification: 0 is every device, 1 every master.

use crate::protocol::replies::XiDeviceInfo;
use crate::protocol::xinput::{MASTER_KEYBOARD, MASTER_POINTER, XI_ALL_DEVICES, XI_ALL_MASTER_DEVICES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Pointer,
    Keyboard,
}

impl DeviceKind {
    pub fn id(self) -> u16 {
        match self {
            DeviceKind::Pointer => MASTER_POINTER,
            DeviceKind::Keyboard => MASTER_KEYBOARD,
        }
    }

    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            MASTER_POINTER => Some(DeviceKind::Pointer),
            MASTER_KEYBOARD => Some(DeviceKind::Keyboard),
            _ => None,
        }
    }

    /// Whether an XI2 selection for `selector` covers this device.
    /// Both masters match the XIAllMasterDevices wildcard (1).
    pub fn selected_by(self, selector: u16) -> bool {
        selector == XI_ALL_DEVICES || selector == XI_ALL_MASTER_DEVICES || selector == self.id()
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Pointer => "Virtual core pointer",
            DeviceKind::Keyboard => "Virtual core keyboard",
        }
    }

    pub fn describe(self) -> XiDeviceInfo {
        match self {
            DeviceKind::Pointer => XiDeviceInfo {
                id: self.id() as u8,
                device_use: 0, // IsXPointer
                device_type: 0,
                name: self.name().to_string(),
                num_buttons: Some(5),
                key_range: None,
            },
            DeviceKind::Keyboard => XiDeviceInfo {
                id: self.id() as u8,
                device_use: 1, // IsXKeyboard
                device_type: 0,
                name: self.name().to_string(),
                num_buttons: None,
                key_range: Some((8, 255)),
            },
        }
    }

    pub fn all() -> [DeviceKind; 2] {
        [DeviceKind::Pointer, DeviceKind::Keyboard]
    }
}

/// XI1 event class: device in the high byte, event offset in the low.
pub fn event_class(device: u8, offset: u8) -> u32 {
    ((device as u32) << 8) | offset as u32
}

/// Split an XI1 event class back into (device, offset).
pub fn split_class(class: u32) -> (u8, u8) {
    ((class >> 8) as u8, class as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_selection() {
        assert!(DeviceKind::Pointer.selected_by(XI_ALL_DEVICES));
        assert!(DeviceKind::Pointer.selected_by(XI_ALL_MASTER_DEVICES));
        assert!(DeviceKind::Keyboard.selected_by(XI_ALL_MASTER_DEVICES));
        assert!(DeviceKind::Pointer.selected_by(MASTER_POINTER));
        assert!(!DeviceKind::Pointer.selected_by(MASTER_KEYBOARD));
    }

    #[test]
    fn test_event_class_round_trip() {
        let class = event_class(2, 3);
        assert_eq!(class, 0x0203);
        assert_eq!(split_class(class), (2, 3));
    }

    #[test]
    fn test_device_descriptions() {
        let pointer = DeviceKind::Pointer.describe();
        assert_eq!(pointer.id, 2);
        assert_eq!(pointer.num_buttons, Some(5));
        let keyboard = DeviceKind::Keyboard.describe();
        assert_eq!(keyboard.key_range, Some((8, 255)));
    }
}
