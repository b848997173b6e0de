//! Grab manager
//!
//! At most one active pointer grab, one active keyboard grab, and one
//! active grab per XInput device. Passive grabs are indexed by window
//! and promote to active grabs on a matching press; the first match in
//! a window's list wins. Active grabs are explicit state machines:
//! transitions happen only on press, release, AllowEvents, Ungrab*, or
//! window destruction.

use std::collections::HashMap;

use tracing::debug;

use crate::protocol::types::*;

/// A pre-armed grab attached to a window, keyed by (detail, modifiers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveGrab {
    pub window: WindowId,
    pub client: ClientId,
    /// Button or keycode; 0 is AnyButton/AnyKey.
    pub detail: u8,
    /// Modifier bits, or ANY_MODIFIER.
    pub modifiers: u16,
    pub owner_events: bool,
    pub event_mask: EventMask,
    pub pointer_mode: GrabMode,
    pub keyboard_mode: GrabMode,
    pub confine_to: Option<WindowId>,
    pub cursor: Option<CursorId>,
}

impl PassiveGrab {
    /// Detail matches exactly or as a wildcard; modifiers likewise.
    pub fn matches(&self, detail: u8, modifiers: u16) -> bool {
        (self.detail == 0 || self.detail == detail)
            && (self.modifiers == ANY_MODIFIER || self.modifiers == modifiers & 0x00ff)
    }
}

/// An active core grab on the pointer or keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGrab {
    pub window: WindowId,
    pub client: ClientId,
    pub owner_events: bool,
    pub event_mask: EventMask,
    pub pointer_mode: GrabMode,
    pub keyboard_mode: GrabMode,
    pub confine_to: Option<WindowId>,
    pub cursor: Option<CursorId>,
    pub time: Timestamp,
    /// Set when the grab was promoted from a passive grab by a press;
    /// the matching release dissolves it.
    pub activating_detail: Option<u8>,
}

/// Lifecycle of a core grab.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GrabState {
    #[default]
    Idle,
    Active(ActiveGrab),
    /// AllowEvents with a replay mode ended the grab; the next press
    /// re-evaluates passive grabs from scratch.
    Replayed,
}

impl GrabState {
    pub fn active(&self) -> Option<&ActiveGrab> {
        match self {
            GrabState::Active(grab) => Some(grab),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, GrabState::Active(_))
    }
}

/// An active XInput device grab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceGrab {
    pub deviceid: u16,
    pub window: WindowId,
    pub client: ClientId,
    pub owner_events: bool,
    /// XI1 event classes selected at grab time.
    pub classes: Vec<u32>,
    /// XI2 event mask, empty for XI1 grabs.
    pub mask: Vec<u8>,
    pub time: Timestamp,
    /// Set when promoted from a passive device grab.
    pub activating_detail: Option<u8>,
}

/// A passive XInput device grab (GrabDeviceButton/Key are not in the
/// served subset, but XI2 passive grabs arrive via the same window
/// index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveDeviceGrab {
    pub deviceid: u16,
    pub window: WindowId,
    pub client: ClientId,
    pub detail: u8,
    pub modifiers: u16,
    pub owner_events: bool,
    pub mask: Vec<u8>,
}

impl PassiveDeviceGrab {
    pub fn matches(&self, deviceid: u16, detail: u8, modifiers: u16) -> bool {
        self.deviceid == deviceid
            && (self.detail == 0 || self.detail == detail)
            && (self.modifiers == ANY_MODIFIER || self.modifiers == modifiers & 0x00ff)
    }
}

#[derive(Debug, Default)]
pub struct GrabManager {
    pub pointer: GrabState,
    pub keyboard: GrabState,
    pub devices: HashMap<u16, DeviceGrab>,
    button_grabs: HashMap<WindowId, Vec<PassiveGrab>>,
    key_grabs: HashMap<WindowId, Vec<PassiveGrab>>,
    device_grabs: HashMap<WindowId, Vec<PassiveDeviceGrab>>,
}

impl GrabManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a passive button grab, replacing any existing grab with
    /// the same (detail, modifiers) on the window.
    pub fn add_button_grab(&mut self, grab: PassiveGrab) {
        let list = self.button_grabs.entry(grab.window).or_default();
        list.retain(|g| !(g.detail == grab.detail && g.modifiers == grab.modifiers));
        list.push(grab);
    }

    pub fn remove_button_grab(&mut self, window: WindowId, button: u8, modifiers: u16) {
        if let Some(list) = self.button_grabs.get_mut(&window) {
            list.retain(|g| {
                !((button == 0 || g.detail == button)
                    && (modifiers == ANY_MODIFIER || g.modifiers == modifiers))
            });
        }
    }

    pub fn add_key_grab(&mut self, grab: PassiveGrab) {
        let list = self.key_grabs.entry(grab.window).or_default();
        list.retain(|g| !(g.detail == grab.detail && g.modifiers == grab.modifiers));
        list.push(grab);
    }

    pub fn remove_key_grab(&mut self, window: WindowId, key: u8, modifiers: u16) {
        if let Some(list) = self.key_grabs.get_mut(&window) {
            list.retain(|g| {
                !((key == 0 || g.detail == key)
                    && (modifiers == ANY_MODIFIER || g.modifiers == modifiers))
            });
        }
    }

    pub fn add_device_grab(&mut self, grab: PassiveDeviceGrab) {
        let list = self.device_grabs.entry(grab.window).or_default();
        list.retain(|g| {
            !(g.deviceid == grab.deviceid
                && g.detail == grab.detail
                && g.modifiers == grab.modifiers)
        });
        list.push(grab);
    }

    /// First matching passive button grab on `window` (scan order wins).
    pub fn find_button_grab(
        &self,
        window: WindowId,
        button: u8,
        modifiers: u16,
    ) -> Option<&PassiveGrab> {
        self.button_grabs
            .get(&window)?
            .iter()
            .find(|g| g.matches(button, modifiers))
    }

    pub fn find_key_grab(&self, window: WindowId, key: u8, modifiers: u16) -> Option<&PassiveGrab> {
        self.key_grabs
            .get(&window)?
            .iter()
            .find(|g| g.matches(key, modifiers))
    }

    pub fn find_device_grab(
        &self,
        window: WindowId,
        deviceid: u16,
        detail: u8,
        modifiers: u16,
    ) -> Option<&PassiveDeviceGrab> {
        self.device_grabs
            .get(&window)?
            .iter()
            .find(|g| g.matches(deviceid, detail, modifiers))
    }

    /// Drop every grab installed by `client` and release its active
    /// grabs.
    pub fn clear_client(&mut self, client: ClientId) {
        for list in self.button_grabs.values_mut() {
            list.retain(|g| g.client != client);
        }
        for list in self.key_grabs.values_mut() {
            list.retain(|g| g.client != client);
        }
        for list in self.device_grabs.values_mut() {
            list.retain(|g| g.client != client);
        }
        if self.pointer.active().is_some_and(|g| g.client == client) {
            debug!("Releasing pointer grab of disconnected client {}", client);
            self.pointer = GrabState::Idle;
        }
        if self.keyboard.active().is_some_and(|g| g.client == client) {
            self.keyboard = GrabState::Idle;
        }
        self.devices.retain(|_, g| g.client != client);
    }

    /// Drop grabs attached to a destroyed window.
    pub fn clear_window(&mut self, window: WindowId) {
        self.button_grabs.remove(&window);
        self.key_grabs.remove(&window);
        self.device_grabs.remove(&window);
        if self.pointer.active().is_some_and(|g| g.window == window) {
            self.pointer = GrabState::Idle;
        }
        if self.keyboard.active().is_some_and(|g| g.window == window) {
            self.keyboard = GrabState::Idle;
        }
        self.devices.retain(|_, g| g.window != window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passive(window: WindowId, detail: u8, modifiers: u16) -> PassiveGrab {
        PassiveGrab {
            window,
            client: 1,
            detail,
            modifiers,
            owner_events: false,
            event_mask: EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
            pointer_mode: GrabMode::Async,
            keyboard_mode: GrabMode::Async,
            confine_to: None,
            cursor: None,
        }
    }

    #[test]
    fn test_passive_match_semantics() {
        let grab = passive(10, 1, 0);
        assert!(grab.matches(1, 0));
        assert!(!grab.matches(2, 0));
        assert!(!grab.matches(1, state_mask::SHIFT));

        let any_mod = passive(10, 1, ANY_MODIFIER);
        assert!(any_mod.matches(1, state_mask::CONTROL));

        let any_button = passive(10, 0, 0);
        assert!(any_button.matches(3, 0));
    }

    #[test]
    fn test_button_state_bits_do_not_break_modifier_match() {
        let grab = passive(10, 1, 0);
        // button bits live above bit 7 and are ignored by the match
        assert!(grab.matches(1, 0x0100));
    }

    #[test]
    fn test_first_match_wins() {
        let mut grabs = GrabManager::new();
        let mut first = passive(10, 0, ANY_MODIFIER);
        first.client = 1;
        let mut second = passive(10, 1, ANY_MODIFIER);
        second.client = 2;
        grabs.add_button_grab(first);
        grabs.add_button_grab(second);
        assert_eq!(grabs.find_button_grab(10, 1, 0).unwrap().client, 1);
    }

    #[test]
    fn test_same_key_replaces() {
        let mut grabs = GrabManager::new();
        let mut a = passive(10, 1, 0);
        a.client = 1;
        let mut b = passive(10, 1, 0);
        b.client = 2;
        grabs.add_button_grab(a);
        grabs.add_button_grab(b);
        assert_eq!(grabs.find_button_grab(10, 1, 0).unwrap().client, 2);
    }

    #[test]
    fn test_clear_client_releases_active_grabs() {
        let mut grabs = GrabManager::new();
        grabs.pointer = GrabState::Active(ActiveGrab {
            window: 10,
            client: 1,
            owner_events: false,
            event_mask: EventMask::BUTTON_PRESS,
            pointer_mode: GrabMode::Async,
            keyboard_mode: GrabMode::Async,
            confine_to: None,
            cursor: None,
            time: 0,
            activating_detail: None,
        });
        grabs.add_key_grab(passive(10, 38, ANY_MODIFIER));
        grabs.clear_client(1);
        assert_eq!(grabs.pointer, GrabState::Idle);
        assert!(grabs.find_key_grab(10, 38, 0).is_none());
    }

    #[test]
    fn test_clear_window_drops_everything_attached() {
        let mut grabs = GrabManager::new();
        grabs.add_button_grab(passive(10, 1, 0));
        grabs.keyboard = GrabState::Active(ActiveGrab {
            window: 10,
            client: 1,
            owner_events: true,
            event_mask: EventMask::KEY_PRESS,
            pointer_mode: GrabMode::Async,
            keyboard_mode: GrabMode::Async,
            confine_to: None,
            cursor: None,
            time: 0,
            activating_detail: None,
        });
        grabs.clear_window(10);
        assert!(grabs.find_button_grab(10, 1, 0).is_none());
        assert_eq!(grabs.keyboard, GrabState::Idle);
    }
}
