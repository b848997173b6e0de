//! Input device state
//!
//! Tracks the pointer position, button and modifier state, the input
//! focus, keyboard/pointer mappings and controls, and the bounded motion
//! history ring. The event router reads and updates this state; the
//! grab machinery lives in [`grabs`].

pub mod grabs;
pub mod router;
pub mod xinput;

use std::collections::VecDeque;

use crate::protocol::requests::KeyboardControlValues;
use crate::protocol::types::*;

/// Where keyboard events go when no grab intervenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    None,
    #[default]
    PointerRoot,
    Window(WindowId),
}

impl FocusTarget {
    pub fn to_wire(self) -> u32 {
        match self {
            FocusTarget::None => NONE,
            FocusTarget::PointerRoot => POINTER_ROOT,
            FocusTarget::Window(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionRecord {
    pub time: Timestamp,
    pub x: i16,
    pub y: i16,
    pub window: WindowId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerControl {
    pub acceleration_numerator: i16,
    pub acceleration_denominator: i16,
    pub threshold: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardControl {
    pub key_click_percent: u8,
    pub bell_percent: u8,
    pub bell_pitch: u16,
    pub bell_duration: u16,
    pub led_mask: u32,
    pub global_auto_repeat: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSaver {
    pub timeout: i16,
    pub interval: i16,
    pub prefer_blanking: u8,
    pub allow_exposures: u8,
}

#[derive(Debug)]
pub struct InputState {
    pub pointer_x: i16,
    pub pointer_y: i16,
    /// Window currently under the pointer.
    pub pointer_window: WindowId,
    /// Button bits in event-state form (bit 8 = button 1).
    buttons: u16,
    /// Modifier bits 0..7.
    modifiers: u16,
    pub focus: FocusTarget,
    pub focus_revert: RevertTo,
    pub keys_down: [u8; 32],
    history: VecDeque<MotionRecord>,
    pub pointer_mapping: Vec<u8>,
    pub keycodes_per_modifier: u8,
    pub modifier_keycodes: Vec<KeyCode>,
    pub first_keycode: KeyCode,
    pub keysyms_per_keycode: u8,
    pub keysyms: Vec<u32>,
    pub pointer_control: PointerControl,
    pub keyboard_control: KeyboardControl,
    pub screen_saver: ScreenSaver,
}

impl InputState {
    pub fn new() -> Self {
        // keycode 50 shift, 37 control, 64 mod1 (alt), 133 mod4 (meta)
        let modifier_keycodes = vec![50, 0, 37, 64, 0, 0, 133, 0];
        let first_keycode = 8u8;
        let keysyms_per_keycode = 2u8;
        let count = (255 - first_keycode as usize + 1) * keysyms_per_keycode as usize;
        let keysyms = (0..count)
            .map(|i| {
                let keycode = first_keycode as u32 + (i as u32 / keysyms_per_keycode as u32);
                if i % keysyms_per_keycode as usize == 0 {
                    keycode
                } else {
                    0
                }
            })
            .collect();
        Self {
            pointer_x: 0,
            pointer_y: 0,
            pointer_window: ROOT_WINDOW,
            buttons: 0,
            modifiers: 0,
            focus: FocusTarget::PointerRoot,
            focus_revert: RevertTo::None,
            keys_down: [0; 32],
            history: VecDeque::with_capacity(MOTION_BUFFER_SIZE),
            pointer_mapping: vec![1, 2, 3, 4, 5],
            keycodes_per_modifier: 1,
            modifier_keycodes,
            first_keycode,
            keysyms_per_keycode,
            keysyms,
            pointer_control: PointerControl {
                acceleration_numerator: 2,
                acceleration_denominator: 1,
                threshold: 4,
            },
            keyboard_control: KeyboardControl {
                key_click_percent: 50,
                bell_percent: 50,
                bell_pitch: 400,
                bell_duration: 100,
                led_mask: 0,
                global_auto_repeat: 1,
            },
            screen_saver: ScreenSaver {
                timeout: 600,
                interval: 600,
                prefer_blanking: 1,
                allow_exposures: 1,
            },
        }
    }

    /// Combined modifier/button state carried in input events.
    pub fn state_bits(&self) -> u16 {
        self.modifiers | self.buttons
    }

    pub fn modifier_bits(&self) -> u16 {
        self.modifiers
    }

    pub fn button_bits(&self) -> u16 {
        self.buttons
    }

    pub fn any_button_down(&self) -> bool {
        self.buttons != 0
    }

    pub fn press_button(&mut self, button: Button) {
        self.buttons |= state_mask::button_bit(button);
    }

    pub fn release_button(&mut self, button: Button) {
        self.buttons &= !state_mask::button_bit(button);
    }

    /// Track a key transition, updating the keymap bitset and any
    /// modifier bit the keycode is bound to.
    pub fn set_key(&mut self, keycode: KeyCode, pressed: bool) {
        let byte = keycode as usize / 8;
        let bit = 1u8 << (keycode % 8);
        if pressed {
            self.keys_down[byte] |= bit;
        } else {
            self.keys_down[byte] &= !bit;
        }
        let per = self.keycodes_per_modifier as usize;
        for (modifier, row) in self.modifier_keycodes.chunks(per.max(1)).enumerate() {
            if row.contains(&keycode) && keycode != 0 {
                if pressed {
                    self.modifiers |= 1 << modifier;
                } else {
                    self.modifiers &= !(1 << modifier);
                }
            }
        }
    }

    pub fn record_motion(&mut self, time: Timestamp, x: i16, y: i16, window: WindowId) {
        if self.history.len() == MOTION_BUFFER_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(MotionRecord { time, x, y, window });
    }

    /// Motion records with start <= time <= stop.
    pub fn motion_between(&self, start: Timestamp, stop: Timestamp) -> Vec<MotionRecord> {
        self.history
            .iter()
            .filter(|r| r.time >= start && r.time <= stop)
            .copied()
            .collect()
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_bits_combine_modifiers_and_buttons() {
        let mut input = InputState::new();
        input.press_button(1);
        input.set_key(50, true); // shift
        assert_eq!(input.state_bits(), state_mask::SHIFT | 0x0100);
        input.release_button(1);
        input.set_key(50, false);
        assert_eq!(input.state_bits(), 0);
    }

    #[test]
    fn test_modifier_bits_match_bound_keycodes() {
        let mut input = InputState::new();
        input.set_key(37, true); // control
        assert_eq!(input.modifier_bits(), state_mask::CONTROL);
        input.set_key(64, true); // mod1/alt
        assert_eq!(
            input.modifier_bits(),
            state_mask::CONTROL | state_mask::MOD1
        );
        input.set_key(133, true); // mod4/meta
        assert!(input.modifier_bits() & state_mask::MOD4 != 0);
    }

    #[test]
    fn test_keys_down_bitset() {
        let mut input = InputState::new();
        input.set_key(38, true);
        assert_eq!(input.keys_down[4], 1 << 6);
        input.set_key(38, false);
        assert_eq!(input.keys_down[4], 0);
    }

    #[test]
    fn test_motion_history_is_bounded_and_filtered() {
        let mut input = InputState::new();
        for i in 0..(MOTION_BUFFER_SIZE + 10) {
            input.record_motion(i as Timestamp, i as i16, 0, ROOT_WINDOW);
        }
        assert_eq!(input.motion_between(0, u32::MAX).len(), MOTION_BUFFER_SIZE);
        let slice = input.motion_between(100, 104);
        assert_eq!(slice.len(), 5);
        assert_eq!(slice[0].time, 100);
    }
}
