//! Reply definitions and serialization
//!
//! Replies are 32 bytes plus a variable tail; bytes 4..8 record the tail
//! size in 4-byte units. The first byte is 1, the second carries
//! reply-specific data, bytes 2..4 the sequence number of the request
//! being answered.

use super::types::*;
use super::wire::{ByteOrderWriter, pad};
use super::xinput;

/// Per-character font metrics, as reported by QueryFont.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharInfo {
    pub left_side_bearing: i16,
    pub right_side_bearing: i16,
    pub character_width: i16,
    pub ascent: i16,
    pub descent: i16,
    pub attributes: u16,
}

/// Everything QueryFont reports about an open font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontInfo {
    pub min_bounds: CharInfo,
    pub max_bounds: CharInfo,
    pub min_char_or_byte2: u16,
    pub max_char_or_byte2: u16,
    pub default_char: u16,
    pub draw_direction: u8,
    pub min_byte1: u8,
    pub max_byte1: u8,
    pub all_chars_exist: bool,
    pub font_ascent: i16,
    pub font_descent: i16,
    pub char_infos: Vec<CharInfo>,
}

/// An XInput 1.x device description for ListInputDevices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XiDeviceInfo {
    pub id: u8,
    /// IsXPointer (0) or IsXKeyboard (1).
    pub device_use: u8,
    pub device_type: Atom,
    pub name: String,
    pub num_buttons: Option<u16>,
    pub key_range: Option<(KeyCode, KeyCode)>,
}

/// All replies the dispatcher can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    GetWindowAttributes {
        backing_store: u8,
        visual: VisualId,
        class: u16,
        bit_gravity: u8,
        win_gravity: u8,
        backing_planes: u32,
        backing_pixel: u32,
        save_under: bool,
        map_is_installed: bool,
        map_state: u8,
        override_redirect: bool,
        colormap: ColormapId,
        all_event_masks: EventMask,
        your_event_mask: EventMask,
        do_not_propagate_mask: EventMask,
    },
    GetGeometry {
        depth: u8,
        root: WindowId,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        border_width: u16,
    },
    QueryTree {
        root: WindowId,
        parent: WindowId,
        children: Vec<WindowId>,
    },
    InternAtom {
        atom: Atom,
    },
    GetAtomName {
        name: String,
    },
    GetProperty {
        format: u8,
        property_type: Atom,
        bytes_after: u32,
        value: Vec<u8>,
    },
    ListProperties {
        atoms: Vec<Atom>,
    },
    GetSelectionOwner {
        owner: WindowId,
    },
    GrabPointer {
        status: u8,
    },
    GrabKeyboard {
        status: u8,
    },
    QueryPointer {
        same_screen: bool,
        root: WindowId,
        child: WindowId,
        root_x: i16,
        root_y: i16,
        win_x: i16,
        win_y: i16,
        mask: u16,
    },
    GetMotionEvents {
        events: Vec<(Timestamp, i16, i16)>,
    },
    TranslateCoordinates {
        same_screen: bool,
        child: WindowId,
        dst_x: i16,
        dst_y: i16,
    },
    GetInputFocus {
        revert_to: RevertTo,
        focus: WindowId,
    },
    QueryKeymap {
        keys: [u8; 32],
    },
    QueryFont {
        info: FontInfo,
    },
    QueryTextExtents {
        draw_direction: u8,
        font_ascent: i16,
        font_descent: i16,
        overall_ascent: i16,
        overall_descent: i16,
        overall_width: i32,
        overall_left: i32,
        overall_right: i32,
    },
    ListFonts {
        names: Vec<String>,
    },
    /// One per matching font; the request ends with
    /// [`Reply::ListFontsWithInfoEnd`].
    ListFontsWithInfo {
        name: String,
        info: FontInfo,
        replies_hint: u32,
    },
    ListFontsWithInfoEnd,
    GetFontPath {
        paths: Vec<String>,
    },
    GetImage {
        depth: u8,
        visual: VisualId,
        data: Vec<u8>,
    },
    ListInstalledColormaps {
        cmaps: Vec<ColormapId>,
    },
    AllocColor {
        red: u16,
        green: u16,
        blue: u16,
        pixel: u32,
    },
    AllocNamedColor {
        pixel: u32,
        exact: (u16, u16, u16),
        visual: (u16, u16, u16),
    },
    AllocColorCells {
        pixels: Vec<u32>,
        masks: Vec<u32>,
    },
    AllocColorPlanes {
        pixels: Vec<u32>,
        red_mask: u32,
        green_mask: u32,
        blue_mask: u32,
    },
    QueryColors {
        colors: Vec<(u16, u16, u16)>,
    },
    LookupColor {
        exact: (u16, u16, u16),
        visual: (u16, u16, u16),
    },
    QueryBestSize {
        width: u16,
        height: u16,
    },
    QueryExtension {
        present: bool,
        major_opcode: u8,
        first_event: u8,
        first_error: u8,
    },
    ListExtensions {
        names: Vec<String>,
    },
    GetKeyboardMapping {
        keysyms_per_keycode: u8,
        keysyms: Vec<u32>,
    },
    GetKeyboardControl {
        global_auto_repeat: u8,
        led_mask: u32,
        key_click_percent: u8,
        bell_percent: u8,
        bell_pitch: u16,
        bell_duration: u16,
        auto_repeats: [u8; 32],
    },
    GetPointerControl {
        acceleration_numerator: u16,
        acceleration_denominator: u16,
        threshold: u16,
    },
    GetScreenSaver {
        timeout: u16,
        interval: u16,
        prefer_blanking: u8,
        allow_exposures: u8,
    },
    ListHosts {
        enabled: bool,
    },
    SetPointerMapping {
        status: u8,
    },
    GetPointerMapping {
        map: Vec<u8>,
    },
    SetModifierMapping {
        status: u8,
    },
    GetModifierMapping {
        keycodes_per_modifier: u8,
        keycodes: Vec<KeyCode>,
    },
    BigReqEnable {
        maximum_request_length: u32,
    },

    // XInput
    XiGetExtensionVersion {
        present: bool,
        major: u16,
        minor: u16,
    },
    XiListInputDevices {
        devices: Vec<XiDeviceInfo>,
    },
    XiOpenDevice {
        /// (input class, event type base) pairs.
        classes: Vec<(u8, u8)>,
    },
    XiGrabDevice {
        status: u8,
    },
    XiQueryVersion {
        major: u16,
        minor: u16,
    },
    XiQueryDevice {
        devices: Vec<XiDeviceInfo>,
    },
}

impl Reply {
    /// Encode this reply for one client's byte order and sequence.
    pub fn encode(&self, order: ByteOrder, sequence: SequenceNumber) -> Vec<u8> {
        match self {
            Reply::GetWindowAttributes {
                backing_store,
                visual,
                class,
                bit_gravity,
                win_gravity,
                backing_planes,
                backing_pixel,
                save_under,
                map_is_installed,
                map_state,
                override_redirect,
                colormap,
                all_event_masks,
                your_event_mask,
                do_not_propagate_mask,
            } => {
                let mut w = frame(order, *backing_store, sequence);
                w.write_u32(*visual);
                w.write_u16(*class);
                w.write_u8(*bit_gravity);
                w.write_u8(*win_gravity);
                w.write_u32(*backing_planes);
                w.write_u32(*backing_pixel);
                w.write_u8(*save_under as u8);
                w.write_u8(*map_is_installed as u8);
                w.write_u8(*map_state);
                w.write_u8(*override_redirect as u8);
                w.write_u32(*colormap);
                w.write_u32(all_event_masks.bits());
                w.write_u32(your_event_mask.bits());
                w.write_u16(do_not_propagate_mask.bits() as u16);
                w.write_padding(2);
                finish(w)
            }
            Reply::GetGeometry {
                depth,
                root,
                x,
                y,
                width,
                height,
                border_width,
            } => {
                let mut w = frame(order, *depth, sequence);
                w.write_u32(*root);
                w.write_i16(*x);
                w.write_i16(*y);
                w.write_u16(*width);
                w.write_u16(*height);
                w.write_u16(*border_width);
                finish(w)
            }
            Reply::QueryTree {
                root,
                parent,
                children,
            } => {
                let mut w = frame(order, 0, sequence);
                w.write_u32(*root);
                w.write_u32(*parent);
                w.write_u16(children.len() as u16);
                w.write_padding(14);
                for child in children {
                    w.write_u32(*child);
                }
                finish(w)
            }
            Reply::InternAtom { atom } => {
                let mut w = frame(order, 0, sequence);
                w.write_u32(*atom);
                finish(w)
            }
            Reply::GetAtomName { name } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(name.len() as u16);
                w.write_padding(22);
                w.write_padded_bytes(name.as_bytes());
                finish(w)
            }
            Reply::GetProperty {
                format,
                property_type,
                bytes_after,
                value,
            } => {
                let mut w = frame(order, *format, sequence);
                w.write_u32(*property_type);
                w.write_u32(*bytes_after);
                let units = match format {
                    0 => 0,
                    8 => value.len() as u32,
                    16 => (value.len() / 2) as u32,
                    _ => (value.len() / 4) as u32,
                };
                w.write_u32(units);
                w.write_padding(12);
                w.write_padded_bytes(value);
                finish(w)
            }
            Reply::ListProperties { atoms } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(atoms.len() as u16);
                w.write_padding(22);
                for atom in atoms {
                    w.write_u32(*atom);
                }
                finish(w)
            }
            Reply::GetSelectionOwner { owner } => {
                let mut w = frame(order, 0, sequence);
                w.write_u32(*owner);
                finish(w)
            }
            Reply::GrabPointer { status } | Reply::GrabKeyboard { status } => {
                let w = frame(order, *status, sequence);
                finish(w)
            }
            Reply::QueryPointer {
                same_screen,
                root,
                child,
                root_x,
                root_y,
                win_x,
                win_y,
                mask,
            } => {
                let mut w = frame(order, *same_screen as u8, sequence);
                w.write_u32(*root);
                w.write_u32(*child);
                w.write_i16(*root_x);
                w.write_i16(*root_y);
                w.write_i16(*win_x);
                w.write_i16(*win_y);
                w.write_u16(*mask);
                finish(w)
            }
            Reply::GetMotionEvents { events } => {
                let mut w = frame(order, 0, sequence);
                w.write_u32(events.len() as u32);
                w.write_padding(20);
                for (time, x, y) in events {
                    w.write_u32(*time);
                    w.write_i16(*x);
                    w.write_i16(*y);
                }
                finish(w)
            }
            Reply::TranslateCoordinates {
                same_screen,
                child,
                dst_x,
                dst_y,
            } => {
                let mut w = frame(order, *same_screen as u8, sequence);
                w.write_u32(*child);
                w.write_i16(*dst_x);
                w.write_i16(*dst_y);
                finish(w)
            }
            Reply::GetInputFocus { revert_to, focus } => {
                let mut w = frame(order, revert_to.to_u8(), sequence);
                w.write_u32(*focus);
                finish(w)
            }
            Reply::QueryKeymap { keys } => {
                let mut w = frame(order, 0, sequence);
                w.write_bytes(keys);
                finish(w)
            }
            Reply::QueryFont { info } => {
                let mut w = frame(order, 0, sequence);
                write_char_info(&mut w, &info.min_bounds);
                w.write_padding(4);
                write_char_info(&mut w, &info.max_bounds);
                w.write_padding(4);
                w.write_u16(info.min_char_or_byte2);
                w.write_u16(info.max_char_or_byte2);
                w.write_u16(info.default_char);
                w.write_u16(0); // no font properties
                w.write_u8(info.draw_direction);
                w.write_u8(info.min_byte1);
                w.write_u8(info.max_byte1);
                w.write_u8(info.all_chars_exist as u8);
                w.write_i16(info.font_ascent);
                w.write_i16(info.font_descent);
                w.write_u32(info.char_infos.len() as u32);
                for ci in &info.char_infos {
                    write_char_info(&mut w, ci);
                }
                finish(w)
            }
            Reply::QueryTextExtents {
                draw_direction,
                font_ascent,
                font_descent,
                overall_ascent,
                overall_descent,
                overall_width,
                overall_left,
                overall_right,
            } => {
                let mut w = frame(order, *draw_direction, sequence);
                w.write_i16(*font_ascent);
                w.write_i16(*font_descent);
                w.write_i16(*overall_ascent);
                w.write_i16(*overall_descent);
                w.write_i32(*overall_width);
                w.write_i32(*overall_left);
                w.write_i32(*overall_right);
                finish(w)
            }
            Reply::ListFonts { names } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(names.len() as u16);
                w.write_padding(22);
                let mut tail = 0usize;
                for name in names {
                    w.write_u8(name.len() as u8);
                    w.write_bytes(name.as_bytes());
                    tail += 1 + name.len();
                }
                w.write_padding(pad(tail));
                finish(w)
            }
            Reply::ListFontsWithInfo {
                name,
                info,
                replies_hint,
            } => {
                let mut w = frame(order, name.len() as u8, sequence);
                write_char_info(&mut w, &info.min_bounds);
                w.write_padding(4);
                write_char_info(&mut w, &info.max_bounds);
                w.write_padding(4);
                w.write_u16(info.min_char_or_byte2);
                w.write_u16(info.max_char_or_byte2);
                w.write_u16(info.default_char);
                w.write_u16(0); // no font properties
                w.write_u8(info.draw_direction);
                w.write_u8(info.min_byte1);
                w.write_u8(info.max_byte1);
                w.write_u8(info.all_chars_exist as u8);
                w.write_i16(info.font_ascent);
                w.write_i16(info.font_descent);
                w.write_u32(*replies_hint);
                w.write_padded_bytes(name.as_bytes());
                finish(w)
            }
            Reply::ListFontsWithInfoEnd => {
                // last-in-series marker: zero name length, no info
                let mut w = frame(order, 0, sequence);
                w.write_padding(52);
                finish(w)
            }
            Reply::GetFontPath { paths } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(paths.len() as u16);
                w.write_padding(22);
                let mut tail = 0usize;
                for path in paths {
                    w.write_u8(path.len() as u8);
                    w.write_bytes(path.as_bytes());
                    tail += 1 + path.len();
                }
                w.write_padding(pad(tail));
                finish(w)
            }
            Reply::GetImage {
                depth,
                visual,
                data,
            } => {
                let mut w = frame(order, *depth, sequence);
                w.write_u32(*visual);
                w.write_padding(20);
                w.write_padded_bytes(data);
                finish(w)
            }
            Reply::ListInstalledColormaps { cmaps } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(cmaps.len() as u16);
                w.write_padding(22);
                for cmap in cmaps {
                    w.write_u32(*cmap);
                }
                finish(w)
            }
            Reply::AllocColor {
                red,
                green,
                blue,
                pixel,
            } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(*red);
                w.write_u16(*green);
                w.write_u16(*blue);
                w.write_padding(2);
                w.write_u32(*pixel);
                finish(w)
            }
            Reply::AllocNamedColor {
                pixel,
                exact,
                visual,
            } => {
                let mut w = frame(order, 0, sequence);
                w.write_u32(*pixel);
                w.write_u16(exact.0);
                w.write_u16(exact.1);
                w.write_u16(exact.2);
                w.write_u16(visual.0);
                w.write_u16(visual.1);
                w.write_u16(visual.2);
                finish(w)
            }
            Reply::AllocColorCells { pixels, masks } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(pixels.len() as u16);
                w.write_u16(masks.len() as u16);
                w.write_padding(20);
                for pixel in pixels {
                    w.write_u32(*pixel);
                }
                for mask in masks {
                    w.write_u32(*mask);
                }
                finish(w)
            }
            Reply::AllocColorPlanes {
                pixels,
                red_mask,
                green_mask,
                blue_mask,
            } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(pixels.len() as u16);
                w.write_padding(2);
                w.write_u32(*red_mask);
                w.write_u32(*green_mask);
                w.write_u32(*blue_mask);
                w.write_padding(8);
                for pixel in pixels {
                    w.write_u32(*pixel);
                }
                finish(w)
            }
            Reply::QueryColors { colors } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(colors.len() as u16);
                w.write_padding(22);
                for (red, green, blue) in colors {
                    w.write_u16(*red);
                    w.write_u16(*green);
                    w.write_u16(*blue);
                    w.write_padding(2);
                }
                finish(w)
            }
            Reply::LookupColor { exact, visual } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(exact.0);
                w.write_u16(exact.1);
                w.write_u16(exact.2);
                w.write_u16(visual.0);
                w.write_u16(visual.1);
                w.write_u16(visual.2);
                finish(w)
            }
            Reply::QueryBestSize { width, height } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(*width);
                w.write_u16(*height);
                finish(w)
            }
            Reply::QueryExtension {
                present,
                major_opcode,
                first_event,
                first_error,
            } => {
                let mut w = frame(order, 0, sequence);
                w.write_u8(*present as u8);
                w.write_u8(*major_opcode);
                w.write_u8(*first_event);
                w.write_u8(*first_error);
                finish(w)
            }
            Reply::ListExtensions { names } => {
                let mut w = frame(order, names.len() as u8, sequence);
                w.write_padding(24);
                let mut tail = 0usize;
                for name in names {
                    w.write_u8(name.len() as u8);
                    w.write_bytes(name.as_bytes());
                    tail += 1 + name.len();
                }
                w.write_padding(pad(tail));
                finish(w)
            }
            Reply::GetKeyboardMapping {
                keysyms_per_keycode,
                keysyms,
            } => {
                let mut w = frame(order, *keysyms_per_keycode, sequence);
                w.write_padding(24);
                for keysym in keysyms {
                    w.write_u32(*keysym);
                }
                finish(w)
            }
            Reply::GetKeyboardControl {
                global_auto_repeat,
                led_mask,
                key_click_percent,
                bell_percent,
                bell_pitch,
                bell_duration,
                auto_repeats,
            } => {
                let mut w = frame(order, *global_auto_repeat, sequence);
                w.write_u32(*led_mask);
                w.write_u8(*key_click_percent);
                w.write_u8(*bell_percent);
                w.write_u16(*bell_pitch);
                w.write_u16(*bell_duration);
                w.write_padding(2);
                w.write_bytes(auto_repeats);
                finish(w)
            }
            Reply::GetPointerControl {
                acceleration_numerator,
                acceleration_denominator,
                threshold,
            } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(*acceleration_numerator);
                w.write_u16(*acceleration_denominator);
                w.write_u16(*threshold);
                finish(w)
            }
            Reply::GetScreenSaver {
                timeout,
                interval,
                prefer_blanking,
                allow_exposures,
            } => {
                let mut w = frame(order, 0, sequence);
                w.write_u16(*timeout);
                w.write_u16(*interval);
                w.write_u8(*prefer_blanking);
                w.write_u8(*allow_exposures);
                finish(w)
            }
            Reply::ListHosts { enabled } => {
                let mut w = frame(order, *enabled as u8, sequence);
                w.write_u16(0); // no hosts configured
                finish(w)
            }
            Reply::SetPointerMapping { status } | Reply::SetModifierMapping { status } => {
                let w = frame(order, *status, sequence);
                finish(w)
            }
            Reply::GetPointerMapping { map } => {
                let mut w = frame(order, map.len() as u8, sequence);
                w.write_padding(24);
                w.write_padded_bytes(map);
                finish(w)
            }
            Reply::GetModifierMapping {
                keycodes_per_modifier,
                keycodes,
            } => {
                let mut w = frame(order, *keycodes_per_modifier, sequence);
                w.write_padding(24);
                w.write_padded_bytes(keycodes);
                finish(w)
            }
            Reply::BigReqEnable {
                maximum_request_length,
            } => {
                let mut w = frame(order, 0, sequence);
                w.write_u32(*maximum_request_length);
                finish(w)
            }

            Reply::XiGetExtensionVersion {
                present,
                major,
                minor,
            } => {
                let mut w = frame(order, xinput::minor::GET_EXTENSION_VERSION, sequence);
                w.write_u16(*major);
                w.write_u16(*minor);
                w.write_u8(*present as u8);
                finish(w)
            }
            Reply::XiListInputDevices { devices } => {
                let mut w = frame(order, xinput::minor::LIST_INPUT_DEVICES, sequence);
                w.write_u8(devices.len() as u8);
                w.write_padding(23);
                for dev in devices {
                    w.write_u32(dev.device_type);
                    w.write_u8(dev.id);
                    let mut num_classes = 0u8;
                    if dev.num_buttons.is_some() {
                        num_classes += 1;
                    }
                    if dev.key_range.is_some() {
                        num_classes += 1;
                    }
                    w.write_u8(num_classes);
                    w.write_u8(dev.device_use);
                    w.write_padding(1);
                }
                let mut tail = devices.len() * 8;
                for dev in devices {
                    if let Some((min, max)) = dev.key_range {
                        // KEYINFO
                        w.write_u8(0);
                        w.write_u8(8);
                        w.write_u8(min);
                        w.write_u8(max);
                        w.write_u16((max - min + 1) as u16);
                        w.write_padding(2);
                        tail += 8;
                    }
                    if let Some(buttons) = dev.num_buttons {
                        // BUTTONINFO
                        w.write_u8(1);
                        w.write_u8(4);
                        w.write_u16(buttons);
                        tail += 4;
                    }
                }
                for dev in devices {
                    w.write_u8(dev.name.len() as u8);
                    w.write_bytes(dev.name.as_bytes());
                    tail += 1 + dev.name.len();
                }
                w.write_padding(pad(tail));
                finish(w)
            }
            Reply::XiOpenDevice { classes } => {
                let mut w = frame(order, xinput::minor::OPEN_DEVICE, sequence);
                w.write_u8(classes.len() as u8);
                w.write_padding(23);
                for (class, event_type_base) in classes {
                    w.write_u8(*class);
                    w.write_u8(*event_type_base);
                }
                w.write_padding(pad(classes.len() * 2));
                finish(w)
            }
            Reply::XiGrabDevice { status } => {
                let mut w = frame(order, xinput::minor::GRAB_DEVICE, sequence);
                w.write_u8(*status);
                finish(w)
            }
            Reply::XiQueryVersion { major, minor } => {
                let mut w = frame(order, xinput::minor::XI_QUERY_VERSION, sequence);
                w.write_u16(*major);
                w.write_u16(*minor);
                finish(w)
            }
            Reply::XiQueryDevice { devices } => {
                let mut w = frame(order, xinput::minor::XI_QUERY_DEVICE, sequence);
                w.write_u16(devices.len() as u16);
                w.write_padding(22);
                for dev in devices {
                    // XIDeviceInfo with no classes
                    w.write_u16(dev.id as u16);
                    w.write_u16(dev.device_use as u16 + 1); // MasterPointer = 1, MasterKeyboard = 2
                    w.write_u16(if dev.device_use == 0 {
                        xinput::MASTER_KEYBOARD
                    } else {
                        xinput::MASTER_POINTER
                    });
                    w.write_u16(0); // num_classes
                    w.write_u16(dev.name.len() as u16);
                    w.write_u8(1); // enabled
                    w.write_padding(1);
                    w.write_padded_bytes(dev.name.as_bytes());
                }
                finish(w)
            }
        }
    }
}

fn frame(order: ByteOrder, data: u8, sequence: SequenceNumber) -> ByteOrderWriter {
    let mut w = ByteOrderWriter::new(order);
    w.write_u8(1);
    w.write_u8(data);
    w.write_u16(sequence);
    w.write_u32(0); // tail length, patched in finish()
    w
}

fn finish(mut w: ByteOrderWriter) -> Vec<u8> {
    if w.len() < 32 {
        let short = 32 - w.len();
        w.write_padding(short);
    }
    debug_assert_eq!(w.len() % 4, 0, "reply tail must be 4-byte aligned");
    let tail_words = ((w.len() - 32) / 4) as u32;
    w.patch_u32(4, tail_words);
    w.into_vec()
}

fn write_char_info(w: &mut ByteOrderWriter, ci: &CharInfo) {
    w.write_i16(ci.left_side_bearing);
    w.write_i16(ci.right_side_bearing);
    w.write_i16(ci.character_width);
    w.write_i16(ci.ascent);
    w.write_i16(ci.descent);
    w.write_u16(ci.attributes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq_of(bytes: &[u8]) -> u16 {
        u16::from_le_bytes([bytes[2], bytes[3]])
    }

    fn tail_words(bytes: &[u8]) -> u32 {
        u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]])
    }

    #[test]
    fn test_intern_atom_reply() {
        let bytes = Reply::InternAtom { atom: 69 }.encode(ByteOrder::LittleEndian, 2);
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[0], 1);
        assert_eq!(seq_of(&bytes), 2);
        assert_eq!(tail_words(&bytes), 0);
        assert_eq!(
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            69
        );
    }

    #[test]
    fn test_get_atom_name_reply_round_trip() {
        let bytes = Reply::GetAtomName {
            name: "FOO".to_string(),
        }
        .encode(ByteOrder::LittleEndian, 3);
        assert_eq!(bytes.len(), 36);
        assert_eq!(tail_words(&bytes), 1);
        let name_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!(&bytes[32..32 + name_len], b"FOO");
    }

    #[test]
    fn test_get_property_reply_value_and_units() {
        let bytes = Reply::GetProperty {
            format: 8,
            property_type: 31,
            bytes_after: 0,
            value: b"hi".to_vec(),
        }
        .encode(ByteOrder::LittleEndian, 5);
        assert_eq!(bytes.len(), 36);
        assert_eq!(bytes[1], 8);
        assert_eq!(
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            31
        );
        // length in format units at bytes 16..20
        assert_eq!(
            u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]),
            2
        );
        assert_eq!(&bytes[32..34], b"hi");
    }

    #[test]
    fn test_query_tree_reply_children() {
        let bytes = Reply::QueryTree {
            root: ROOT_WINDOW,
            parent: ROOT_WINDOW,
            children: vec![0x0020_0001, 0x0020_0002],
        }
        .encode(ByteOrder::LittleEndian, 9);
        assert_eq!(bytes.len(), 40);
        assert_eq!(tail_words(&bytes), 2);
        assert_eq!(u16::from_le_bytes([bytes[16], bytes[17]]), 2);
    }

    #[test]
    fn test_query_pointer_reply_big_endian() {
        let bytes = Reply::QueryPointer {
            same_screen: true,
            root: ROOT_WINDOW,
            child: 0x0020_0001,
            root_x: 100,
            root_y: 200,
            win_x: 10,
            win_y: 20,
            mask: 0x0100,
        }
        .encode(ByteOrder::BigEndian, 4);
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[1], 1);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 4);
        assert_eq!(i16::from_be_bytes([bytes[16], bytes[17]]), 100);
    }

    #[test]
    fn test_query_font_reply_length() {
        let info = FontInfo {
            min_bounds: CharInfo::default(),
            max_bounds: CharInfo {
                character_width: 6,
                ascent: 11,
                descent: 2,
                ..CharInfo::default()
            },
            min_char_or_byte2: 32,
            max_char_or_byte2: 126,
            default_char: 32,
            draw_direction: 0,
            min_byte1: 0,
            max_byte1: 0,
            all_chars_exist: true,
            font_ascent: 11,
            font_descent: 2,
            char_infos: Vec::new(),
        };
        let bytes = Reply::QueryFont { info }.encode(ByteOrder::LittleEndian, 6);
        assert_eq!(bytes.len(), 60);
        assert_eq!(tail_words(&bytes), 7);
    }

    #[test]
    fn test_list_fonts_reply_padding() {
        let bytes = Reply::ListFonts {
            names: vec!["fixed".to_string(), "cursor".to_string()],
        }
        .encode(ByteOrder::LittleEndian, 8);
        // tail: 1+5 + 1+6 = 13, padded to 16
        assert_eq!(bytes.len(), 48);
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 2);
        assert_eq!(bytes[32], 5);
        assert_eq!(&bytes[33..38], b"fixed");
    }

    #[test]
    fn test_big_req_enable_reply() {
        let bytes = Reply::BigReqEnable {
            maximum_request_length: 0x003f_ffff,
        }
        .encode(ByteOrder::LittleEndian, 1);
        assert_eq!(bytes.len(), 32);
        assert_eq!(
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            0x003f_ffff
        );
    }

    #[test]
    fn test_xi_list_input_devices_reply() {
        let devices = vec![
            XiDeviceInfo {
                id: 2,
                device_use: 0,
                device_type: 0,
                name: "pointer".to_string(),
                num_buttons: Some(5),
                key_range: None,
            },
            XiDeviceInfo {
                id: 3,
                device_use: 1,
                device_type: 0,
                name: "keyboard".to_string(),
                num_buttons: None,
                key_range: Some((8, 255)),
            },
        ];
        let bytes =
            Reply::XiListInputDevices { devices }.encode(ByteOrder::LittleEndian, 2);
        assert_eq!(bytes[8], 2); // ndevices
        assert_eq!(bytes.len() % 4, 0);
        assert!(bytes.len() > 32);
    }
}
