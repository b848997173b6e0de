//! Atom and property request handlers

use crate::frontend::Frontend;
use crate::protocol::error::XError;
use crate::protocol::events::Event;
use crate::protocol::replies::Reply;
use crate::protocol::types::*;
use crate::resources::atoms;
use crate::resources::window::Property;
use crate::server::state::ServerState;

use super::HandlerResult;

pub fn intern_atom(state: &mut ServerState, only_if_exists: bool, name: &str) -> HandlerResult {
    let atom = state.atoms.intern(name, only_if_exists).unwrap_or(NONE);
    Ok(Some(Reply::InternAtom { atom }))
}

pub fn get_atom_name(state: &ServerState, atom: Atom) -> HandlerResult {
    match state.atoms.name(atom) {
        Some(name) => Ok(Some(Reply::GetAtomName {
            name: name.to_string(),
        })),
        None => Err(XError::atom(atom)),
    }
}

pub async fn change_property(
    state: &mut ServerState,
    fe: &dyn Frontend,
    window: WindowId,
    mode: PropertyMode,
    property: Atom,
    property_type: Atom,
    format: u8,
    data: &[u8],
) -> HandlerResult {
    state.registry.window(window)?;
    if !state.atoms.exists(property) {
        return Err(XError::atom(property));
    }
    let time = state.now();

    let win = state.registry.window_mut(window)?;
    match mode {
        PropertyMode::Replace => {
            win.properties.insert(
                property,
                Property {
                    property_type,
                    format,
                    data: data.to_vec(),
                },
            );
        }
        PropertyMode::Prepend | PropertyMode::Append => {
            match win.properties.get_mut(&property) {
                Some(existing) => {
                    if existing.property_type != property_type || existing.format != format {
                        return Err(XError::match_error());
                    }
                    if mode == PropertyMode::Append {
                        existing.data.extend_from_slice(data);
                    } else {
                        let mut combined = data.to_vec();
                        combined.extend_from_slice(&existing.data);
                        existing.data = combined;
                    }
                }
                None => {
                    win.properties.insert(
                        property,
                        Property {
                            property_type,
                            format,
                            data: data.to_vec(),
                        },
                    );
                }
            }
        }
    }

    let event = Event::PropertyNotify {
        window,
        atom: property,
        time,
        state: property_state::NEW_VALUE,
    };
    state.deliver_to_selecting(window, EventMask::PROPERTY_CHANGE, &event);

    // title-carrying atoms go straight to the frontend
    if is_title_atom(state, property) {
        let full = &state.registry.window(window)?.properties[&property].data;
        let title = String::from_utf8_lossy(full).into_owned();
        fe.set_window_title(window, &title)
            .await
            .map_err(|_| XError::implementation())?;
    }
    Ok(None)
}

fn is_title_atom(state: &ServerState, property: Atom) -> bool {
    property == atoms::WM_NAME
        || state
            .atoms
            .name(property)
            .is_some_and(|name| name == "_NET_WM_NAME")
}

pub fn delete_property(
    state: &mut ServerState,
    window: WindowId,
    property: Atom,
) -> HandlerResult {
    state.registry.window(window)?;
    if !state.atoms.exists(property) {
        return Err(XError::atom(property));
    }
    let time = state.now();
    let removed = state
        .registry
        .window_mut(window)?
        .properties
        .remove(&property);
    if removed.is_some() {
        let event = Event::PropertyNotify {
            window,
            atom: property,
            time,
            state: property_state::DELETED,
        };
        state.deliver_to_selecting(window, EventMask::PROPERTY_CHANGE, &event);
    }
    Ok(None)
}

pub fn get_property(
    state: &mut ServerState,
    window: WindowId,
    delete: bool,
    property: Atom,
    property_type: Atom,
    long_offset: u32,
    long_length: u32,
) -> HandlerResult {
    state.registry.window(window)?;
    if !state.atoms.exists(property) {
        return Err(XError::atom(property));
    }
    let time = state.now();

    let Some(value) = state
        .registry
        .window(window)?
        .properties
        .get(&property)
        .cloned()
    else {
        return Ok(Some(Reply::GetProperty {
            format: 0,
            property_type: NONE,
            bytes_after: 0,
            value: Vec::new(),
        }));
    };

    // AnyPropertyType is 0
    if property_type != NONE && property_type != value.property_type {
        return Ok(Some(Reply::GetProperty {
            format: value.format,
            property_type: value.property_type,
            bytes_after: value.data.len() as u32,
            value: Vec::new(),
        }));
    }

    let start = (long_offset as usize) * 4;
    if start > value.data.len() {
        return Err(XError::value(long_offset));
    }
    let requested = (long_length as usize).saturating_mul(4);
    let end = (start + requested).min(value.data.len());
    let bytes_after = (value.data.len() - end) as u32;
    let slice = value.data[start..end].to_vec();

    if delete && bytes_after == 0 {
        state
            .registry
            .window_mut(window)?
            .properties
            .remove(&property);
        let event = Event::PropertyNotify {
            window,
            atom: property,
            time,
            state: property_state::DELETED,
        };
        state.deliver_to_selecting(window, EventMask::PROPERTY_CHANGE, &event);
    }

    Ok(Some(Reply::GetProperty {
        format: value.format,
        property_type: value.property_type,
        bytes_after,
        value: slice,
    }))
}

pub fn list_properties(state: &ServerState, window: WindowId) -> HandlerResult {
    let win = state.registry.window(window)?;
    let mut props: Vec<Atom> = win.properties.keys().copied().collect();
    props.sort_unstable();
    Ok(Some(Reply::ListProperties { atoms: props }))
}

/// Atomically rotate the values of `properties` by `delta`. If any named
/// property is missing from the window, fail with Match and change
/// nothing.
pub fn rotate_properties(
    state: &mut ServerState,
    window: WindowId,
    delta: i16,
    properties: &[Atom],
) -> HandlerResult {
    state.registry.window(window)?;
    for &atom in properties {
        if !state.atoms.exists(atom) {
            return Err(XError::atom(atom));
        }
    }
    let n = properties.len();
    if n == 0 {
        return Ok(None);
    }
    {
        let win = state.registry.window(window)?;
        if properties.iter().any(|a| !win.properties.contains_key(a)) {
            return Err(XError::match_error());
        }
    }
    let shift = delta.rem_euclid(n as i16) as usize;
    if shift == 0 {
        return Ok(None);
    }
    let time = state.now();

    let win = state.registry.window_mut(window)?;
    let values: Vec<Property> = properties
        .iter()
        .map(|a| win.properties[a].clone())
        .collect();
    for (i, &atom) in properties.iter().enumerate() {
        let replacement = values[(i + shift) % n].clone();
        win.properties.insert(atom, replacement);
    }

    for &atom in properties {
        let event = Event::PropertyNotify {
            window,
            atom,
            time,
            state: property_state::NEW_VALUE,
        };
        state.deliver_to_selecting(window, EventMask::PROPERTY_CHANGE, &event);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::resources::window::Window;
    use std::collections::HashMap;

    fn state_with_window(id: WindowId) -> ServerState {
        let mut state = ServerState::new(&ServerConfig::default());
        state.registry.windows.insert(Window {
            id,
            owner: 1,
            parent: Some(ROOT_WINDOW),
            x: 0,
            y: 0,
            width: 10,
            height: 10,
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
        state
    }

    fn set_prop(state: &mut ServerState, window: WindowId, atom: Atom, value: &[u8]) {
        state
            .registry
            .windows
            .get_mut(window)
            .unwrap()
            .properties
            .insert(
                atom,
                Property {
                    property_type: atoms::STRING,
                    format: 8,
                    data: value.to_vec(),
                },
            );
    }

    fn prop_value(state: &ServerState, window: WindowId, atom: Atom) -> Vec<u8> {
        state.registry.windows.get(window).unwrap().properties[&atom]
            .data
            .clone()
    }

    #[test]
    fn test_intern_then_name_round_trip() {
        let mut state = state_with_window(0x0020_0001);
        let Reply::InternAtom { atom } =
            intern_atom(&mut state, false, "FOO").unwrap().unwrap()
        else {
            panic!("expected InternAtom reply");
        };
        assert_eq!(atom, 69);
        let Reply::GetAtomName { name } = get_atom_name(&state, atom).unwrap().unwrap() else {
            panic!("expected GetAtomName reply");
        };
        assert_eq!(name, "FOO");
    }

    #[test]
    fn test_rotate_matches_successive_single_rotations() {
        let window = 0x0020_0001;
        let mut a = state_with_window(window);
        let mut b = state_with_window(window);
        let props = [69, 70, 71];
        for state in [&mut a, &mut b] {
            for offset in 0..3u32 {
                state.atoms.intern(&format!("P{offset}"), false);
            }
            set_prop(state, window, props[0], b"first");
            set_prop(state, window, props[1], b"second");
            set_prop(state, window, props[2], b"third");
        }

        rotate_properties(&mut a, window, 2, &props).unwrap();
        rotate_properties(&mut b, window, 1, &props).unwrap();
        rotate_properties(&mut b, window, 1, &props).unwrap();

        for &atom in &props {
            assert_eq!(prop_value(&a, window, atom), prop_value(&b, window, atom));
        }
        // the multiset of values is unchanged
        let mut values: Vec<Vec<u8>> =
            props.iter().map(|&p| prop_value(&a, window, p)).collect();
        values.sort();
        assert_eq!(values, vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]);
    }

    #[test]
    fn test_rotate_negative_delta_wraps() {
        let window = 0x0020_0001;
        let mut state = state_with_window(window);
        for offset in 0..3u32 {
            state.atoms.intern(&format!("R{offset}"), false);
        }
        let props = [69, 70, 71];
        set_prop(&mut state, window, props[0], b"a");
        set_prop(&mut state, window, props[1], b"b");
        set_prop(&mut state, window, props[2], b"c");

        rotate_properties(&mut state, window, -1, &props).unwrap();
        // -1 mod 3 == 2: each property takes the value two slots ahead
        assert_eq!(prop_value(&state, window, props[0]), b"c");
        assert_eq!(prop_value(&state, window, props[1]), b"a");
        assert_eq!(prop_value(&state, window, props[2]), b"b");
    }

    #[test]
    fn test_rotate_missing_property_is_match_error_without_mutation() {
        let window = 0x0020_0001;
        let mut state = state_with_window(window);
        state.atoms.intern("A", false);
        state.atoms.intern("B", false);
        set_prop(&mut state, window, 69, b"kept");

        let err = rotate_properties(&mut state, window, 1, &[69, 70]).unwrap_err();
        assert_eq!(err, XError::match_error());
        assert_eq!(prop_value(&state, window, 69), b"kept");
    }

    #[test]
    fn test_get_property_type_mismatch_reports_actual() {
        let window = 0x0020_0001;
        let mut state = state_with_window(window);
        set_prop(&mut state, window, atoms::WM_NAME, b"hello");

        let Reply::GetProperty {
            format,
            property_type,
            bytes_after,
            value,
        } = get_property(&mut state, window, false, atoms::WM_NAME, 6, 0, 10)
            .unwrap()
            .unwrap()
        else {
            panic!("expected GetProperty reply");
        };
        assert_eq!(format, 8);
        assert_eq!(property_type, atoms::STRING);
        assert_eq!(bytes_after, 5);
        assert!(value.is_empty());
    }

    #[test]
    fn test_get_property_delete_requires_full_read() {
        let window = 0x0020_0001;
        let mut state = state_with_window(window);
        set_prop(&mut state, window, atoms::WM_NAME, b"hello");

        // partial read does not delete
        let _ = get_property(&mut state, window, true, atoms::WM_NAME, 0, 0, 1).unwrap();
        assert!(
            state.registry.windows.get(window).unwrap().properties
                .contains_key(&atoms::WM_NAME)
        );
        // full read with delete removes the property
        let _ = get_property(&mut state, window, true, atoms::WM_NAME, 0, 0, 10).unwrap();
        assert!(
            !state.registry.windows.get(window).unwrap().properties
                .contains_key(&atoms::WM_NAME)
        );
    }
}
