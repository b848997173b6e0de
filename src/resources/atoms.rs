//! Atom table
//!
//! Atoms are server-interned 32-bit handles for short strings. IDs 1..68
//! are reserved for the predefined X11 names; new atoms are assigned
//! contiguously from 69.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::protocol::types::Atom;

pub const WM_NAME: Atom = 39;
pub const STRING: Atom = 31;

#[derive(Debug)]
pub struct AtomTable {
    by_name: HashMap<String, Atom>,
    by_id: HashMap<Atom, String>,
    next_atom_id: Atom,
}

impl AtomTable {
    pub fn new() -> Self {
        let mut table = Self {
            by_name: HashMap::new(),
            by_id: HashMap::new(),
            next_atom_id: PREDEFINED_ATOMS.len() as Atom + 1,
        };
        for (index, &name) in PREDEFINED_ATOMS.iter().enumerate() {
            let id = index as Atom + 1;
            table.by_name.insert(name.to_string(), id);
            table.by_id.insert(id, name.to_string());
        }
        table
    }

    /// Return the atom for `name`, creating one unless `only_if_exists`.
    pub fn intern(&mut self, name: &str, only_if_exists: bool) -> Option<Atom> {
        if let Some(&id) = self.by_name.get(name) {
            trace!("Found existing atom '{}' with ID {}", name, id);
            Some(id)
        } else if !only_if_exists {
            let id = self.next_atom_id;
            self.next_atom_id += 1;
            self.by_name.insert(name.to_string(), id);
            self.by_id.insert(id, name.to_string());
            debug!("Created new atom '{}' with ID {}", name, id);
            Some(id)
        } else {
            trace!("Atom '{}' not found and only_if_exists=true", name);
            None
        }
    }

    pub fn name(&self, id: Atom) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn exists(&self, id: Atom) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The predefined atoms of the core protocol, in ID order starting at 1.
const PREDEFINED_ATOMS: &[&str] = &[
    "PRIMARY",
    "SECONDARY",
    "ARC",
    "ATOM",
    "BITMAP",
    "CARDINAL",
    "COLORMAP",
    "CURSOR",
    "CUT_BUFFER0",
    "CUT_BUFFER1",
    "CUT_BUFFER2",
    "CUT_BUFFER3",
    "CUT_BUFFER4",
    "CUT_BUFFER5",
    "CUT_BUFFER6",
    "CUT_BUFFER7",
    "DRAWABLE",
    "FONT",
    "INTEGER",
    "PIXMAP",
    "POINT",
    "RECTANGLE",
    "RESOURCE_MANAGER",
    "RGB_COLOR_MAP",
    "RGB_BEST_MAP",
    "RGB_BLUE_MAP",
    "RGB_DEFAULT_MAP",
    "RGB_GRAY_MAP",
    "RGB_GREEN_MAP",
    "RGB_RED_MAP",
    "STRING",
    "VISUALID",
    "WINDOW",
    "WM_COMMAND",
    "WM_HINTS",
    "WM_CLIENT_MACHINE",
    "WM_ICON_NAME",
    "WM_ICON_SIZE",
    "WM_NAME",
    "WM_NORMAL_HINTS",
    "WM_SIZE_HINTS",
    "WM_ZOOM_HINTS",
    "MIN_SPACE",
    "NORM_SPACE",
    "MAX_SPACE",
    "END_SPACE",
    "SUPERSCRIPT_X",
    "SUPERSCRIPT_Y",
    "SUBSCRIPT_X",
    "SUBSCRIPT_Y",
    "UNDERLINE_POSITION",
    "UNDERLINE_THICKNESS",
    "STRIKEOUT_ASCENT",
    "STRIKEOUT_DESCENT",
    "ITALIC_ANGLE",
    "X_HEIGHT",
    "QUAD_WIDTH",
    "WEIGHT",
    "POINT_SIZE",
    "RESOLUTION",
    "COPYRIGHT",
    "NOTICE",
    "FONT_NAME",
    "FAMILY_NAME",
    "FULL_NAME",
    "CAP_HEIGHT",
    "WM_CLASS",
    "WM_TRANSIENT_FOR",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_atoms_are_seeded() {
        let table = AtomTable::new();
        assert_eq!(table.len(), 68);
        assert_eq!(table.name(1), Some("PRIMARY"));
        assert_eq!(table.name(39), Some("WM_NAME"));
        assert_eq!(table.name(68), Some("WM_TRANSIENT_FOR"));
    }

    #[test]
    fn test_first_new_atom_is_69() {
        let mut table = AtomTable::new();
        assert_eq!(table.intern("FOO", false), Some(69));
        assert_eq!(table.name(69), Some("FOO"));
    }

    #[test]
    fn test_intern_is_idempotent() {
        let mut table = AtomTable::new();
        let a = table.intern("BAR", false);
        let b = table.intern("BAR", false);
        assert_eq!(a, b);
        assert_eq!(table.intern("WM_NAME", false), Some(39));
    }

    #[test]
    fn test_only_if_exists_returns_none_for_missing() {
        let mut table = AtomTable::new();
        assert_eq!(table.intern("NON_EXISTENT", true), None);
        assert_eq!(table.intern("PRIMARY", true), Some(1));
    }
}
