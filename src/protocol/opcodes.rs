//! X11 protocol opcodes
//!
//! Wire command numbers for the core protocol, organized by functional
//! category, plus the extension major opcodes this server advertises.

/// Window management opcodes
pub mod window {
    pub const CREATE_WINDOW: u8 = 1;
    pub const CHANGE_WINDOW_ATTRIBUTES: u8 = 2;
    pub const GET_WINDOW_ATTRIBUTES: u8 = 3;
    pub const DESTROY_WINDOW: u8 = 4;
    pub const DESTROY_SUBWINDOWS: u8 = 5;
    pub const CHANGE_SAVE_SET: u8 = 6;
    pub const REPARENT_WINDOW: u8 = 7;
    pub const MAP_WINDOW: u8 = 8;
    pub const MAP_SUBWINDOWS: u8 = 9;
    pub const UNMAP_WINDOW: u8 = 10;
    pub const UNMAP_SUBWINDOWS: u8 = 11;
    pub const CONFIGURE_WINDOW: u8 = 12;
    pub const CIRCULATE_WINDOW: u8 = 13;
    pub const GET_GEOMETRY: u8 = 14;
    pub const QUERY_TREE: u8 = 15;
}

/// Atom, property and selection opcodes
pub mod property {
    pub const INTERN_ATOM: u8 = 16;
    pub const GET_ATOM_NAME: u8 = 17;
    pub const CHANGE_PROPERTY: u8 = 18;
    pub const DELETE_PROPERTY: u8 = 19;
    pub const GET_PROPERTY: u8 = 20;
    pub const LIST_PROPERTIES: u8 = 21;
    pub const SET_SELECTION_OWNER: u8 = 22;
    pub const GET_SELECTION_OWNER: u8 = 23;
    pub const CONVERT_SELECTION: u8 = 24;
    pub const SEND_EVENT: u8 = 25;
    pub const ROTATE_PROPERTIES: u8 = 114;
}

/// Input, grab and focus opcodes
pub mod input {
    pub const GRAB_POINTER: u8 = 26;
    pub const UNGRAB_POINTER: u8 = 27;
    pub const GRAB_BUTTON: u8 = 28;
    pub const UNGRAB_BUTTON: u8 = 29;
    pub const CHANGE_ACTIVE_POINTER_GRAB: u8 = 30;
    pub const GRAB_KEYBOARD: u8 = 31;
    pub const UNGRAB_KEYBOARD: u8 = 32;
    pub const GRAB_KEY: u8 = 33;
    pub const UNGRAB_KEY: u8 = 34;
    pub const ALLOW_EVENTS: u8 = 35;
    pub const GRAB_SERVER: u8 = 36;
    pub const UNGRAB_SERVER: u8 = 37;
    pub const QUERY_POINTER: u8 = 38;
    pub const GET_MOTION_EVENTS: u8 = 39;
    pub const TRANSLATE_COORDINATES: u8 = 40;
    pub const WARP_POINTER: u8 = 41;
    pub const SET_INPUT_FOCUS: u8 = 42;
    pub const GET_INPUT_FOCUS: u8 = 43;
    pub const QUERY_KEYMAP: u8 = 44;
}

/// Text and font opcodes
pub mod text {
    pub const OPEN_FONT: u8 = 45;
    pub const CLOSE_FONT: u8 = 46;
    pub const QUERY_FONT: u8 = 47;
    pub const QUERY_TEXT_EXTENTS: u8 = 48;
    pub const LIST_FONTS: u8 = 49;
    pub const LIST_FONTS_WITH_INFO: u8 = 50;
    pub const SET_FONT_PATH: u8 = 51;
    pub const GET_FONT_PATH: u8 = 52;
    pub const POLY_TEXT8: u8 = 74;
    pub const POLY_TEXT16: u8 = 75;
    pub const IMAGE_TEXT8: u8 = 76;
    pub const IMAGE_TEXT16: u8 = 77;
}

/// Graphics and drawing opcodes
pub mod graphics {
    pub const CREATE_PIXMAP: u8 = 53;
    pub const FREE_PIXMAP: u8 = 54;
    pub const CREATE_GC: u8 = 55;
    pub const CHANGE_GC: u8 = 56;
    pub const COPY_GC: u8 = 57;
    pub const SET_DASHES: u8 = 58;
    pub const SET_CLIP_RECTANGLES: u8 = 59;
    pub const FREE_GC: u8 = 60;
    pub const CLEAR_AREA: u8 = 61;
    pub const COPY_AREA: u8 = 62;
    pub const COPY_PLANE: u8 = 63;
    pub const POLY_POINT: u8 = 64;
    pub const POLY_LINE: u8 = 65;
    pub const POLY_SEGMENT: u8 = 66;
    pub const POLY_RECTANGLE: u8 = 67;
    pub const POLY_ARC: u8 = 68;
    pub const FILL_POLY: u8 = 69;
    pub const POLY_FILL_RECTANGLE: u8 = 70;
    pub const POLY_FILL_ARC: u8 = 71;
    pub const PUT_IMAGE: u8 = 72;
    pub const GET_IMAGE: u8 = 73;
}

/// Colormap and color opcodes
pub mod color {
    pub const CREATE_COLORMAP: u8 = 78;
    pub const FREE_COLORMAP: u8 = 79;
    pub const COPY_COLORMAP_AND_FREE: u8 = 80;
    pub const INSTALL_COLORMAP: u8 = 81;
    pub const UNINSTALL_COLORMAP: u8 = 82;
    pub const LIST_INSTALLED_COLORMAPS: u8 = 83;
    pub const ALLOC_COLOR: u8 = 84;
    pub const ALLOC_NAMED_COLOR: u8 = 85;
    pub const ALLOC_COLOR_CELLS: u8 = 86;
    pub const ALLOC_COLOR_PLANES: u8 = 87;
    pub const FREE_COLORS: u8 = 88;
    pub const STORE_COLORS: u8 = 89;
    pub const STORE_NAMED_COLOR: u8 = 90;
    pub const QUERY_COLORS: u8 = 91;
    pub const LOOKUP_COLOR: u8 = 92;
}

/// Cursor opcodes
pub mod cursor {
    pub const CREATE_CURSOR: u8 = 93;
    pub const CREATE_GLYPH_CURSOR: u8 = 94;
    pub const FREE_CURSOR: u8 = 95;
    pub const RECOLOR_CURSOR: u8 = 96;
}

/// Keyboard, pointer-control and housekeeping opcodes
pub mod misc {
    pub const QUERY_BEST_SIZE: u8 = 97;
    pub const QUERY_EXTENSION: u8 = 98;
    pub const LIST_EXTENSIONS: u8 = 99;
    pub const CHANGE_KEYBOARD_MAPPING: u8 = 100;
    pub const GET_KEYBOARD_MAPPING: u8 = 101;
    pub const CHANGE_KEYBOARD_CONTROL: u8 = 102;
    pub const GET_KEYBOARD_CONTROL: u8 = 103;
    pub const BELL: u8 = 104;
    pub const CHANGE_POINTER_CONTROL: u8 = 105;
    pub const GET_POINTER_CONTROL: u8 = 106;
    pub const SET_SCREEN_SAVER: u8 = 107;
    pub const GET_SCREEN_SAVER: u8 = 108;
    pub const CHANGE_HOSTS: u8 = 109;
    pub const LIST_HOSTS: u8 = 110;
    pub const SET_ACCESS_CONTROL: u8 = 111;
    pub const SET_CLOSE_DOWN_MODE: u8 = 112;
    pub const KILL_CLIENT: u8 = 113;
    pub const FORCE_SCREEN_SAVER: u8 = 115;
    pub const SET_POINTER_MAPPING: u8 = 116;
    pub const GET_POINTER_MAPPING: u8 = 117;
    pub const SET_MODIFIER_MAPPING: u8 = 118;
    pub const GET_MODIFIER_MAPPING: u8 = 119;
    pub const NO_OPERATION: u8 = 127;
}

/// Extension major opcodes served by this implementation
pub mod extension {
    pub const XINPUT: u8 = 131;
    pub const BIG_REQUESTS: u8 = 133;

    pub const XINPUT_NAME: &str = "XInputExtension";
    pub const BIG_REQUESTS_NAME: &str = "BIG-REQUESTS";

    /// First event code assigned to the XInput extension.
    pub const XINPUT_EVENT_BASE: u8 = 64;
    /// First error code assigned to the XInput extension.
    pub const XINPUT_ERROR_BASE: u8 = 128;
}
