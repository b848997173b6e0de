//! Request definitions and parsing
//!
//! Every request arrives as a 4-byte header (major opcode, a data byte
//! whose meaning depends on the opcode, and a length in 4-byte units)
//! followed by the body. A length of 0 introduces a Big-Requests
//! extended length. The connection layer does the framing; this module
//! turns (opcode, data byte, body) into a typed [`Request`].

use super::opcodes;
use super::types::*;
use super::wire::{ByteOrderReader, ShortRead};
use super::xinput::{self, XiRequest};

/// The fixed request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub opcode: u8,
    pub data: u8,
    /// Length in 4-byte units including the header; 0 introduces a
    /// Big-Requests extended length.
    pub length: u16,
}

impl RequestHeader {
    pub fn parse(bytes: &[u8; 4], order: ByteOrder) -> Self {
        let mut r = ByteOrderReader::new(&bytes[2..], order);
        Self {
            opcode: bytes[0],
            data: bytes[1],
            length: r.read_u16().expect("two bytes present"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The body was shorter than the request's fixed form requires.
    #[error(transparent)]
    Short(#[from] ShortRead),
    /// A field carried a value outside its legal range.
    #[error("illegal value {0}")]
    Value(u32),
}

/// Window attribute value-list (CreateWindow / ChangeWindowAttributes).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowAttributes {
    pub background_pixmap: Option<PixmapId>,
    pub background_pixel: Option<u32>,
    pub border_pixmap: Option<PixmapId>,
    pub border_pixel: Option<u32>,
    pub bit_gravity: Option<u8>,
    pub win_gravity: Option<u8>,
    pub backing_store: Option<u8>,
    pub backing_planes: Option<u32>,
    pub backing_pixel: Option<u32>,
    pub override_redirect: Option<bool>,
    pub save_under: Option<bool>,
    pub event_mask: Option<EventMask>,
    pub do_not_propagate_mask: Option<EventMask>,
    pub colormap: Option<ColormapId>,
    pub cursor: Option<CursorId>,
}

impl WindowAttributes {
    pub fn parse(r: &mut ByteOrderReader<'_>) -> Result<Self, ParseError> {
        let mask = r.read_u32()?;
        let mut attrs = WindowAttributes::default();
        if mask & 0x0001 != 0 {
            attrs.background_pixmap = Some(r.read_u32()?);
        }
        if mask & 0x0002 != 0 {
            attrs.background_pixel = Some(r.read_u32()?);
        }
        if mask & 0x0004 != 0 {
            attrs.border_pixmap = Some(r.read_u32()?);
        }
        if mask & 0x0008 != 0 {
            attrs.border_pixel = Some(r.read_u32()?);
        }
        if mask & 0x0010 != 0 {
            attrs.bit_gravity = Some(r.read_u32()? as u8);
        }
        if mask & 0x0020 != 0 {
            attrs.win_gravity = Some(r.read_u32()? as u8);
        }
        if mask & 0x0040 != 0 {
            attrs.backing_store = Some(r.read_u32()? as u8);
        }
        if mask & 0x0080 != 0 {
            attrs.backing_planes = Some(r.read_u32()?);
        }
        if mask & 0x0100 != 0 {
            attrs.backing_pixel = Some(r.read_u32()?);
        }
        if mask & 0x0200 != 0 {
            attrs.override_redirect = Some(r.read_u32()? != 0);
        }
        if mask & 0x0400 != 0 {
            attrs.save_under = Some(r.read_u32()? != 0);
        }
        if mask & 0x0800 != 0 {
            attrs.event_mask = Some(EventMask::from_bits_truncate(r.read_u32()?));
        }
        if mask & 0x1000 != 0 {
            attrs.do_not_propagate_mask = Some(EventMask::from_bits_truncate(r.read_u32()?));
        }
        if mask & 0x2000 != 0 {
            attrs.colormap = Some(r.read_u32()?);
        }
        if mask & 0x4000 != 0 {
            attrs.cursor = Some(r.read_u32()?);
        }
        Ok(attrs)
    }
}

/// GC value-list (CreateGC / ChangeGC).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcValues {
    pub function: Option<u8>,
    pub plane_mask: Option<u32>,
    pub foreground: Option<u32>,
    pub background: Option<u32>,
    pub line_width: Option<u16>,
    pub line_style: Option<u8>,
    pub cap_style: Option<u8>,
    pub join_style: Option<u8>,
    pub fill_style: Option<u8>,
    pub fill_rule: Option<u8>,
    pub tile: Option<PixmapId>,
    pub stipple: Option<PixmapId>,
    pub tile_stipple_x_origin: Option<i16>,
    pub tile_stipple_y_origin: Option<i16>,
    pub font: Option<FontId>,
    pub subwindow_mode: Option<u8>,
    pub graphics_exposures: Option<bool>,
    pub clip_x_origin: Option<i16>,
    pub clip_y_origin: Option<i16>,
    pub clip_mask: Option<PixmapId>,
    pub dash_offset: Option<u16>,
    pub dashes: Option<u8>,
    pub arc_mode: Option<u8>,
}

impl GcValues {
    pub fn parse(r: &mut ByteOrderReader<'_>) -> Result<Self, ParseError> {
        let mask = r.read_u32()?;
        let mut v = GcValues::default();
        if mask & 0x0000_0001 != 0 {
            v.function = Some(r.read_u32()? as u8);
        }
        if mask & 0x0000_0002 != 0 {
            v.plane_mask = Some(r.read_u32()?);
        }
        if mask & 0x0000_0004 != 0 {
            v.foreground = Some(r.read_u32()?);
        }
        if mask & 0x0000_0008 != 0 {
            v.background = Some(r.read_u32()?);
        }
        if mask & 0x0000_0010 != 0 {
            v.line_width = Some(r.read_u32()? as u16);
        }
        if mask & 0x0000_0020 != 0 {
            v.line_style = Some(r.read_u32()? as u8);
        }
        if mask & 0x0000_0040 != 0 {
            v.cap_style = Some(r.read_u32()? as u8);
        }
        if mask & 0x0000_0080 != 0 {
            v.join_style = Some(r.read_u32()? as u8);
        }
        if mask & 0x0000_0100 != 0 {
            v.fill_style = Some(r.read_u32()? as u8);
        }
        if mask & 0x0000_0200 != 0 {
            v.fill_rule = Some(r.read_u32()? as u8);
        }
        if mask & 0x0000_0400 != 0 {
            v.tile = Some(r.read_u32()?);
        }
        if mask & 0x0000_0800 != 0 {
            v.stipple = Some(r.read_u32()?);
        }
        if mask & 0x0000_1000 != 0 {
            v.tile_stipple_x_origin = Some(r.read_u32()? as i16);
        }
        if mask & 0x0000_2000 != 0 {
            v.tile_stipple_y_origin = Some(r.read_u32()? as i16);
        }
        if mask & 0x0000_4000 != 0 {
            v.font = Some(r.read_u32()?);
        }
        if mask & 0x0000_8000 != 0 {
            v.subwindow_mode = Some(r.read_u32()? as u8);
        }
        if mask & 0x0001_0000 != 0 {
            v.graphics_exposures = Some(r.read_u32()? != 0);
        }
        if mask & 0x0002_0000 != 0 {
            v.clip_x_origin = Some(r.read_u32()? as i16);
        }
        if mask & 0x0004_0000 != 0 {
            v.clip_y_origin = Some(r.read_u32()? as i16);
        }
        if mask & 0x0008_0000 != 0 {
            v.clip_mask = Some(r.read_u32()?);
        }
        if mask & 0x0010_0000 != 0 {
            v.dash_offset = Some(r.read_u32()? as u16);
        }
        if mask & 0x0020_0000 != 0 {
            v.dashes = Some(r.read_u32()? as u8);
        }
        if mask & 0x0040_0000 != 0 {
            v.arc_mode = Some(r.read_u32()? as u8);
        }
        Ok(v)
    }
}

/// ConfigureWindow value-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigureValues {
    pub x: Option<i16>,
    pub y: Option<i16>,
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub border_width: Option<u16>,
    pub sibling: Option<WindowId>,
    pub stack_mode: Option<StackMode>,
}

impl ConfigureValues {
    pub fn parse(r: &mut ByteOrderReader<'_>) -> Result<Self, ParseError> {
        let mask = r.read_u16()?;
        r.skip(2)?;
        let mut v = ConfigureValues::default();
        if mask & 0x01 != 0 {
            v.x = Some(r.read_u32()? as i16);
        }
        if mask & 0x02 != 0 {
            v.y = Some(r.read_u32()? as i16);
        }
        if mask & 0x04 != 0 {
            v.width = Some(r.read_u32()? as u16);
        }
        if mask & 0x08 != 0 {
            v.height = Some(r.read_u32()? as u16);
        }
        if mask & 0x10 != 0 {
            v.border_width = Some(r.read_u32()? as u16);
        }
        if mask & 0x20 != 0 {
            v.sibling = Some(r.read_u32()?);
        }
        if mask & 0x40 != 0 {
            let raw = r.read_u32()?;
            v.stack_mode = Some(StackMode::from_u8(raw as u8).ok_or(ParseError::Value(raw))?);
        }
        Ok(v)
    }
}

/// Keyboard control value-list (ChangeKeyboardControl).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardControlValues {
    pub key_click_percent: Option<i8>,
    pub bell_percent: Option<i8>,
    pub bell_pitch: Option<i16>,
    pub bell_duration: Option<i16>,
    pub led: Option<u8>,
    pub led_mode: Option<u8>,
    pub key: Option<KeyCode>,
    pub auto_repeat_mode: Option<u8>,
}

impl KeyboardControlValues {
    pub fn parse(r: &mut ByteOrderReader<'_>) -> Result<Self, ParseError> {
        let mask = r.read_u32()?;
        let mut v = KeyboardControlValues::default();
        if mask & 0x01 != 0 {
            v.key_click_percent = Some(r.read_u32()? as i8);
        }
        if mask & 0x02 != 0 {
            v.bell_percent = Some(r.read_u32()? as i8);
        }
        if mask & 0x04 != 0 {
            v.bell_pitch = Some(r.read_u32()? as i16);
        }
        if mask & 0x08 != 0 {
            v.bell_duration = Some(r.read_u32()? as i16);
        }
        if mask & 0x10 != 0 {
            v.led = Some(r.read_u32()? as u8);
        }
        if mask & 0x20 != 0 {
            v.led_mode = Some(r.read_u32()? as u8);
        }
        if mask & 0x40 != 0 {
            v.key = Some(r.read_u32()? as u8);
        }
        if mask & 0x80 != 0 {
            v.auto_repeat_mode = Some(r.read_u32()? as u8);
        }
        Ok(v)
    }
}

/// One item of a PolyText request: a glyph run or a font switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextItem<T> {
    Glyphs { delta: i8, glyphs: Vec<T> },
    Font(FontId),
}

/// One item of a StoreColors request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorItem {
    pub pixel: u32,
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    /// do-red (1), do-green (2), do-blue (4)
    pub flags: u8,
}

/// All requests understood by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    // Windows
    CreateWindow {
        depth: u8,
        wid: WindowId,
        parent: WindowId,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        border_width: u16,
        class: WindowClass,
        visual: VisualId,
        attrs: WindowAttributes,
    },
    ChangeWindowAttributes {
        window: WindowId,
        attrs: WindowAttributes,
    },
    GetWindowAttributes {
        window: WindowId,
    },
    DestroyWindow {
        window: WindowId,
    },
    DestroySubwindows {
        window: WindowId,
    },
    ChangeSaveSet {
        insert: bool,
        window: WindowId,
    },
    ReparentWindow {
        window: WindowId,
        parent: WindowId,
        x: i16,
        y: i16,
    },
    MapWindow {
        window: WindowId,
    },
    MapSubwindows {
        window: WindowId,
    },
    UnmapWindow {
        window: WindowId,
    },
    UnmapSubwindows {
        window: WindowId,
    },
    ConfigureWindow {
        window: WindowId,
        values: ConfigureValues,
    },
    CirculateWindow {
        raise_lowest: bool,
        window: WindowId,
    },
    GetGeometry {
        drawable: DrawableId,
    },
    QueryTree {
        window: WindowId,
    },

    // Atoms, properties, selections
    InternAtom {
        only_if_exists: bool,
        name: String,
    },
    GetAtomName {
        atom: Atom,
    },
    ChangeProperty {
        mode: PropertyMode,
        window: WindowId,
        property: Atom,
        property_type: Atom,
        format: u8,
        data: Vec<u8>,
    },
    DeleteProperty {
        window: WindowId,
        property: Atom,
    },
    GetProperty {
        delete: bool,
        window: WindowId,
        property: Atom,
        property_type: Atom,
        long_offset: u32,
        long_length: u32,
    },
    ListProperties {
        window: WindowId,
    },
    RotateProperties {
        window: WindowId,
        delta: i16,
        properties: Vec<Atom>,
    },
    SetSelectionOwner {
        owner: WindowId,
        selection: Atom,
        time: Timestamp,
    },
    GetSelectionOwner {
        selection: Atom,
    },
    ConvertSelection {
        requestor: WindowId,
        selection: Atom,
        target: Atom,
        property: Atom,
        time: Timestamp,
    },
    SendEvent {
        propagate: bool,
        destination: WindowId,
        event_mask: EventMask,
        event: [u8; 32],
    },

    // Grabs and input
    GrabPointer {
        owner_events: bool,
        grab_window: WindowId,
        event_mask: EventMask,
        pointer_mode: GrabMode,
        keyboard_mode: GrabMode,
        confine_to: WindowId,
        cursor: CursorId,
        time: Timestamp,
    },
    UngrabPointer {
        time: Timestamp,
    },
    GrabButton {
        owner_events: bool,
        grab_window: WindowId,
        event_mask: EventMask,
        pointer_mode: GrabMode,
        keyboard_mode: GrabMode,
        confine_to: WindowId,
        cursor: CursorId,
        button: Button,
        modifiers: u16,
    },
    UngrabButton {
        button: Button,
        grab_window: WindowId,
        modifiers: u16,
    },
    ChangeActivePointerGrab {
        cursor: CursorId,
        time: Timestamp,
        event_mask: EventMask,
    },
    GrabKeyboard {
        owner_events: bool,
        grab_window: WindowId,
        time: Timestamp,
        pointer_mode: GrabMode,
        keyboard_mode: GrabMode,
    },
    UngrabKeyboard {
        time: Timestamp,
    },
    GrabKey {
        owner_events: bool,
        grab_window: WindowId,
        modifiers: u16,
        key: KeyCode,
        pointer_mode: GrabMode,
        keyboard_mode: GrabMode,
    },
    UngrabKey {
        key: KeyCode,
        grab_window: WindowId,
        modifiers: u16,
    },
    AllowEvents {
        mode: AllowEventsMode,
        time: Timestamp,
    },
    GrabServer,
    UngrabServer,
    QueryPointer {
        window: WindowId,
    },
    GetMotionEvents {
        window: WindowId,
        start: Timestamp,
        stop: Timestamp,
    },
    TranslateCoordinates {
        src_window: WindowId,
        dst_window: WindowId,
        src_x: i16,
        src_y: i16,
    },
    WarpPointer {
        src_window: WindowId,
        dst_window: WindowId,
        src_x: i16,
        src_y: i16,
        src_width: u16,
        src_height: u16,
        dst_x: i16,
        dst_y: i16,
    },
    SetInputFocus {
        revert_to: RevertTo,
        focus: WindowId,
        time: Timestamp,
    },
    GetInputFocus,
    QueryKeymap,

    // Fonts and text
    OpenFont {
        fid: FontId,
        name: String,
    },
    CloseFont {
        font: FontId,
    },
    QueryFont {
        font: FontId,
    },
    QueryTextExtents {
        font: FontId,
        string: Vec<u16>,
    },
    ListFonts {
        max_names: u16,
        pattern: String,
    },
    ListFontsWithInfo {
        max_names: u16,
        pattern: String,
    },
    SetFontPath {
        paths: Vec<String>,
    },
    GetFontPath,
    PolyText8 {
        drawable: DrawableId,
        gc: GContextId,
        x: i16,
        y: i16,
        items: Vec<TextItem<u8>>,
    },
    PolyText16 {
        drawable: DrawableId,
        gc: GContextId,
        x: i16,
        y: i16,
        items: Vec<TextItem<u16>>,
    },
    ImageText8 {
        drawable: DrawableId,
        gc: GContextId,
        x: i16,
        y: i16,
        string: Vec<u8>,
    },
    ImageText16 {
        drawable: DrawableId,
        gc: GContextId,
        x: i16,
        y: i16,
        string: Vec<u16>,
    },

    // Pixmaps, GCs, drawing
    CreatePixmap {
        depth: u8,
        pid: PixmapId,
        drawable: DrawableId,
        width: u16,
        height: u16,
    },
    FreePixmap {
        pixmap: PixmapId,
    },
    CreateGc {
        cid: GContextId,
        drawable: DrawableId,
        values: GcValues,
    },
    ChangeGc {
        gc: GContextId,
        values: GcValues,
    },
    CopyGc {
        src_gc: GContextId,
        dst_gc: GContextId,
        value_mask: u32,
    },
    SetDashes {
        gc: GContextId,
        dash_offset: u16,
        dashes: Vec<u8>,
    },
    SetClipRectangles {
        ordering: u8,
        gc: GContextId,
        clip_x_origin: i16,
        clip_y_origin: i16,
        rectangles: Vec<Rectangle>,
    },
    FreeGc {
        gc: GContextId,
    },
    ClearArea {
        exposures: bool,
        window: WindowId,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
    },
    CopyArea {
        src_drawable: DrawableId,
        dst_drawable: DrawableId,
        gc: GContextId,
        src_x: i16,
        src_y: i16,
        dst_x: i16,
        dst_y: i16,
        width: u16,
        height: u16,
    },
    CopyPlane {
        src_drawable: DrawableId,
        dst_drawable: DrawableId,
        gc: GContextId,
        src_x: i16,
        src_y: i16,
        dst_x: i16,
        dst_y: i16,
        width: u16,
        height: u16,
        bit_plane: u32,
    },
    PolyPoint {
        relative: bool,
        drawable: DrawableId,
        gc: GContextId,
        points: Vec<Point>,
    },
    PolyLine {
        relative: bool,
        drawable: DrawableId,
        gc: GContextId,
        points: Vec<Point>,
    },
    PolySegment {
        drawable: DrawableId,
        gc: GContextId,
        segments: Vec<Segment>,
    },
    PolyRectangle {
        drawable: DrawableId,
        gc: GContextId,
        rectangles: Vec<Rectangle>,
    },
    PolyArc {
        drawable: DrawableId,
        gc: GContextId,
        arcs: Vec<Arc>,
    },
    FillPoly {
        drawable: DrawableId,
        gc: GContextId,
        shape: u8,
        relative: bool,
        points: Vec<Point>,
    },
    PolyFillRectangle {
        drawable: DrawableId,
        gc: GContextId,
        rectangles: Vec<Rectangle>,
    },
    PolyFillArc {
        drawable: DrawableId,
        gc: GContextId,
        arcs: Vec<Arc>,
    },
    PutImage {
        format: u8,
        drawable: DrawableId,
        gc: GContextId,
        width: u16,
        height: u16,
        dst_x: i16,
        dst_y: i16,
        left_pad: u8,
        depth: u8,
        data: Vec<u8>,
    },
    GetImage {
        format: u8,
        drawable: DrawableId,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        plane_mask: u32,
    },

    // Colormaps
    CreateColormap {
        alloc_all: bool,
        mid: ColormapId,
        window: WindowId,
        visual: VisualId,
    },
    FreeColormap {
        cmap: ColormapId,
    },
    CopyColormapAndFree {
        mid: ColormapId,
        src_cmap: ColormapId,
    },
    InstallColormap {
        cmap: ColormapId,
    },
    UninstallColormap {
        cmap: ColormapId,
    },
    ListInstalledColormaps {
        window: WindowId,
    },
    AllocColor {
        cmap: ColormapId,
        red: u16,
        green: u16,
        blue: u16,
    },
    AllocNamedColor {
        cmap: ColormapId,
        name: String,
    },
    AllocColorCells {
        contiguous: bool,
        cmap: ColormapId,
        colors: u16,
        planes: u16,
    },
    AllocColorPlanes {
        contiguous: bool,
        cmap: ColormapId,
        colors: u16,
        reds: u16,
        greens: u16,
        blues: u16,
    },
    FreeColors {
        cmap: ColormapId,
        plane_mask: u32,
        pixels: Vec<u32>,
    },
    StoreColors {
        cmap: ColormapId,
        items: Vec<ColorItem>,
    },
    StoreNamedColor {
        flags: u8,
        cmap: ColormapId,
        pixel: u32,
        name: String,
    },
    QueryColors {
        cmap: ColormapId,
        pixels: Vec<u32>,
    },
    LookupColor {
        cmap: ColormapId,
        name: String,
    },

    // Cursors
    CreateCursor {
        cid: CursorId,
        source: PixmapId,
        mask: PixmapId,
        fore_red: u16,
        fore_green: u16,
        fore_blue: u16,
        back_red: u16,
        back_green: u16,
        back_blue: u16,
        x: u16,
        y: u16,
    },
    CreateGlyphCursor {
        cid: CursorId,
        source_font: FontId,
        mask_font: FontId,
        source_char: u16,
        mask_char: u16,
        fore_red: u16,
        fore_green: u16,
        fore_blue: u16,
        back_red: u16,
        back_green: u16,
        back_blue: u16,
    },
    FreeCursor {
        cursor: CursorId,
    },
    RecolorCursor {
        cursor: CursorId,
        fore_red: u16,
        fore_green: u16,
        fore_blue: u16,
        back_red: u16,
        back_green: u16,
        back_blue: u16,
    },

    // Keyboard, pointer, housekeeping
    QueryBestSize {
        class: u8,
        drawable: DrawableId,
        width: u16,
        height: u16,
    },
    QueryExtension {
        name: String,
    },
    ListExtensions,
    ChangeKeyboardMapping {
        first_keycode: KeyCode,
        keysyms_per_keycode: u8,
        keysyms: Vec<u32>,
    },
    GetKeyboardMapping {
        first_keycode: KeyCode,
        count: u8,
    },
    ChangeKeyboardControl {
        values: KeyboardControlValues,
    },
    GetKeyboardControl,
    Bell {
        percent: i8,
    },
    ChangePointerControl {
        acceleration_numerator: i16,
        acceleration_denominator: i16,
        threshold: i16,
        do_acceleration: bool,
        do_threshold: bool,
    },
    GetPointerControl,
    SetScreenSaver {
        timeout: i16,
        interval: i16,
        prefer_blanking: u8,
        allow_exposures: u8,
    },
    GetScreenSaver,
    ChangeHosts {
        insert: bool,
        family: u8,
        address: Vec<u8>,
    },
    ListHosts,
    SetAccessControl {
        enabled: bool,
    },
    SetCloseDownMode {
        mode: CloseDownMode,
    },
    KillClient {
        resource: XId,
    },
    ForceScreenSaver {
        activate: bool,
    },
    SetPointerMapping {
        map: Vec<u8>,
    },
    GetPointerMapping,
    SetModifierMapping {
        keycodes_per_modifier: u8,
        keycodes: Vec<KeyCode>,
    },
    GetModifierMapping,
    NoOperation,

    // Extensions
    BigReqEnable,
    XInput(XiRequest),
    Unknown {
        opcode: u8,
    },
}

impl Request {
    /// Parse the body of a framed request. `data` is the header's second
    /// byte, `body` everything past the (possibly extended) header.
    pub fn parse(
        opcode: u8,
        data: u8,
        body: &[u8],
        order: ByteOrder,
    ) -> Result<Request, ParseError> {
        use opcodes::*;

        let mut r = ByteOrderReader::new(body, order);
        let req = match opcode {
            window::CREATE_WINDOW => {
                let wid = r.read_u32()?;
                let parent = r.read_u32()?;
                let x = r.read_i16()?;
                let y = r.read_i16()?;
                let width = r.read_u16()?;
                let height = r.read_u16()?;
                let border_width = r.read_u16()?;
                let raw_class = r.read_u16()?;
                let class =
                    WindowClass::from_u16(raw_class).ok_or(ParseError::Value(raw_class as u32))?;
                let visual = r.read_u32()?;
                let attrs = WindowAttributes::parse(&mut r)?;
                Request::CreateWindow {
                    depth: data,
                    wid,
                    parent,
                    x,
                    y,
                    width,
                    height,
                    border_width,
                    class,
                    visual,
                    attrs,
                }
            }
            window::CHANGE_WINDOW_ATTRIBUTES => Request::ChangeWindowAttributes {
                window: r.read_u32()?,
                attrs: WindowAttributes::parse(&mut r)?,
            },
            window::GET_WINDOW_ATTRIBUTES => Request::GetWindowAttributes {
                window: r.read_u32()?,
            },
            window::DESTROY_WINDOW => Request::DestroyWindow {
                window: r.read_u32()?,
            },
            window::DESTROY_SUBWINDOWS => Request::DestroySubwindows {
                window: r.read_u32()?,
            },
            window::CHANGE_SAVE_SET => Request::ChangeSaveSet {
                insert: data == 0,
                window: r.read_u32()?,
            },
            window::REPARENT_WINDOW => Request::ReparentWindow {
                window: r.read_u32()?,
                parent: r.read_u32()?,
                x: r.read_i16()?,
                y: r.read_i16()?,
            },
            window::MAP_WINDOW => Request::MapWindow {
                window: r.read_u32()?,
            },
            window::MAP_SUBWINDOWS => Request::MapSubwindows {
                window: r.read_u32()?,
            },
            window::UNMAP_WINDOW => Request::UnmapWindow {
                window: r.read_u32()?,
            },
            window::UNMAP_SUBWINDOWS => Request::UnmapSubwindows {
                window: r.read_u32()?,
            },
            window::CONFIGURE_WINDOW => Request::ConfigureWindow {
                window: r.read_u32()?,
                values: ConfigureValues::parse(&mut r)?,
            },
            window::CIRCULATE_WINDOW => Request::CirculateWindow {
                raise_lowest: data == 0,
                window: r.read_u32()?,
            },
            window::GET_GEOMETRY => Request::GetGeometry {
                drawable: r.read_u32()?,
            },
            window::QUERY_TREE => Request::QueryTree {
                window: r.read_u32()?,
            },

            property::INTERN_ATOM => {
                let name_len = r.read_u16()? as usize;
                r.skip(2)?;
                let name = r.read_string(name_len)?;
                Request::InternAtom {
                    only_if_exists: data != 0,
                    name,
                }
            }
            property::GET_ATOM_NAME => Request::GetAtomName {
                atom: r.read_u32()?,
            },
            property::CHANGE_PROPERTY => {
                let mode = PropertyMode::from_u8(data).ok_or(ParseError::Value(data as u32))?;
                let window = r.read_u32()?;
                let prop = r.read_u32()?;
                let property_type = r.read_u32()?;
                let format = r.read_u8()?;
                if !matches!(format, 8 | 16 | 32) {
                    return Err(ParseError::Value(format as u32));
                }
                r.skip(3)?;
                let units = r.read_u32()? as usize;
                let len = units * (format as usize / 8);
                let bytes = r.read_bytes(len)?.to_vec();
                Request::ChangeProperty {
                    mode,
                    window,
                    property: prop,
                    property_type,
                    format,
                    data: bytes,
                }
            }
            property::DELETE_PROPERTY => Request::DeleteProperty {
                window: r.read_u32()?,
                property: r.read_u32()?,
            },
            property::GET_PROPERTY => Request::GetProperty {
                delete: data != 0,
                window: r.read_u32()?,
                property: r.read_u32()?,
                property_type: r.read_u32()?,
                long_offset: r.read_u32()?,
                long_length: r.read_u32()?,
            },
            property::LIST_PROPERTIES => Request::ListProperties {
                window: r.read_u32()?,
            },
            property::ROTATE_PROPERTIES => {
                let window = r.read_u32()?;
                let count = r.read_u16()? as usize;
                let delta = r.read_i16()?;
                let mut properties = Vec::with_capacity(count);
                for _ in 0..count {
                    properties.push(r.read_u32()?);
                }
                Request::RotateProperties {
                    window,
                    delta,
                    properties,
                }
            }
            property::SET_SELECTION_OWNER => Request::SetSelectionOwner {
                owner: r.read_u32()?,
                selection: r.read_u32()?,
                time: r.read_u32()?,
            },
            property::GET_SELECTION_OWNER => Request::GetSelectionOwner {
                selection: r.read_u32()?,
            },
            property::CONVERT_SELECTION => Request::ConvertSelection {
                requestor: r.read_u32()?,
                selection: r.read_u32()?,
                target: r.read_u32()?,
                property: r.read_u32()?,
                time: r.read_u32()?,
            },
            property::SEND_EVENT => {
                let destination = r.read_u32()?;
                let event_mask = EventMask::from_bits_truncate(r.read_u32()?);
                let raw = r.read_bytes(32)?;
                let mut event = [0u8; 32];
                event.copy_from_slice(raw);
                Request::SendEvent {
                    propagate: data != 0,
                    destination,
                    event_mask,
                    event,
                }
            }

            input::GRAB_POINTER => Request::GrabPointer {
                owner_events: data != 0,
                grab_window: r.read_u32()?,
                event_mask: EventMask::from_bits_truncate(r.read_u16()? as u32),
                pointer_mode: {
                    let raw = r.read_u8()?;
                    GrabMode::from_u8(raw).ok_or(ParseError::Value(raw as u32))?
                },
                keyboard_mode: {
                    let raw = r.read_u8()?;
                    GrabMode::from_u8(raw).ok_or(ParseError::Value(raw as u32))?
                },
                confine_to: r.read_u32()?,
                cursor: r.read_u32()?,
                time: r.read_u32()?,
            },
            input::UNGRAB_POINTER => Request::UngrabPointer {
                time: r.read_u32()?,
            },
            input::GRAB_BUTTON => {
                let grab_window = r.read_u32()?;
                let event_mask = EventMask::from_bits_truncate(r.read_u16()? as u32);
                let pointer_mode = {
                    let raw = r.read_u8()?;
                    GrabMode::from_u8(raw).ok_or(ParseError::Value(raw as u32))?
                };
                let keyboard_mode = {
                    let raw = r.read_u8()?;
                    GrabMode::from_u8(raw).ok_or(ParseError::Value(raw as u32))?
                };
                let confine_to = r.read_u32()?;
                let cursor = r.read_u32()?;
                let button = r.read_u8()?;
                r.skip(1)?;
                let modifiers = r.read_u16()?;
                Request::GrabButton {
                    owner_events: data != 0,
                    grab_window,
                    event_mask,
                    pointer_mode,
                    keyboard_mode,
                    confine_to,
                    cursor,
                    button,
                    modifiers,
                }
            }
            input::UNGRAB_BUTTON => Request::UngrabButton {
                button: data,
                grab_window: r.read_u32()?,
                modifiers: r.read_u16()?,
            },
            input::CHANGE_ACTIVE_POINTER_GRAB => Request::ChangeActivePointerGrab {
                cursor: r.read_u32()?,
                time: r.read_u32()?,
                event_mask: EventMask::from_bits_truncate(r.read_u16()? as u32),
            },
            input::GRAB_KEYBOARD => Request::GrabKeyboard {
                owner_events: data != 0,
                grab_window: r.read_u32()?,
                time: r.read_u32()?,
                pointer_mode: {
                    let raw = r.read_u8()?;
                    GrabMode::from_u8(raw).ok_or(ParseError::Value(raw as u32))?
                },
                keyboard_mode: {
                    let raw = r.read_u8()?;
                    GrabMode::from_u8(raw).ok_or(ParseError::Value(raw as u32))?
                },
            },
            input::UNGRAB_KEYBOARD => Request::UngrabKeyboard {
                time: r.read_u32()?,
            },
            input::GRAB_KEY => Request::GrabKey {
                owner_events: data != 0,
                grab_window: r.read_u32()?,
                modifiers: r.read_u16()?,
                key: r.read_u8()?,
                pointer_mode: {
                    let raw = r.read_u8()?;
                    GrabMode::from_u8(raw).ok_or(ParseError::Value(raw as u32))?
                },
                keyboard_mode: {
                    let raw = r.read_u8()?;
                    GrabMode::from_u8(raw).ok_or(ParseError::Value(raw as u32))?
                },
            },
            input::UNGRAB_KEY => Request::UngrabKey {
                key: data,
                grab_window: r.read_u32()?,
                modifiers: r.read_u16()?,
            },
            input::ALLOW_EVENTS => Request::AllowEvents {
                mode: AllowEventsMode::from_u8(data).ok_or(ParseError::Value(data as u32))?,
                time: r.read_u32()?,
            },
            input::GRAB_SERVER => Request::GrabServer,
            input::UNGRAB_SERVER => Request::UngrabServer,
            input::QUERY_POINTER => Request::QueryPointer {
                window: r.read_u32()?,
            },
            input::GET_MOTION_EVENTS => Request::GetMotionEvents {
                window: r.read_u32()?,
                start: r.read_u32()?,
                stop: r.read_u32()?,
            },
            input::TRANSLATE_COORDINATES => Request::TranslateCoordinates {
                src_window: r.read_u32()?,
                dst_window: r.read_u32()?,
                src_x: r.read_i16()?,
                src_y: r.read_i16()?,
            },
            input::WARP_POINTER => Request::WarpPointer {
                src_window: r.read_u32()?,
                dst_window: r.read_u32()?,
                src_x: r.read_i16()?,
                src_y: r.read_i16()?,
                src_width: r.read_u16()?,
                src_height: r.read_u16()?,
                dst_x: r.read_i16()?,
                dst_y: r.read_i16()?,
            },
            input::SET_INPUT_FOCUS => Request::SetInputFocus {
                revert_to: RevertTo::from_u8(data).ok_or(ParseError::Value(data as u32))?,
                focus: r.read_u32()?,
                time: r.read_u32()?,
            },
            input::GET_INPUT_FOCUS => Request::GetInputFocus,
            input::QUERY_KEYMAP => Request::QueryKeymap,

            text::OPEN_FONT => {
                let fid = r.read_u32()?;
                let name_len = r.read_u16()? as usize;
                r.skip(2)?;
                let name = r.read_string(name_len)?;
                Request::OpenFont { fid, name }
            }
            text::CLOSE_FONT => Request::CloseFont {
                font: r.read_u32()?,
            },
            text::QUERY_FONT => Request::QueryFont {
                font: r.read_u32()?,
            },
            text::QUERY_TEXT_EXTENTS => {
                let font = r.read_u32()?;
                let mut units = r.remaining() / 2;
                if data != 0 && units > 0 {
                    // odd-length: the last CHAR2B is padding
                    units -= 1;
                }
                let mut string = Vec::with_capacity(units);
                for _ in 0..units {
                    let hi = r.read_u8()?;
                    let lo = r.read_u8()?;
                    string.push(((hi as u16) << 8) | lo as u16);
                }
                Request::QueryTextExtents { font, string }
            }
            text::LIST_FONTS | text::LIST_FONTS_WITH_INFO => {
                let max_names = r.read_u16()?;
                let pattern_len = r.read_u16()? as usize;
                let pattern = r.read_string(pattern_len)?;
                if opcode == text::LIST_FONTS {
                    Request::ListFonts { max_names, pattern }
                } else {
                    Request::ListFontsWithInfo { max_names, pattern }
                }
            }
            text::SET_FONT_PATH => {
                let count = r.read_u16()? as usize;
                r.skip(2)?;
                let mut paths = Vec::with_capacity(count);
                for _ in 0..count {
                    let len = r.read_u8()? as usize;
                    paths.push(r.read_string(len)?);
                }
                Request::SetFontPath { paths }
            }
            text::GET_FONT_PATH => Request::GetFontPath,
            text::POLY_TEXT8 => {
                let drawable = r.read_u32()?;
                let gc = r.read_u32()?;
                let x = r.read_i16()?;
                let y = r.read_i16()?;
                Request::PolyText8 {
                    drawable,
                    gc,
                    x,
                    y,
                    items: parse_text_items8(&mut r)?,
                }
            }
            text::POLY_TEXT16 => {
                let drawable = r.read_u32()?;
                let gc = r.read_u32()?;
                let x = r.read_i16()?;
                let y = r.read_i16()?;
                Request::PolyText16 {
                    drawable,
                    gc,
                    x,
                    y,
                    items: parse_text_items16(&mut r)?,
                }
            }
            text::IMAGE_TEXT8 => {
                let len = data as usize;
                let drawable = r.read_u32()?;
                let gc = r.read_u32()?;
                let x = r.read_i16()?;
                let y = r.read_i16()?;
                Request::ImageText8 {
                    drawable,
                    gc,
                    x,
                    y,
                    string: r.read_bytes(len)?.to_vec(),
                }
            }
            text::IMAGE_TEXT16 => {
                let len = data as usize;
                let drawable = r.read_u32()?;
                let gc = r.read_u32()?;
                let x = r.read_i16()?;
                let y = r.read_i16()?;
                let mut string = Vec::with_capacity(len);
                for _ in 0..len {
                    let hi = r.read_u8()?;
                    let lo = r.read_u8()?;
                    string.push(((hi as u16) << 8) | lo as u16);
                }
                Request::ImageText16 {
                    drawable,
                    gc,
                    x,
                    y,
                    string,
                }
            }

            graphics::CREATE_PIXMAP => Request::CreatePixmap {
                depth: data,
                pid: r.read_u32()?,
                drawable: r.read_u32()?,
                width: r.read_u16()?,
                height: r.read_u16()?,
            },
            graphics::FREE_PIXMAP => Request::FreePixmap {
                pixmap: r.read_u32()?,
            },
            graphics::CREATE_GC => Request::CreateGc {
                cid: r.read_u32()?,
                drawable: r.read_u32()?,
                values: GcValues::parse(&mut r)?,
            },
            graphics::CHANGE_GC => Request::ChangeGc {
                gc: r.read_u32()?,
                values: GcValues::parse(&mut r)?,
            },
            graphics::COPY_GC => Request::CopyGc {
                src_gc: r.read_u32()?,
                dst_gc: r.read_u32()?,
                value_mask: r.read_u32()?,
            },
            graphics::SET_DASHES => {
                let gc = r.read_u32()?;
                let dash_offset = r.read_u16()?;
                let count = r.read_u16()? as usize;
                Request::SetDashes {
                    gc,
                    dash_offset,
                    dashes: r.read_bytes(count)?.to_vec(),
                }
            }
            graphics::SET_CLIP_RECTANGLES => Request::SetClipRectangles {
                ordering: data,
                gc: r.read_u32()?,
                clip_x_origin: r.read_i16()?,
                clip_y_origin: r.read_i16()?,
                rectangles: parse_rectangles(&mut r)?,
            },
            graphics::FREE_GC => Request::FreeGc {
                gc: r.read_u32()?,
            },
            graphics::CLEAR_AREA => Request::ClearArea {
                exposures: data != 0,
                window: r.read_u32()?,
                x: r.read_i16()?,
                y: r.read_i16()?,
                width: r.read_u16()?,
                height: r.read_u16()?,
            },
            graphics::COPY_AREA => Request::CopyArea {
                src_drawable: r.read_u32()?,
                dst_drawable: r.read_u32()?,
                gc: r.read_u32()?,
                src_x: r.read_i16()?,
                src_y: r.read_i16()?,
                dst_x: r.read_i16()?,
                dst_y: r.read_i16()?,
                width: r.read_u16()?,
                height: r.read_u16()?,
            },
            graphics::COPY_PLANE => Request::CopyPlane {
                src_drawable: r.read_u32()?,
                dst_drawable: r.read_u32()?,
                gc: r.read_u32()?,
                src_x: r.read_i16()?,
                src_y: r.read_i16()?,
                dst_x: r.read_i16()?,
                dst_y: r.read_i16()?,
                width: r.read_u16()?,
                height: r.read_u16()?,
                bit_plane: r.read_u32()?,
            },
            graphics::POLY_POINT | graphics::POLY_LINE => {
                let drawable = r.read_u32()?;
                let gc = r.read_u32()?;
                let points = parse_points(&mut r)?;
                if opcode == graphics::POLY_POINT {
                    Request::PolyPoint {
                        relative: data != 0,
                        drawable,
                        gc,
                        points,
                    }
                } else {
                    Request::PolyLine {
                        relative: data != 0,
                        drawable,
                        gc,
                        points,
                    }
                }
            }
            graphics::POLY_SEGMENT => {
                let drawable = r.read_u32()?;
                let gc = r.read_u32()?;
                let mut segments = Vec::with_capacity(r.remaining() / 8);
                while r.remaining() >= 8 {
                    segments.push(Segment {
                        x1: r.read_i16()?,
                        y1: r.read_i16()?,
                        x2: r.read_i16()?,
                        y2: r.read_i16()?,
                    });
                }
                Request::PolySegment {
                    drawable,
                    gc,
                    segments,
                }
            }
            graphics::POLY_RECTANGLE | graphics::POLY_FILL_RECTANGLE => {
                let drawable = r.read_u32()?;
                let gc = r.read_u32()?;
                let rectangles = parse_rectangles(&mut r)?;
                if opcode == graphics::POLY_RECTANGLE {
                    Request::PolyRectangle {
                        drawable,
                        gc,
                        rectangles,
                    }
                } else {
                    Request::PolyFillRectangle {
                        drawable,
                        gc,
                        rectangles,
                    }
                }
            }
            graphics::POLY_ARC | graphics::POLY_FILL_ARC => {
                let drawable = r.read_u32()?;
                let gc = r.read_u32()?;
                let mut arcs = Vec::with_capacity(r.remaining() / 12);
                while r.remaining() >= 12 {
                    arcs.push(Arc {
                        x: r.read_i16()?,
                        y: r.read_i16()?,
                        width: r.read_u16()?,
                        height: r.read_u16()?,
                        angle1: r.read_i16()?,
                        angle2: r.read_i16()?,
                    });
                }
                if opcode == graphics::POLY_ARC {
                    Request::PolyArc { drawable, gc, arcs }
                } else {
                    Request::PolyFillArc { drawable, gc, arcs }
                }
            }
            graphics::FILL_POLY => {
                let drawable = r.read_u32()?;
                let gc = r.read_u32()?;
                let shape = r.read_u8()?;
                let relative = r.read_u8()? != 0;
                r.skip(2)?;
                Request::FillPoly {
                    drawable,
                    gc,
                    shape,
                    relative,
                    points: parse_points(&mut r)?,
                }
            }
            graphics::PUT_IMAGE => {
                let drawable = r.read_u32()?;
                let gc = r.read_u32()?;
                let width = r.read_u16()?;
                let height = r.read_u16()?;
                let dst_x = r.read_i16()?;
                let dst_y = r.read_i16()?;
                let left_pad = r.read_u8()?;
                let depth = r.read_u8()?;
                r.skip(2)?;
                Request::PutImage {
                    format: data,
                    drawable,
                    gc,
                    width,
                    height,
                    dst_x,
                    dst_y,
                    left_pad,
                    depth,
                    data: r.read_bytes(r.remaining())?.to_vec(),
                }
            }
            graphics::GET_IMAGE => Request::GetImage {
                format: data,
                drawable: r.read_u32()?,
                x: r.read_i16()?,
                y: r.read_i16()?,
                width: r.read_u16()?,
                height: r.read_u16()?,
                plane_mask: r.read_u32()?,
            },

            color::CREATE_COLORMAP => Request::CreateColormap {
                alloc_all: data != 0,
                mid: r.read_u32()?,
                window: r.read_u32()?,
                visual: r.read_u32()?,
            },
            color::FREE_COLORMAP => Request::FreeColormap {
                cmap: r.read_u32()?,
            },
            color::COPY_COLORMAP_AND_FREE => Request::CopyColormapAndFree {
                mid: r.read_u32()?,
                src_cmap: r.read_u32()?,
            },
            color::INSTALL_COLORMAP => Request::InstallColormap {
                cmap: r.read_u32()?,
            },
            color::UNINSTALL_COLORMAP => Request::UninstallColormap {
                cmap: r.read_u32()?,
            },
            color::LIST_INSTALLED_COLORMAPS => Request::ListInstalledColormaps {
                window: r.read_u32()?,
            },
            color::ALLOC_COLOR => Request::AllocColor {
                cmap: r.read_u32()?,
                red: r.read_u16()?,
                green: r.read_u16()?,
                blue: r.read_u16()?,
            },
            color::ALLOC_NAMED_COLOR => {
                let cmap = r.read_u32()?;
                let name_len = r.read_u16()? as usize;
                r.skip(2)?;
                Request::AllocNamedColor {
                    cmap,
                    name: r.read_string(name_len)?,
                }
            }
            color::ALLOC_COLOR_CELLS => Request::AllocColorCells {
                contiguous: data != 0,
                cmap: r.read_u32()?,
                colors: r.read_u16()?,
                planes: r.read_u16()?,
            },
            color::ALLOC_COLOR_PLANES => Request::AllocColorPlanes {
                contiguous: data != 0,
                cmap: r.read_u32()?,
                colors: r.read_u16()?,
                reds: r.read_u16()?,
                greens: r.read_u16()?,
                blues: r.read_u16()?,
            },
            color::FREE_COLORS => {
                let cmap = r.read_u32()?;
                let plane_mask = r.read_u32()?;
                let mut pixels = Vec::with_capacity(r.remaining() / 4);
                while r.remaining() >= 4 {
                    pixels.push(r.read_u32()?);
                }
                Request::FreeColors {
                    cmap,
                    plane_mask,
                    pixels,
                }
            }
            color::STORE_COLORS => {
                let cmap = r.read_u32()?;
                let mut items = Vec::with_capacity(r.remaining() / 12);
                while r.remaining() >= 12 {
                    let pixel = r.read_u32()?;
                    let red = r.read_u16()?;
                    let green = r.read_u16()?;
                    let blue = r.read_u16()?;
                    let flags = r.read_u8()?;
                    r.skip(1)?;
                    items.push(ColorItem {
                        pixel,
                        red,
                        green,
                        blue,
                        flags,
                    });
                }
                Request::StoreColors { cmap, items }
            }
            color::STORE_NAMED_COLOR => {
                let cmap = r.read_u32()?;
                let pixel = r.read_u32()?;
                let name_len = r.read_u16()? as usize;
                r.skip(2)?;
                Request::StoreNamedColor {
                    flags: data,
                    cmap,
                    pixel,
                    name: r.read_string(name_len)?,
                }
            }
            color::QUERY_COLORS => {
                let cmap = r.read_u32()?;
                let mut pixels = Vec::with_capacity(r.remaining() / 4);
                while r.remaining() >= 4 {
                    pixels.push(r.read_u32()?);
                }
                Request::QueryColors { cmap, pixels }
            }
            color::LOOKUP_COLOR => {
                let cmap = r.read_u32()?;
                let name_len = r.read_u16()? as usize;
                r.skip(2)?;
                Request::LookupColor {
                    cmap,
                    name: r.read_string(name_len)?,
                }
            }

            cursor::CREATE_CURSOR => Request::CreateCursor {
                cid: r.read_u32()?,
                source: r.read_u32()?,
                mask: r.read_u32()?,
                fore_red: r.read_u16()?,
                fore_green: r.read_u16()?,
                fore_blue: r.read_u16()?,
                back_red: r.read_u16()?,
                back_green: r.read_u16()?,
                back_blue: r.read_u16()?,
                x: r.read_u16()?,
                y: r.read_u16()?,
            },
            cursor::CREATE_GLYPH_CURSOR => Request::CreateGlyphCursor {
                cid: r.read_u32()?,
                source_font: r.read_u32()?,
                mask_font: r.read_u32()?,
                source_char: r.read_u16()?,
                mask_char: r.read_u16()?,
                fore_red: r.read_u16()?,
                fore_green: r.read_u16()?,
                fore_blue: r.read_u16()?,
                back_red: r.read_u16()?,
                back_green: r.read_u16()?,
                back_blue: r.read_u16()?,
            },
            cursor::FREE_CURSOR => Request::FreeCursor {
                cursor: r.read_u32()?,
            },
            cursor::RECOLOR_CURSOR => Request::RecolorCursor {
                cursor: r.read_u32()?,
                fore_red: r.read_u16()?,
                fore_green: r.read_u16()?,
                fore_blue: r.read_u16()?,
                back_red: r.read_u16()?,
                back_green: r.read_u16()?,
                back_blue: r.read_u16()?,
            },

            misc::QUERY_BEST_SIZE => Request::QueryBestSize {
                class: data,
                drawable: r.read_u32()?,
                width: r.read_u16()?,
                height: r.read_u16()?,
            },
            misc::QUERY_EXTENSION => {
                let name_len = r.read_u16()? as usize;
                r.skip(2)?;
                Request::QueryExtension {
                    name: r.read_string(name_len)?,
                }
            }
            misc::LIST_EXTENSIONS => Request::ListExtensions,
            misc::CHANGE_KEYBOARD_MAPPING => {
                let first_keycode = r.read_u8()?;
                let keysyms_per_keycode = r.read_u8()?;
                r.skip(2)?;
                let count = data as usize * keysyms_per_keycode as usize;
                let mut keysyms = Vec::with_capacity(count);
                for _ in 0..count {
                    keysyms.push(r.read_u32()?);
                }
                Request::ChangeKeyboardMapping {
                    first_keycode,
                    keysyms_per_keycode,
                    keysyms,
                }
            }
            misc::GET_KEYBOARD_MAPPING => Request::GetKeyboardMapping {
                first_keycode: r.read_u8()?,
                count: r.read_u8()?,
            },
            misc::CHANGE_KEYBOARD_CONTROL => Request::ChangeKeyboardControl {
                values: KeyboardControlValues::parse(&mut r)?,
            },
            misc::GET_KEYBOARD_CONTROL => Request::GetKeyboardControl,
            misc::BELL => Request::Bell {
                percent: data as i8,
            },
            misc::CHANGE_POINTER_CONTROL => Request::ChangePointerControl {
                acceleration_numerator: r.read_i16()?,
                acceleration_denominator: r.read_i16()?,
                threshold: r.read_i16()?,
                do_acceleration: r.read_u8()? != 0,
                do_threshold: r.read_u8()? != 0,
            },
            misc::GET_POINTER_CONTROL => Request::GetPointerControl,
            misc::SET_SCREEN_SAVER => Request::SetScreenSaver {
                timeout: r.read_i16()?,
                interval: r.read_i16()?,
                prefer_blanking: r.read_u8()?,
                allow_exposures: r.read_u8()?,
            },
            misc::GET_SCREEN_SAVER => Request::GetScreenSaver,
            misc::CHANGE_HOSTS => {
                let family = r.read_u8()?;
                r.skip(1)?;
                let addr_len = r.read_u16()? as usize;
                Request::ChangeHosts {
                    insert: data == 0,
                    family,
                    address: r.read_bytes(addr_len)?.to_vec(),
                }
            }
            misc::LIST_HOSTS => Request::ListHosts,
            misc::SET_ACCESS_CONTROL => Request::SetAccessControl { enabled: data != 0 },
            misc::SET_CLOSE_DOWN_MODE => Request::SetCloseDownMode {
                mode: CloseDownMode::from_u8(data).ok_or(ParseError::Value(data as u32))?,
            },
            misc::KILL_CLIENT => Request::KillClient {
                resource: r.read_u32()?,
            },
            misc::FORCE_SCREEN_SAVER => Request::ForceScreenSaver { activate: data != 0 },
            misc::SET_POINTER_MAPPING => Request::SetPointerMapping {
                map: r.read_bytes(data as usize)?.to_vec(),
            },
            misc::GET_POINTER_MAPPING => Request::GetPointerMapping,
            misc::SET_MODIFIER_MAPPING => Request::SetModifierMapping {
                keycodes_per_modifier: data,
                keycodes: r.read_bytes(8 * data as usize)?.to_vec(),
            },
            misc::GET_MODIFIER_MAPPING => Request::GetModifierMapping,
            misc::NO_OPERATION => Request::NoOperation,

            extension::BIG_REQUESTS => Request::BigReqEnable,
            extension::XINPUT => Request::XInput(xinput::parse_request(data, &mut r)?),

            _ => Request::Unknown { opcode },
        };
        Ok(req)
    }

    /// The major opcode this request arrived under, for error records.
    pub fn major_opcode(&self) -> u8 {
        use opcodes::*;
        match self {
            Request::CreateWindow { .. } => window::CREATE_WINDOW,
            Request::ChangeWindowAttributes { .. } => window::CHANGE_WINDOW_ATTRIBUTES,
            Request::GetWindowAttributes { .. } => window::GET_WINDOW_ATTRIBUTES,
            Request::DestroyWindow { .. } => window::DESTROY_WINDOW,
            Request::DestroySubwindows { .. } => window::DESTROY_SUBWINDOWS,
            Request::ChangeSaveSet { .. } => window::CHANGE_SAVE_SET,
            Request::ReparentWindow { .. } => window::REPARENT_WINDOW,
            Request::MapWindow { .. } => window::MAP_WINDOW,
            Request::MapSubwindows { .. } => window::MAP_SUBWINDOWS,
            Request::UnmapWindow { .. } => window::UNMAP_WINDOW,
            Request::UnmapSubwindows { .. } => window::UNMAP_SUBWINDOWS,
            Request::ConfigureWindow { .. } => window::CONFIGURE_WINDOW,
            Request::CirculateWindow { .. } => window::CIRCULATE_WINDOW,
            Request::GetGeometry { .. } => window::GET_GEOMETRY,
            Request::QueryTree { .. } => window::QUERY_TREE,
            Request::InternAtom { .. } => property::INTERN_ATOM,
            Request::GetAtomName { .. } => property::GET_ATOM_NAME,
            Request::ChangeProperty { .. } => property::CHANGE_PROPERTY,
            Request::DeleteProperty { .. } => property::DELETE_PROPERTY,
            Request::GetProperty { .. } => property::GET_PROPERTY,
            Request::ListProperties { .. } => property::LIST_PROPERTIES,
            Request::RotateProperties { .. } => property::ROTATE_PROPERTIES,
            Request::SetSelectionOwner { .. } => property::SET_SELECTION_OWNER,
            Request::GetSelectionOwner { .. } => property::GET_SELECTION_OWNER,
            Request::ConvertSelection { .. } => property::CONVERT_SELECTION,
            Request::SendEvent { .. } => property::SEND_EVENT,
            Request::GrabPointer { .. } => input::GRAB_POINTER,
            Request::UngrabPointer { .. } => input::UNGRAB_POINTER,
            Request::GrabButton { .. } => input::GRAB_BUTTON,
            Request::UngrabButton { .. } => input::UNGRAB_BUTTON,
            Request::ChangeActivePointerGrab { .. } => input::CHANGE_ACTIVE_POINTER_GRAB,
            Request::GrabKeyboard { .. } => input::GRAB_KEYBOARD,
            Request::UngrabKeyboard { .. } => input::UNGRAB_KEYBOARD,
            Request::GrabKey { .. } => input::GRAB_KEY,
            Request::UngrabKey { .. } => input::UNGRAB_KEY,
            Request::AllowEvents { .. } => input::ALLOW_EVENTS,
            Request::GrabServer => input::GRAB_SERVER,
            Request::UngrabServer => input::UNGRAB_SERVER,
            Request::QueryPointer { .. } => input::QUERY_POINTER,
            Request::GetMotionEvents { .. } => input::GET_MOTION_EVENTS,
            Request::TranslateCoordinates { .. } => input::TRANSLATE_COORDINATES,
            Request::WarpPointer { .. } => input::WARP_POINTER,
            Request::SetInputFocus { .. } => input::SET_INPUT_FOCUS,
            Request::GetInputFocus => input::GET_INPUT_FOCUS,
            Request::QueryKeymap => input::QUERY_KEYMAP,
            Request::OpenFont { .. } => text::OPEN_FONT,
            Request::CloseFont { .. } => text::CLOSE_FONT,
            Request::QueryFont { .. } => text::QUERY_FONT,
            Request::QueryTextExtents { .. } => text::QUERY_TEXT_EXTENTS,
            Request::ListFonts { .. } => text::LIST_FONTS,
            Request::ListFontsWithInfo { .. } => text::LIST_FONTS_WITH_INFO,
            Request::SetFontPath { .. } => text::SET_FONT_PATH,
            Request::GetFontPath => text::GET_FONT_PATH,
            Request::PolyText8 { .. } => text::POLY_TEXT8,
            Request::PolyText16 { .. } => text::POLY_TEXT16,
            Request::ImageText8 { .. } => text::IMAGE_TEXT8,
            Request::ImageText16 { .. } => text::IMAGE_TEXT16,
            Request::CreatePixmap { .. } => graphics::CREATE_PIXMAP,
            Request::FreePixmap { .. } => graphics::FREE_PIXMAP,
            Request::CreateGc { .. } => graphics::CREATE_GC,
            Request::ChangeGc { .. } => graphics::CHANGE_GC,
            Request::CopyGc { .. } => graphics::COPY_GC,
            Request::SetDashes { .. } => graphics::SET_DASHES,
            Request::SetClipRectangles { .. } => graphics::SET_CLIP_RECTANGLES,
            Request::FreeGc { .. } => graphics::FREE_GC,
            Request::ClearArea { .. } => graphics::CLEAR_AREA,
            Request::CopyArea { .. } => graphics::COPY_AREA,
            Request::CopyPlane { .. } => graphics::COPY_PLANE,
            Request::PolyPoint { .. } => graphics::POLY_POINT,
            Request::PolyLine { .. } => graphics::POLY_LINE,
            Request::PolySegment { .. } => graphics::POLY_SEGMENT,
            Request::PolyRectangle { .. } => graphics::POLY_RECTANGLE,
            Request::PolyArc { .. } => graphics::POLY_ARC,
            Request::FillPoly { .. } => graphics::FILL_POLY,
            Request::PolyFillRectangle { .. } => graphics::POLY_FILL_RECTANGLE,
            Request::PolyFillArc { .. } => graphics::POLY_FILL_ARC,
            Request::PutImage { .. } => graphics::PUT_IMAGE,
            Request::GetImage { .. } => graphics::GET_IMAGE,
            Request::CreateColormap { .. } => color::CREATE_COLORMAP,
            Request::FreeColormap { .. } => color::FREE_COLORMAP,
            Request::CopyColormapAndFree { .. } => color::COPY_COLORMAP_AND_FREE,
            Request::InstallColormap { .. } => color::INSTALL_COLORMAP,
            Request::UninstallColormap { .. } => color::UNINSTALL_COLORMAP,
            Request::ListInstalledColormaps { .. } => color::LIST_INSTALLED_COLORMAPS,
            Request::AllocColor { .. } => color::ALLOC_COLOR,
            Request::AllocNamedColor { .. } => color::ALLOC_NAMED_COLOR,
            Request::AllocColorCells { .. } => color::ALLOC_COLOR_CELLS,
            Request::AllocColorPlanes { .. } => color::ALLOC_COLOR_PLANES,
            Request::FreeColors { .. } => color::FREE_COLORS,
            Request::StoreColors { .. } => color::STORE_COLORS,
            Request::StoreNamedColor { .. } => color::STORE_NAMED_COLOR,
            Request::QueryColors { .. } => color::QUERY_COLORS,
            Request::LookupColor { .. } => color::LOOKUP_COLOR,
            Request::CreateCursor { .. } => cursor::CREATE_CURSOR,
            Request::CreateGlyphCursor { .. } => cursor::CREATE_GLYPH_CURSOR,
            Request::FreeCursor { .. } => cursor::FREE_CURSOR,
            Request::RecolorCursor { .. } => cursor::RECOLOR_CURSOR,
            Request::QueryBestSize { .. } => misc::QUERY_BEST_SIZE,
            Request::QueryExtension { .. } => misc::QUERY_EXTENSION,
            Request::ListExtensions => misc::LIST_EXTENSIONS,
            Request::ChangeKeyboardMapping { .. } => misc::CHANGE_KEYBOARD_MAPPING,
            Request::GetKeyboardMapping { .. } => misc::GET_KEYBOARD_MAPPING,
            Request::ChangeKeyboardControl { .. } => misc::CHANGE_KEYBOARD_CONTROL,
            Request::GetKeyboardControl => misc::GET_KEYBOARD_CONTROL,
            Request::Bell { .. } => misc::BELL,
            Request::ChangePointerControl { .. } => misc::CHANGE_POINTER_CONTROL,
            Request::GetPointerControl => misc::GET_POINTER_CONTROL,
            Request::SetScreenSaver { .. } => misc::SET_SCREEN_SAVER,
            Request::GetScreenSaver => misc::GET_SCREEN_SAVER,
            Request::ChangeHosts { .. } => misc::CHANGE_HOSTS,
            Request::ListHosts => misc::LIST_HOSTS,
            Request::SetAccessControl { .. } => misc::SET_ACCESS_CONTROL,
            Request::SetCloseDownMode { .. } => misc::SET_CLOSE_DOWN_MODE,
            Request::KillClient { .. } => misc::KILL_CLIENT,
            Request::ForceScreenSaver { .. } => misc::FORCE_SCREEN_SAVER,
            Request::SetPointerMapping { .. } => misc::SET_POINTER_MAPPING,
            Request::GetPointerMapping => misc::GET_POINTER_MAPPING,
            Request::SetModifierMapping { .. } => misc::SET_MODIFIER_MAPPING,
            Request::GetModifierMapping => misc::GET_MODIFIER_MAPPING,
            Request::NoOperation => misc::NO_OPERATION,
            Request::BigReqEnable => extension::BIG_REQUESTS,
            Request::XInput(_) => extension::XINPUT,
            Request::Unknown { opcode } => *opcode,
        }
    }

    /// The minor opcode, nonzero only for extension requests.
    pub fn minor_opcode(&self) -> u16 {
        match self {
            Request::XInput(req) => req.minor_opcode() as u16,
            _ => 0,
        }
    }
}

fn parse_points(r: &mut ByteOrderReader<'_>) -> Result<Vec<Point>, ParseError> {
    let mut points = Vec::with_capacity(r.remaining() / 4);
    while r.remaining() >= 4 {
        points.push(Point {
            x: r.read_i16()?,
            y: r.read_i16()?,
        });
    }
    Ok(points)
}

fn parse_rectangles(r: &mut ByteOrderReader<'_>) -> Result<Vec<Rectangle>, ParseError> {
    let mut rectangles = Vec::with_capacity(r.remaining() / 8);
    while r.remaining() >= 8 {
        rectangles.push(Rectangle {
            x: r.read_i16()?,
            y: r.read_i16()?,
            width: r.read_u16()?,
            height: r.read_u16()?,
        });
    }
    Ok(rectangles)
}

// PolyText items: a length byte then either a glyph run (delta + glyphs)
// or, for length 255, a font switch whose 4 bytes are always MSB first.
fn parse_text_items8(r: &mut ByteOrderReader<'_>) -> Result<Vec<TextItem<u8>>, ParseError> {
    let mut items = Vec::new();
    while r.remaining() >= 2 {
        let len = r.read_u8()?;
        if len == 255 {
            let b = r.read_bytes(4)?;
            items.push(TextItem::Font(u32::from_be_bytes([b[0], b[1], b[2], b[3]])));
        } else {
            let delta = r.read_i8()?;
            if r.remaining() < len as usize {
                break;
            }
            items.push(TextItem::Glyphs {
                delta,
                glyphs: r.read_bytes(len as usize)?.to_vec(),
            });
        }
    }
    Ok(items)
}

fn parse_text_items16(r: &mut ByteOrderReader<'_>) -> Result<Vec<TextItem<u16>>, ParseError> {
    let mut items = Vec::new();
    while r.remaining() >= 2 {
        let len = r.read_u8()?;
        if len == 255 {
            let b = r.read_bytes(4)?;
            items.push(TextItem::Font(u32::from_be_bytes([b[0], b[1], b[2], b[3]])));
        } else {
            let delta = r.read_i8()?;
            if r.remaining() < 2 * len as usize {
                break;
            }
            let mut glyphs = Vec::with_capacity(len as usize);
            for _ in 0..len {
                let hi = r.read_u8()?;
                let lo = r.read_u8()?;
                glyphs.push(((hi as u16) << 8) | lo as u16);
            }
            items.push(TextItem::Glyphs { delta, glyphs });
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_operation() {
        let req = Request::parse(127, 0, &[], ByteOrder::LittleEndian).unwrap();
        assert_eq!(req, Request::NoOperation);
    }

    #[test]
    fn test_parse_intern_atom() {
        let mut body = Vec::new();
        body.extend_from_slice(&12u16.to_le_bytes());
        body.extend_from_slice(&[0, 0]);
        body.extend_from_slice(b"_NET_WM_NAME");
        let req = Request::parse(16, 0, &body, ByteOrder::LittleEndian).unwrap();
        assert_eq!(
            req,
            Request::InternAtom {
                only_if_exists: false,
                name: "_NET_WM_NAME".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_intern_atom_big_endian() {
        let mut body = Vec::new();
        body.extend_from_slice(&3u16.to_be_bytes());
        body.extend_from_slice(&[0, 0]);
        body.extend_from_slice(b"FOO\0");
        let req = Request::parse(16, 1, &body, ByteOrder::BigEndian).unwrap();
        assert_eq!(
            req,
            Request::InternAtom {
                only_if_exists: true,
                name: "FOO".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_create_window_with_event_mask() {
        let mut body = Vec::new();
        body.extend_from_slice(&0x0020_0001u32.to_le_bytes()); // wid
        body.extend_from_slice(&0u32.to_le_bytes()); // parent = root
        body.extend_from_slice(&10i16.to_le_bytes());
        body.extend_from_slice(&20i16.to_le_bytes());
        body.extend_from_slice(&100u16.to_le_bytes());
        body.extend_from_slice(&100u16.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes()); // border
        body.extend_from_slice(&1u16.to_le_bytes()); // InputOutput
        body.extend_from_slice(&ROOT_VISUAL.to_le_bytes());
        body.extend_from_slice(&0x0800u32.to_le_bytes()); // event-mask bit
        body.extend_from_slice(&0x0000_8001u32.to_le_bytes()); // KeyPress | Exposure

        let req = Request::parse(1, 24, &body, ByteOrder::LittleEndian).unwrap();
        match req {
            Request::CreateWindow {
                depth,
                wid,
                parent,
                class,
                attrs,
                ..
            } => {
                assert_eq!(depth, 24);
                assert_eq!(wid, 0x0020_0001);
                assert_eq!(parent, ROOT_WINDOW);
                assert_eq!(class, WindowClass::InputOutput);
                assert_eq!(
                    attrs.event_mask,
                    Some(EventMask::KEY_PRESS | EventMask::EXPOSURE)
                );
            }
            other => panic!("expected CreateWindow, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_change_property() {
        let mut body = Vec::new();
        body.extend_from_slice(&0x0020_0001u32.to_le_bytes());
        body.extend_from_slice(&39u32.to_le_bytes()); // WM_NAME
        body.extend_from_slice(&31u32.to_le_bytes()); // STRING
        body.push(8);
        body.extend_from_slice(&[0, 0, 0]);
        body.extend_from_slice(&2u32.to_le_bytes());
        body.extend_from_slice(b"hi\0\0");
        let req = Request::parse(18, 0, &body, ByteOrder::LittleEndian).unwrap();
        assert_eq!(
            req,
            Request::ChangeProperty {
                mode: PropertyMode::Replace,
                window: 0x0020_0001,
                property: 39,
                property_type: 31,
                format: 8,
                data: b"hi".to_vec(),
            }
        );
    }

    #[test]
    fn test_parse_change_property_rejects_bad_format() {
        let mut body = Vec::new();
        body.extend_from_slice(&1u32.to_le_bytes());
        body.extend_from_slice(&39u32.to_le_bytes());
        body.extend_from_slice(&31u32.to_le_bytes());
        body.push(24); // not 8/16/32
        body.extend_from_slice(&[0, 0, 0]);
        body.extend_from_slice(&0u32.to_le_bytes());
        let err = Request::parse(18, 0, &body, ByteOrder::LittleEndian).unwrap_err();
        assert_eq!(err, ParseError::Value(24));
    }

    #[test]
    fn test_parse_truncated_body_is_short_read() {
        let body = [0u8; 2];
        let err = Request::parse(8, 0, &body, ByteOrder::LittleEndian).unwrap_err();
        assert!(matches!(err, ParseError::Short(_)));
    }

    #[test]
    fn test_parse_grab_button_any_modifier() {
        let mut body = Vec::new();
        body.extend_from_slice(&0x0020_0001u32.to_le_bytes());
        body.extend_from_slice(&0x0004u16.to_le_bytes()); // ButtonPress
        body.push(1); // async
        body.push(1); // async
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.push(3); // button 3
        body.push(0);
        body.extend_from_slice(&ANY_MODIFIER.to_le_bytes());
        let req = Request::parse(28, 1, &body, ByteOrder::LittleEndian).unwrap();
        match req {
            Request::GrabButton {
                owner_events,
                button,
                modifiers,
                ..
            } => {
                assert!(owner_events);
                assert_eq!(button, 3);
                assert_eq!(modifiers, ANY_MODIFIER);
            }
            other => panic!("expected GrabButton, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_poly_text8_with_font_shift() {
        let mut body = Vec::new();
        body.extend_from_slice(&0x0020_0001u32.to_le_bytes());
        body.extend_from_slice(&0x0020_0002u32.to_le_bytes());
        body.extend_from_slice(&5i16.to_le_bytes());
        body.extend_from_slice(&15i16.to_le_bytes());
        // font shift item: 255 then font id MSB first
        body.push(255);
        body.extend_from_slice(&0x0020_0003u32.to_be_bytes());
        // glyph run: len 2, delta 1, "ab"
        body.push(2);
        body.push(1);
        body.extend_from_slice(b"ab");
        let req = Request::parse(74, 0, &body, ByteOrder::LittleEndian).unwrap();
        match req {
            Request::PolyText8 { items, .. } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], TextItem::Font(0x0020_0003));
                assert_eq!(
                    items[1],
                    TextItem::Glyphs {
                        delta: 1,
                        glyphs: b"ab".to_vec()
                    }
                );
            }
            other => panic!("expected PolyText8, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rotate_properties() {
        let mut body = Vec::new();
        body.extend_from_slice(&0x0020_0001u32.to_le_bytes());
        body.extend_from_slice(&3u16.to_le_bytes());
        body.extend_from_slice(&(-1i16).to_le_bytes());
        for atom in [100u32, 101, 102] {
            body.extend_from_slice(&atom.to_le_bytes());
        }
        let req = Request::parse(114, 0, &body, ByteOrder::LittleEndian).unwrap();
        assert_eq!(
            req,
            Request::RotateProperties {
                window: 0x0020_0001,
                delta: -1,
                properties: vec![100, 101, 102],
            }
        );
    }

    #[test]
    fn test_unknown_opcode() {
        let req = Request::parse(200, 0, &[], ByteOrder::LittleEndian).unwrap();
        assert_eq!(req, Request::Unknown { opcode: 200 });
    }

    #[test]
    fn test_request_header_parse() {
        let header = RequestHeader::parse(&[16, 1, 3, 0], ByteOrder::LittleEndian);
        assert_eq!(header.opcode, 16);
        assert_eq!(header.data, 1);
        assert_eq!(header.length, 3);

        let header = RequestHeader::parse(&[16, 1, 0, 3], ByteOrder::BigEndian);
        assert_eq!(header.length, 3);
    }
}
