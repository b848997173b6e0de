//! Graphics contexts
//!
//! A GC is a bag of drawing parameters with protocol-defined defaults.
//! Create/Change carry a value mask selecting which fields to set;
//! CopyGC copies masked fields between two GCs of the same root/depth.

use crate::protocol::requests::GcValues;
use crate::protocol::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GContext {
    pub id: GContextId,
    pub owner: ClientId,
    pub drawable: DrawableId,
    /// GXcopy by default.
    pub function: u8,
    pub plane_mask: u32,
    pub foreground: u32,
    pub background: u32,
    pub line_width: u16,
    pub line_style: u8,
    pub cap_style: u8,
    pub join_style: u8,
    pub fill_style: u8,
    pub fill_rule: u8,
    pub tile: Option<PixmapId>,
    pub stipple: Option<PixmapId>,
    pub tile_stipple_x_origin: i16,
    pub tile_stipple_y_origin: i16,
    pub font: Option<FontId>,
    pub subwindow_mode: u8,
    pub graphics_exposures: bool,
    pub clip_x_origin: i16,
    pub clip_y_origin: i16,
    pub clip_mask: Option<PixmapId>,
    pub clip_rectangles: Option<Vec<Rectangle>>,
    pub dash_offset: u16,
    pub dashes: Vec<u8>,
    /// Pie-slice by default.
    pub arc_mode: u8,
}

impl GContext {
    pub fn new(id: GContextId, owner: ClientId, drawable: DrawableId) -> Self {
        Self {
            id,
            owner,
            drawable,
            function: 3, // copy
            plane_mask: u32::MAX,
            foreground: 0,
            background: 1,
            line_width: 0,
            line_style: 0, // solid
            cap_style: 1,  // butt
            join_style: 0, // miter
            fill_style: 0, // solid
            fill_rule: 0,  // even-odd
            tile: None,
            stipple: None,
            tile_stipple_x_origin: 0,
            tile_stipple_y_origin: 0,
            font: None,
            subwindow_mode: 0, // clip-by-children
            graphics_exposures: true,
            clip_x_origin: 0,
            clip_y_origin: 0,
            clip_mask: None,
            clip_rectangles: None,
            dash_offset: 0,
            dashes: vec![4, 4],
            arc_mode: 1, // pie-slice
        }
    }

    pub fn apply(&mut self, values: &GcValues) {
        if let Some(v) = values.function {
            self.function = v;
        }
        if let Some(v) = values.plane_mask {
            self.plane_mask = v;
        }
        if let Some(v) = values.foreground {
            self.foreground = v;
        }
        if let Some(v) = values.background {
            self.background = v;
        }
        if let Some(v) = values.line_width {
            self.line_width = v;
        }
        if let Some(v) = values.line_style {
            self.line_style = v;
        }
        if let Some(v) = values.cap_style {
            self.cap_style = v;
        }
        if let Some(v) = values.join_style {
            self.join_style = v;
        }
        if let Some(v) = values.fill_style {
            self.fill_style = v;
        }
        if let Some(v) = values.fill_rule {
            self.fill_rule = v;
        }
        if let Some(v) = values.tile {
            self.tile = (v != NONE).then_some(v);
        }
        if let Some(v) = values.stipple {
            self.stipple = (v != NONE).then_some(v);
        }
        if let Some(v) = values.tile_stipple_x_origin {
            self.tile_stipple_x_origin = v;
        }
        if let Some(v) = values.tile_stipple_y_origin {
            self.tile_stipple_y_origin = v;
        }
        if let Some(v) = values.font {
            self.font = (v != NONE).then_some(v);
        }
        if let Some(v) = values.subwindow_mode {
            self.subwindow_mode = v;
        }
        if let Some(v) = values.graphics_exposures {
            self.graphics_exposures = v;
        }
        if let Some(v) = values.clip_x_origin {
            self.clip_x_origin = v;
        }
        if let Some(v) = values.clip_y_origin {
            self.clip_y_origin = v;
        }
        if let Some(v) = values.clip_mask {
            self.clip_mask = (v != NONE).then_some(v);
            self.clip_rectangles = None;
        }
        if let Some(v) = values.dash_offset {
            self.dash_offset = v;
        }
        if let Some(v) = values.dashes {
            self.dashes = vec![v, v];
        }
        if let Some(v) = values.arc_mode {
            self.arc_mode = v;
        }
    }

    /// Copy the masked components from `src`, as CopyGC does.
    pub fn copy_from(&mut self, src: &GContext, value_mask: u32) {
        if value_mask & 0x0000_0001 != 0 {
            self.function = src.function;
        }
        if value_mask & 0x0000_0002 != 0 {
            self.plane_mask = src.plane_mask;
        }
        if value_mask & 0x0000_0004 != 0 {
            self.foreground = src.foreground;
        }
        if value_mask & 0x0000_0008 != 0 {
            self.background = src.background;
        }
        if value_mask & 0x0000_0010 != 0 {
            self.line_width = src.line_width;
        }
        if value_mask & 0x0000_0020 != 0 {
            self.line_style = src.line_style;
        }
        if value_mask & 0x0000_0040 != 0 {
            self.cap_style = src.cap_style;
        }
        if value_mask & 0x0000_0080 != 0 {
            self.join_style = src.join_style;
        }
        if value_mask & 0x0000_0100 != 0 {
            self.fill_style = src.fill_style;
        }
        if value_mask & 0x0000_0200 != 0 {
            self.fill_rule = src.fill_rule;
        }
        if value_mask & 0x0000_0400 != 0 {
            self.tile = src.tile;
        }
        if value_mask & 0x0000_0800 != 0 {
            self.stipple = src.stipple;
        }
        if value_mask & 0x0000_1000 != 0 {
            self.tile_stipple_x_origin = src.tile_stipple_x_origin;
        }
        if value_mask & 0x0000_2000 != 0 {
            self.tile_stipple_y_origin = src.tile_stipple_y_origin;
        }
        if value_mask & 0x0000_4000 != 0 {
            self.font = src.font;
        }
        if value_mask & 0x0000_8000 != 0 {
            self.subwindow_mode = src.subwindow_mode;
        }
        if value_mask & 0x0001_0000 != 0 {
            self.graphics_exposures = src.graphics_exposures;
        }
        if value_mask & 0x0002_0000 != 0 {
            self.clip_x_origin = src.clip_x_origin;
        }
        if value_mask & 0x0004_0000 != 0 {
            self.clip_y_origin = src.clip_y_origin;
        }
        if value_mask & 0x0008_0000 != 0 {
            self.clip_mask = src.clip_mask;
            self.clip_rectangles = src.clip_rectangles.clone();
        }
        if value_mask & 0x0010_0000 != 0 {
            self.dash_offset = src.dash_offset;
        }
        if value_mask & 0x0020_0000 != 0 {
            self.dashes = src.dashes.clone();
        }
        if value_mask & 0x0040_0000 != 0 {
            self.arc_mode = src.arc_mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_defaults() {
        let gc = GContext::new(1, 1, ROOT_WINDOW);
        assert_eq!(gc.function, 3);
        assert_eq!(gc.plane_mask, u32::MAX);
        assert_eq!(gc.foreground, 0);
        assert_eq!(gc.background, 1);
        assert_eq!(gc.line_width, 0);
        assert!(gc.graphics_exposures);
        assert_eq!(gc.arc_mode, 1);
        assert!(gc.tile.is_none());
        assert!(gc.clip_mask.is_none());
    }

    #[test]
    fn test_apply_sets_only_masked_fields() {
        let mut gc = GContext::new(1, 1, ROOT_WINDOW);
        gc.apply(&GcValues {
            foreground: Some(0xff0000),
            line_width: Some(2),
            ..GcValues::default()
        });
        assert_eq!(gc.foreground, 0xff0000);
        assert_eq!(gc.line_width, 2);
        assert_eq!(gc.background, 1);
    }

    #[test]
    fn test_copy_from_respects_mask() {
        let mut src = GContext::new(1, 1, ROOT_WINDOW);
        src.foreground = 7;
        src.background = 9;
        let mut dst = GContext::new(2, 1, ROOT_WINDOW);
        dst.copy_from(&src, 0x0000_0004); // foreground only
        assert_eq!(dst.foreground, 7);
        assert_eq!(dst.background, 1);
    }

    #[test]
    fn test_setting_clip_mask_clears_rectangles() {
        let mut gc = GContext::new(1, 1, ROOT_WINDOW);
        gc.clip_rectangles = Some(vec![Rectangle {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        }]);
        gc.apply(&GcValues {
            clip_mask: Some(0x0020_0009),
            ..GcValues::default()
        });
        assert_eq!(gc.clip_mask, Some(0x0020_0009));
        assert!(gc.clip_rectangles.is_none());
    }
}
