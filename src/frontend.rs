//! Frontend capability surface
//!
//! The server core never touches pixels. Everything visual - drawing,
//! font metrics, cursors, the clipboard, window title chrome - goes
//! through this trait, supplied by the embedding application and kept
//! runtime-swappable so tests can substitute their own.
//!
//! Calls may block on I/O (clipboard, fonts); they are the only
//! suspension points inside request handling besides the socket itself.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::Result;
use crate::protocol::replies::{CharInfo, FontInfo};
use crate::protocol::requests::{KeyboardControlValues, TextItem};
use crate::protocol::types::*;
use crate::resources::{Cursor, GContext, Pixmap};

/// The rendering/IO bundle the server calls into.
///
/// Every method has a no-op default so implementations only carry the
/// capabilities they actually have; the data-bearing defaults return
/// empty results.
#[async_trait]
pub trait Frontend: Send + Sync {
    // Window lifecycle
    async fn create_window(
        &self,
        _window: WindowId,
        _parent: WindowId,
        _rect: Rectangle,
        _border_width: u16,
        _override_redirect: bool,
    ) -> Result<()> {
        Ok(())
    }
    async fn destroy_window(&self, _window: WindowId) -> Result<()> {
        Ok(())
    }
    async fn reparent_window(
        &self,
        _window: WindowId,
        _parent: WindowId,
        _x: i16,
        _y: i16,
    ) -> Result<()> {
        Ok(())
    }
    async fn map_window(&self, _window: WindowId) -> Result<()> {
        Ok(())
    }
    async fn unmap_window(&self, _window: WindowId) -> Result<()> {
        Ok(())
    }
    async fn configure_window(
        &self,
        _window: WindowId,
        _rect: Rectangle,
        _border_width: u16,
    ) -> Result<()> {
        Ok(())
    }
    async fn circulate_window(&self, _window: WindowId, _raised: bool) -> Result<()> {
        Ok(())
    }
    /// Title-carrying property changed (WM_NAME and friends).
    async fn set_window_title(&self, _window: WindowId, _title: &str) -> Result<()> {
        Ok(())
    }

    // Graphics contexts
    async fn create_gc(&self, _gc: &GContext) -> Result<()> {
        Ok(())
    }
    async fn change_gc(&self, _gc: &GContext) -> Result<()> {
        Ok(())
    }
    async fn copy_gc(&self, _src: GContextId, _dst: GContextId, _value_mask: u32) -> Result<()> {
        Ok(())
    }
    async fn free_gc(&self, _gc: GContextId) -> Result<()> {
        Ok(())
    }
    async fn set_dashes(&self, _gc: GContextId, _dash_offset: u16, _dashes: &[u8]) -> Result<()> {
        Ok(())
    }
    async fn set_clip_rectangles(
        &self,
        _gc: GContextId,
        _origin: Point,
        _rectangles: &[Rectangle],
    ) -> Result<()> {
        Ok(())
    }

    // Pixel operations
    async fn put_image(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _format: u8,
        _rect: Rectangle,
        _left_pad: u8,
        _depth: u8,
        _data: &[u8],
    ) -> Result<()> {
        Ok(())
    }
    /// Fetch pixels as ZPixmap rows; the default is an all-zero buffer.
    async fn get_image(
        &self,
        _drawable: DrawableId,
        _format: u8,
        rect: Rectangle,
        _plane_mask: u32,
    ) -> Result<Vec<u8>> {
        Ok(vec![0; rect.width as usize * rect.height as usize * 4])
    }
    #[allow(clippy::too_many_arguments)]
    async fn copy_area(
        &self,
        _src: DrawableId,
        _dst: DrawableId,
        _gc: &GContext,
        _src_x: i16,
        _src_y: i16,
        _dst_x: i16,
        _dst_y: i16,
        _width: u16,
        _height: u16,
    ) -> Result<()> {
        Ok(())
    }
    #[allow(clippy::too_many_arguments)]
    async fn copy_plane(
        &self,
        _src: DrawableId,
        _dst: DrawableId,
        _gc: &GContext,
        _src_x: i16,
        _src_y: i16,
        _dst_x: i16,
        _dst_y: i16,
        _width: u16,
        _height: u16,
        _bit_plane: u32,
    ) -> Result<()> {
        Ok(())
    }
    async fn poly_point(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _relative: bool,
        _points: &[Point],
    ) -> Result<()> {
        Ok(())
    }
    async fn poly_line(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _relative: bool,
        _points: &[Point],
    ) -> Result<()> {
        Ok(())
    }
    async fn poly_segment(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _segments: &[Segment],
    ) -> Result<()> {
        Ok(())
    }
    async fn poly_rectangle(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _rectangles: &[Rectangle],
        _fill: bool,
    ) -> Result<()> {
        Ok(())
    }
    async fn poly_arc(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _arcs: &[Arc],
        _fill: bool,
    ) -> Result<()> {
        Ok(())
    }
    async fn fill_poly(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _shape: u8,
        _relative: bool,
        _points: &[Point],
    ) -> Result<()> {
        Ok(())
    }
    async fn clear_area(&self, _window: WindowId, _rect: Rectangle) -> Result<()> {
        Ok(())
    }

    // Text
    async fn image_text8(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _x: i16,
        _y: i16,
        _text: &[u8],
    ) -> Result<()> {
        Ok(())
    }
    async fn image_text16(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _x: i16,
        _y: i16,
        _text: &[u16],
    ) -> Result<()> {
        Ok(())
    }
    async fn poly_text8(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _x: i16,
        _y: i16,
        _items: &[TextItem<u8>],
    ) -> Result<()> {
        Ok(())
    }
    async fn poly_text16(
        &self,
        _drawable: DrawableId,
        _gc: &GContext,
        _x: i16,
        _y: i16,
        _items: &[TextItem<u16>],
    ) -> Result<()> {
        Ok(())
    }

    // Fonts
    /// Open a font by name; None means the name is unknown.
    async fn open_font(&self, _name: &str) -> Result<Option<FontInfo>> {
        Ok(None)
    }
    async fn close_font(&self, _font: FontId) -> Result<()> {
        Ok(())
    }
    async fn list_fonts(&self, _pattern: &str, _max_names: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    // Pixmaps and cursors
    async fn create_pixmap(&self, _pixmap: &Pixmap) -> Result<()> {
        Ok(())
    }
    async fn free_pixmap(&self, _pixmap: PixmapId) -> Result<()> {
        Ok(())
    }
    async fn create_cursor(&self, _cursor: &Cursor) -> Result<()> {
        Ok(())
    }
    async fn free_cursor(&self, _cursor: CursorId) -> Result<()> {
        Ok(())
    }
    async fn recolor_cursor(&self, _cursor: &Cursor) -> Result<()> {
        Ok(())
    }

    // Clipboard
    async fn clipboard_read(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
    async fn clipboard_write(&self, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    // Device and screen controls
    async fn bell(&self, _percent: i8) -> Result<()> {
        Ok(())
    }
    async fn set_pointer_control(
        &self,
        _acceleration: (i16, i16),
        _threshold: i16,
    ) -> Result<()> {
        Ok(())
    }
    async fn set_keyboard_control(&self, _values: &KeyboardControlValues) -> Result<()> {
        Ok(())
    }
    async fn set_screen_saver(
        &self,
        _timeout: i16,
        _interval: i16,
        _prefer_blanking: u8,
        _allow_exposures: u8,
    ) -> Result<()> {
        Ok(())
    }
    async fn force_screen_saver(&self, _activate: bool) -> Result<()> {
        Ok(())
    }

    /// A drawable's contents changed; repaint it when convenient.
    async fn compose_window(&self, _drawable: DrawableId) -> Result<()> {
        Ok(())
    }

    /// Translate a colormap pixel to 8-bit RGB.
    async fn rgb_color(&self, pixel: u32) -> Result<(u8, u8, u8)> {
        Ok(((pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8))
    }
}

/// Fixed-metric monospace cell used by the headless frontend.
pub fn fixed_font_info() -> FontInfo {
    let cell = CharInfo {
        left_side_bearing: 0,
        right_side_bearing: 6,
        character_width: 6,
        ascent: 11,
        descent: 2,
        attributes: 0,
    };
    FontInfo {
        min_bounds: cell,
        max_bounds: cell,
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
    }
}

/// A frontend that satisfies the whole contract without rendering.
/// Keeps just enough state (titles, clipboard, counters) to be
/// observable from tests and a usable default for the binary.
#[derive(Debug, Default)]
pub struct HeadlessFrontend {
    titles: Mutex<HashMap<WindowId, String>>,
    clipboard: Mutex<Vec<u8>>,
    bells: AtomicU32,
    composed: AtomicU32,
}

impl HeadlessFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title_of(&self, window: WindowId) -> Option<String> {
        self.titles.lock().unwrap().get(&window).cloned()
    }

    pub fn bell_count(&self) -> u32 {
        self.bells.load(Ordering::SeqCst)
    }

    pub fn compose_count(&self) -> u32 {
        self.composed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Frontend for HeadlessFrontend {
    async fn set_window_title(&self, window: WindowId, title: &str) -> Result<()> {
        self.titles.lock().unwrap().insert(window, title.to_string());
        Ok(())
    }

    async fn open_font(&self, name: &str) -> Result<Option<FontInfo>> {
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Some(fixed_font_info()))
    }

    async fn list_fonts(&self, pattern: &str, max_names: usize) -> Result<Vec<String>> {
        let all = ["cursor", "fixed", "6x13"];
        Ok(all
            .iter()
            .filter(|name| pattern_matches(pattern, name))
            .take(max_names)
            .map(|s| s.to_string())
            .collect())
    }

    async fn clipboard_read(&self) -> Result<Vec<u8>> {
        Ok(self.clipboard.lock().unwrap().clone())
    }

    async fn clipboard_write(&self, data: &[u8]) -> Result<()> {
        *self.clipboard.lock().unwrap() = data.to_vec();
        Ok(())
    }

    async fn bell(&self, _percent: i8) -> Result<()> {
        self.bells.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn compose_window(&self, _drawable: DrawableId) -> Result<()> {
        self.composed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Glob match for font patterns: `*` and `?` only, case-insensitive.
fn pattern_matches(pattern: &str, name: &str) -> bool {
    fn inner(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => inner(&p[1..], n) || (!n.is_empty() && inner(p, &n[1..])),
            (Some(b'?'), Some(_)) => inner(&p[1..], &n[1..]),
            (Some(&pc), Some(&nc)) => {
                pc.eq_ignore_ascii_case(&nc) && inner(&p[1..], &n[1..])
            }
            _ => false,
        }
    }
    inner(pattern.as_bytes(), name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        assert!(pattern_matches("*", "fixed"));
        assert!(pattern_matches("f*d", "fixed"));
        assert!(pattern_matches("FIXED", "fixed"));
        assert!(pattern_matches("6x1?", "6x13"));
        assert!(!pattern_matches("cursor", "fixed"));
    }

    #[tokio::test]
    async fn test_headless_records_titles_and_clipboard() {
        let frontend = HeadlessFrontend::new();
        frontend.set_window_title(7, "term").await.unwrap();
        assert_eq!(frontend.title_of(7).as_deref(), Some("term"));

        frontend.clipboard_write(b"copied").await.unwrap();
        assert_eq!(frontend.clipboard_read().await.unwrap(), b"copied");
    }

    #[tokio::test]
    async fn test_headless_font_surface() {
        let frontend = HeadlessFrontend::new();
        let info = frontend.open_font("fixed").await.unwrap().unwrap();
        assert_eq!(info.max_bounds.character_width, 6);
        assert!(frontend.open_font("").await.unwrap().is_none());

        let names = frontend.list_fonts("*", 10).await.unwrap();
        assert_eq!(names, vec!["cursor", "fixed", "6x13"]);
        assert_eq!(frontend.list_fonts("*", 1).await.unwrap().len(), 1);
    }
}
