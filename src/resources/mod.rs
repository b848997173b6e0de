//! Resource registry
//!
//! One table per resource type, all keyed by the 32-bit resource ID.
//! The setup response hands every client a disjoint (base, mask) range,
//! so IDs never collide numerically; each resource additionally records
//! its owning client, which drives disconnect cleanup and the close-down
//! modes. Lookups return the typed protocol error for a missing ID.

pub mod atoms;
pub mod colormap;
pub mod cursor;
pub mod font;
pub mod gcontext;
pub mod pixmap;
pub mod window;

use std::collections::HashMap;

use tracing::debug;

use crate::protocol::error::XError;
use crate::protocol::setup::Setup;
use crate::protocol::types::*;

pub use colormap::Colormap;
pub use cursor::Cursor;
pub use font::Font;
pub use gcontext::GContext;
pub use pixmap::Pixmap;
pub use window::{Property, Window, WindowTree};

/// Geometry common to both drawable kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawableGeometry {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub depth: u8,
    pub is_window: bool,
}

#[derive(Debug)]
pub struct Registry {
    pub windows: WindowTree,
    pub pixmaps: HashMap<PixmapId, Pixmap>,
    pub gcontexts: HashMap<GContextId, GContext>,
    pub cursors: HashMap<CursorId, Cursor>,
    pub colormaps: HashMap<ColormapId, Colormap>,
    pub fonts: HashMap<FontId, Font>,
}

impl Registry {
    pub fn new(setup: &Setup) -> Self {
        let mut colormaps = HashMap::new();
        let root_visual = setup
            .visual(setup.root_visual)
            .expect("setup lists the root visual");
        let mut default_colormap = Colormap::new(DEFAULT_COLORMAP, 0, root_visual);
        default_colormap.installed = true;
        colormaps.insert(DEFAULT_COLORMAP, default_colormap);

        Self {
            windows: WindowTree::new(
                setup.width,
                setup.height,
                setup.root_visual,
                setup.root_depth,
            ),
            pixmaps: HashMap::new(),
            gcontexts: HashMap::new(),
            cursors: HashMap::new(),
            colormaps,
            fonts: HashMap::new(),
        }
    }

    pub fn window(&self, id: WindowId) -> Result<&Window, XError> {
        self.windows.get(id).ok_or(XError::window(id))
    }

    pub fn window_mut(&mut self, id: WindowId) -> Result<&mut Window, XError> {
        self.windows.get_mut(id).ok_or(XError::window(id))
    }

    pub fn pixmap(&self, id: PixmapId) -> Result<&Pixmap, XError> {
        self.pixmaps.get(&id).ok_or(XError::pixmap(id))
    }

    pub fn gcontext(&self, id: GContextId) -> Result<&GContext, XError> {
        self.gcontexts.get(&id).ok_or(XError::gcontext(id))
    }

    pub fn gcontext_mut(&mut self, id: GContextId) -> Result<&mut GContext, XError> {
        self.gcontexts.get_mut(&id).ok_or(XError::gcontext(id))
    }

    pub fn cursor(&self, id: CursorId) -> Result<&Cursor, XError> {
        self.cursors.get(&id).ok_or(XError::cursor(id))
    }

    pub fn colormap(&self, id: ColormapId) -> Result<&Colormap, XError> {
        self.colormaps.get(&id).ok_or(XError::colormap(id))
    }

    pub fn colormap_mut(&mut self, id: ColormapId) -> Result<&mut Colormap, XError> {
        self.colormaps.get_mut(&id).ok_or(XError::colormap(id))
    }

    pub fn font(&self, id: FontId) -> Result<&Font, XError> {
        self.fonts.get(&id).ok_or(XError::font(id))
    }

    /// A drawable is a window (the root included) or a pixmap.
    pub fn drawable(&self, id: DrawableId) -> Result<DrawableGeometry, XError> {
        if let Some(window) = self.windows.get(id) {
            return Ok(DrawableGeometry {
                x: window.x,
                y: window.y,
                width: window.width,
                height: window.height,
                border_width: window.border_width,
                depth: window.depth,
                is_window: true,
            });
        }
        if let Some(pixmap) = self.pixmaps.get(&id) {
            return Ok(DrawableGeometry {
                x: 0,
                y: 0,
                width: pixmap.width,
                height: pixmap.height,
                border_width: 0,
                depth: pixmap.depth,
                is_window: false,
            });
        }
        Err(XError::drawable(id))
    }

    /// Whether `id` is unused across every table (IDChoice validation).
    pub fn id_available(&self, id: XId) -> bool {
        !self.windows.contains(id)
            && !self.pixmaps.contains_key(&id)
            && !self.gcontexts.contains_key(&id)
            && !self.cursors.contains_key(&id)
            && !self.colormaps.contains_key(&id)
            && !self.fonts.contains_key(&id)
    }

    /// Which client owns the resource range `id` falls in, judged by the
    /// per-client ID bases (KillClient resolves its argument this way).
    pub fn owner_of(&self, id: XId) -> Option<ClientId> {
        if let Some(window) = self.windows.get(id) {
            return Some(window.owner);
        }
        if let Some(pixmap) = self.pixmaps.get(&id) {
            return Some(pixmap.owner);
        }
        if let Some(gc) = self.gcontexts.get(&id) {
            return Some(gc.owner);
        }
        if let Some(cursor) = self.cursors.get(&id) {
            return Some(cursor.owner);
        }
        if let Some(cmap) = self.colormaps.get(&id) {
            return Some(cmap.owner);
        }
        if let Some(font) = self.fonts.get(&id) {
            return Some(font.owner);
        }
        None
    }

    /// Top-level windows owned by `client`: owned windows whose parent is
    /// not also owned by the client (destroying those destroys the rest).
    pub fn toplevel_windows_of(&self, client: ClientId) -> Vec<WindowId> {
        let mut ids: Vec<WindowId> = self
            .windows
            .ids()
            .filter(|&id| {
                let Some(window) = self.windows.get(id) else {
                    return false;
                };
                if window.owner != client || id == ROOT_WINDOW {
                    return false;
                }
                window
                    .parent
                    .and_then(|p| self.windows.get(p))
                    .is_none_or(|p| p.owner != client)
            })
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Drop every non-window resource owned by `client`. Window teardown
    /// is separate because it emits events. Returns the number freed.
    pub fn free_client_resources(&mut self, client: ClientId) -> usize {
        let before = self.pixmaps.len()
            + self.gcontexts.len()
            + self.cursors.len()
            + self.colormaps.len()
            + self.fonts.len();
        self.pixmaps.retain(|_, p| p.owner != client);
        self.gcontexts.retain(|_, g| g.owner != client);
        self.cursors.retain(|_, c| c.owner != client);
        self.colormaps
            .retain(|&id, c| id == DEFAULT_COLORMAP || c.owner != client);
        self.fonts.retain(|_, f| f.owner != client);
        let freed = before
            - (self.pixmaps.len()
                + self.gcontexts.len()
                + self.cursors.len()
                + self.colormaps.len()
                + self.fonts.len());
        debug!("Freed {} non-window resources of client {}", freed, client);
        freed
    }

    /// Drop every client-selected event mask `client` left behind.
    pub fn clear_event_selections(&mut self, client: ClientId) {
        let ids: Vec<WindowId> = self.windows.ids().collect();
        for id in ids {
            if let Some(window) = self.windows.get_mut(id) {
                window.event_masks.remove(&client);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn registry() -> Registry {
        Registry::new(&Setup::from_config(&ServerConfig::default()))
    }

    #[test]
    fn test_default_colormap_is_installed() {
        let registry = registry();
        let cmap = registry.colormap(DEFAULT_COLORMAP).unwrap();
        assert!(cmap.installed);
        assert!(!cmap.writable_class);
    }

    #[test]
    fn test_typed_lookup_errors() {
        let registry = registry();
        assert_eq!(registry.window(5).unwrap_err(), XError::window(5));
        assert_eq!(registry.pixmap(5).unwrap_err(), XError::pixmap(5));
        assert_eq!(registry.gcontext(5).unwrap_err(), XError::gcontext(5));
        assert_eq!(registry.drawable(5).unwrap_err(), XError::drawable(5));
    }

    #[test]
    fn test_root_is_a_drawable() {
        let registry = registry();
        let geom = registry.drawable(ROOT_WINDOW).unwrap();
        assert!(geom.is_window);
        assert_eq!(geom.width, 1280);
    }

    #[test]
    fn test_free_client_resources_keeps_default_colormap() {
        let mut registry = registry();
        registry.pixmaps.insert(
            0x0020_0001,
            Pixmap {
                id: 0x0020_0001,
                owner: 1,
                width: 4,
                height: 4,
                depth: 24,
            },
        );
        registry
            .gcontexts
            .insert(0x0020_0002, GContext::new(0x0020_0002, 1, ROOT_WINDOW));
        let freed = registry.free_client_resources(1);
        assert_eq!(freed, 2);
        assert!(registry.colormap(DEFAULT_COLORMAP).is_ok());
    }
}
