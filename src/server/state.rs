//! Shared server state
//!
//! Everything the protocol semantics treat as atomic lives here, behind
//! one `tokio::sync::Mutex` owned by [`super::Server`]: the resource
//! registry, atoms, selections, grabs, input state, per-client sessions
//! and the server-grab flag. Handlers run with the lock held, so no
//! other task can observe partial mutations.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::input::InputState;
use crate::input::grabs::GrabManager;
use crate::protocol::events::Event;
use crate::protocol::setup::Setup;
use crate::protocol::types::*;
use crate::resources::{Registry, Window};
use crate::server::client::Client;

/// Per-atom selection ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub owner: WindowId,
    pub time: Timestamp,
}

/// Clients get 2^21 resource IDs each, starting above the server's
/// reserved range.
pub const RESOURCE_ID_BITS: u32 = 21;
pub const RESOURCE_ID_MASK: XId = (1 << RESOURCE_ID_BITS) - 1;

#[derive(Debug)]
pub struct ServerState {
    pub setup: Setup,
    pub registry: Registry,
    pub atoms: crate::resources::atoms::AtomTable,
    pub selections: HashMap<Atom, Selection>,
    pub grabs: GrabManager,
    pub input: InputState,
    pub clients: HashMap<ClientId, Client>,
    /// While set, requests from every other client are deferred.
    pub server_grab: Option<ClientId>,
    /// Bumped whenever the server grab is released; connection tasks
    /// subscribe and park on it (watch channels never miss an edge).
    grab_release: watch::Sender<u32>,
    /// Drawables whose contents changed during the current request.
    pub dirty: HashSet<DrawableId>,
    /// Clients that disconnected with a retaining close-down mode.
    pub retained: HashMap<ClientId, CloseDownMode>,
    started: Instant,
    next_client_id: ClientId,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        let setup = Setup::from_config(config);
        Self {
            registry: Registry::new(&setup),
            setup,
            atoms: crate::resources::atoms::AtomTable::new(),
            selections: HashMap::new(),
            grabs: GrabManager::new(),
            input: InputState::new(),
            clients: HashMap::new(),
            server_grab: None,
            grab_release: watch::channel(0).0,
            dirty: HashSet::new(),
            retained: HashMap::new(),
            started: Instant::now(),
            next_client_id: 1,
        }
    }

    /// Server time: milliseconds since start, wrapping at 32 bits.
    pub fn now(&self) -> Timestamp {
        self.started.elapsed().as_millis() as Timestamp
    }

    /// Substitute the server time for CurrentTime.
    pub fn resolve_time(&self, time: Timestamp) -> Timestamp {
        if time == CURRENT_TIME { self.now() } else { time }
    }

    pub fn subscribe_grab_release(&self) -> watch::Receiver<u32> {
        self.grab_release.subscribe()
    }

    pub fn signal_grab_released(&self) {
        self.grab_release.send_modify(|epoch| *epoch = epoch.wrapping_add(1));
    }

    /// Issue the next client its (base, mask) pair.
    pub fn allocate_client_id(&mut self) -> (ClientId, XId, XId) {
        let id = self.next_client_id;
        self.next_client_id += 1;
        let base = id << RESOURCE_ID_BITS;
        (id, base, RESOURCE_ID_MASK)
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn client_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn mark_dirty(&mut self, drawable: DrawableId) {
        self.dirty.insert(drawable);
    }

    pub fn take_dirty(&mut self) -> Vec<DrawableId> {
        self.dirty.drain().collect()
    }

    /// Queue `event` for every client whose selection on `window`
    /// intersects `mask`. Returns how many clients received it.
    pub fn deliver_to_selecting(
        &self,
        window: WindowId,
        mask: EventMask,
        event: &Event,
    ) -> usize {
        let Some(win) = self.registry.windows.get(window) else {
            return 0;
        };
        let mut delivered = 0;
        for (&client_id, &selected) in &win.event_masks {
            if selected.intersects(mask)
                && let Some(client) = self.clients.get(&client_id)
            {
                client.send_event(event);
                delivered += 1;
            }
        }
        delivered
    }

    /// Queue `event` for one client if it exists.
    pub fn deliver_to_client(&self, client: ClientId, event: &Event) {
        if let Some(client) = self.clients.get(&client) {
            client.send_event(event);
        }
    }

    /// Destroy a window and its subtree: detach from the parent, drop
    /// grabs and selections owned by the dead windows, emit
    /// DestroyNotify, and keep the pointer window valid. Returns the
    /// destroyed windows, leaves first.
    pub fn destroy_window_subtree(&mut self, window: WindowId) -> Vec<Window> {
        let parent = self.registry.windows.get(window).and_then(|w| w.parent);
        let removed = self.registry.windows.remove_subtree(window);
        if removed.is_empty() {
            return removed;
        }
        let removed_ids: HashSet<WindowId> = removed.iter().map(|w| w.id).collect();

        for dead in &removed {
            // StructureNotify on the window itself
            let event = Event::DestroyNotify {
                event: dead.id,
                window: dead.id,
            };
            for (&client_id, &mask) in &dead.event_masks {
                if mask.contains(EventMask::STRUCTURE_NOTIFY) {
                    self.deliver_to_client(client_id, &event);
                }
            }
            self.grabs.clear_window(dead.id);
            self.selections.retain(|_, s| s.owner != dead.id);
            if self.input.focus == crate::input::FocusTarget::Window(dead.id) {
                self.input.focus = crate::input::FocusTarget::PointerRoot;
            }
        }

        // SubstructureNotify on the surviving parent
        if let Some(parent) = parent
            && !removed_ids.contains(&parent)
        {
            let event = Event::DestroyNotify {
                event: parent,
                window,
            };
            self.deliver_to_selecting(parent, EventMask::SUBSTRUCTURE_NOTIFY, &event);
        }

        if removed_ids.contains(&self.input.pointer_window) {
            self.input.pointer_window = self
                .registry
                .windows
                .window_at(self.input.pointer_x, self.input.pointer_y);
        }
        debug!("Destroyed window {:#x} and {} descendants", window, removed.len() - 1);
        removed
    }

    /// Tear down a disconnecting (or killed) client. Returns the IDs of
    /// windows destroyed so the caller can notify the frontend.
    pub fn disconnect_client(&mut self, client_id: ClientId) -> Vec<WindowId> {
        let Some(client) = self.clients.remove(&client_id) else {
            return Vec::new();
        };
        info!(
            "Client {} disconnecting (close-down {:?})",
            client_id, client.close_down
        );

        self.grabs.clear_client(client_id);
        if self.server_grab == Some(client_id) {
            self.server_grab = None;
            self.signal_grab_released();
        }

        let mut destroyed = Vec::new();
        match client.close_down {
            CloseDownMode::Destroy => {
                for toplevel in self.registry.toplevel_windows_of(client_id) {
                    for dead in self.destroy_window_subtree(toplevel) {
                        destroyed.push(dead.id);
                    }
                }
                self.registry.free_client_resources(client_id);
            }
            mode => {
                self.retained.insert(client_id, mode);
            }
        }
        self.registry.clear_event_selections(client_id);
        destroyed
    }

    /// Destroy resources retained by clients that disconnected with
    /// RetainTemporary (KillClient with AllTemporary).
    pub fn kill_temporary_retained(&mut self) -> Vec<WindowId> {
        let temporary: Vec<ClientId> = self
            .retained
            .iter()
            .filter(|(_, mode)| **mode == CloseDownMode::RetainTemporary)
            .map(|(&id, _)| id)
            .collect();
        let mut destroyed = Vec::new();
        for client_id in temporary {
            for toplevel in self.registry.toplevel_windows_of(client_id) {
                for dead in self.destroy_window_subtree(toplevel) {
                    destroyed.push(dead.id);
                }
            }
            self.registry.free_client_resources(client_id);
            self.retained.remove(&client_id);
        }
        destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::requests::WindowAttributes;
    use crate::resources::window::Window as WindowRes;
    use std::collections::HashMap as Map;
    use tokio::sync::mpsc::unbounded_channel;
    use tokio_util::sync::CancellationToken;

    pub(crate) fn state_with_client()
    -> (ServerState, tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>) {
        let mut state = ServerState::new(&ServerConfig::default());
        let (id, base, mask) = state.allocate_client_id();
        let (tx, rx) = unbounded_channel();
        state.clients.insert(
            id,
            Client::new(
                id,
                ByteOrder::LittleEndian,
                base,
                mask,
                tx,
                CancellationToken::new(),
            ),
        );
        (state, rx)
    }

    fn add_window(state: &mut ServerState, id: WindowId, parent: WindowId, owner: ClientId) {
        state.registry.windows.insert(WindowRes {
            id,
            owner,
            parent: Some(parent),
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
            event_masks: Map::new(),
            do_not_propagate_mask: EventMask::empty(),
            properties: Map::new(),
        });
    }

    #[test]
    fn test_resolve_time_substitutes_current_time() {
        let state = ServerState::new(&ServerConfig::default());
        assert_eq!(state.resolve_time(1234), 1234);
        // CurrentTime maps to the server clock, never back to zero
        let before = state.now();
        let resolved = state.resolve_time(CURRENT_TIME);
        assert!(resolved >= before && resolved <= state.now());
    }

    #[test]
    fn test_client_id_ranges_are_disjoint() {
        let mut state = ServerState::new(&ServerConfig::default());
        let (a, base_a, mask) = state.allocate_client_id();
        let (b, base_b, _) = state.allocate_client_id();
        assert_ne!(a, b);
        assert_eq!(base_a & base_b, 0x0020_0000 & 0x0040_0000);
        assert_eq!(base_a & mask, 0);
        assert!(base_b > base_a + mask);
    }

    #[test]
    fn test_destroy_subtree_clears_grabs_selections_and_focus() {
        let (mut state, _rx) = state_with_client();
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, 1);
        add_window(&mut state, 0x0020_0002, 0x0020_0001, 1);
        state.selections.insert(
            1,
            Selection {
                owner: 0x0020_0002,
                time: 1,
            },
        );
        state.input.focus = crate::input::FocusTarget::Window(0x0020_0002);
        state.grabs.add_button_grab(crate::input::grabs::PassiveGrab {
            window: 0x0020_0002,
            client: 1,
            detail: 1,
            modifiers: 0,
            owner_events: false,
            event_mask: EventMask::BUTTON_PRESS,
            pointer_mode: GrabMode::Async,
            keyboard_mode: GrabMode::Async,
            confine_to: None,
            cursor: None,
        });

        let removed = state.destroy_window_subtree(0x0020_0001);
        assert_eq!(removed.len(), 2);
        assert!(state.selections.is_empty());
        assert_eq!(state.input.focus, crate::input::FocusTarget::PointerRoot);
        assert!(
            state
                .grabs
                .find_button_grab(0x0020_0002, 1, 0)
                .is_none()
        );
        assert!(!state.registry.windows.contains(0x0020_0001));
    }

    #[test]
    fn test_disconnect_destroy_mode_frees_resources() {
        let (mut state, _rx) = state_with_client();
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, 1);
        let destroyed = state.disconnect_client(1);
        assert_eq!(destroyed, vec![0x0020_0001]);
        assert!(state.clients.is_empty());
        assert!(!state.registry.windows.contains(0x0020_0001));
    }

    #[test]
    fn test_disconnect_retain_temporary_then_kill() {
        let (mut state, _rx) = state_with_client();
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, 1);
        state.client_mut(1).unwrap().close_down = CloseDownMode::RetainTemporary;
        let destroyed = state.disconnect_client(1);
        assert!(destroyed.is_empty());
        assert!(state.registry.windows.contains(0x0020_0001));

        let killed = state.kill_temporary_retained();
        assert_eq!(killed, vec![0x0020_0001]);
        assert!(!state.registry.windows.contains(0x0020_0001));
        assert!(state.retained.is_empty());
    }

    #[test]
    fn test_disconnect_releases_server_grab() {
        let (mut state, _rx) = state_with_client();
        state.server_grab = Some(1);
        state.disconnect_client(1);
        assert_eq!(state.server_grab, None);
    }

    #[test]
    fn test_apply_attributes_event_mask_registration() {
        let (mut state, _rx) = state_with_client();
        add_window(&mut state, 0x0020_0001, ROOT_WINDOW, 1);
        let window = state.registry.windows.get_mut(0x0020_0001).unwrap();
        window.apply_attributes(
            1,
            &WindowAttributes {
                event_mask: Some(EventMask::BUTTON_PRESS),
                ..WindowAttributes::default()
            },
        );
        assert_eq!(window.event_mask_of(1), EventMask::BUTTON_PRESS);
        assert_eq!(window.all_event_masks(), EventMask::BUTTON_PRESS);
    }
}
