//! Per-client session state
//!
//! One record per live connection: wire byte order, the sequence
//! counter, extension flags, XInput selections, and the outbound byte
//! queue drained by the connection's writer task. The record lives in
//! the shared server state so event routing from any connection can
//! encode for this client and push to its queue.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::input::xinput::{DeviceKind, split_class};
use crate::protocol::events::Event;
use crate::protocol::types::*;

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub byte_order: ByteOrder,
    /// Sequence number of the most recently dispatched request.
    pub sequence: SequenceNumber,
    pub big_requests: bool,
    pub close_down: CloseDownMode,
    pub resource_base: XId,
    pub resource_mask: XId,
    out: UnboundedSender<Vec<u8>>,
    pub kill: CancellationToken,
    /// XInput devices opened with XOpenDevice.
    pub open_devices: HashSet<u8>,
    /// XI1 event classes selected per window.
    pub xi1_selections: HashMap<WindowId, Vec<u32>>,
    /// XI2 event masks keyed by (window, device selector).
    pub xi2_masks: HashMap<(WindowId, u16), Vec<u8>>,
    /// Windows added with ChangeSaveSet.
    pub save_set: HashSet<WindowId>,
}

impl Client {
    pub fn new(
        id: ClientId,
        byte_order: ByteOrder,
        resource_base: XId,
        resource_mask: XId,
        out: UnboundedSender<Vec<u8>>,
        kill: CancellationToken,
    ) -> Self {
        Self {
            id,
            byte_order,
            sequence: 0,
            big_requests: false,
            close_down: CloseDownMode::Destroy,
            resource_base,
            resource_mask,
            out,
            kill,
            open_devices: HashSet::new(),
            xi1_selections: HashMap::new(),
            xi2_masks: HashMap::new(),
            save_set: HashSet::new(),
        }
    }

    /// Advance the sequence counter for a newly parsed request.
    pub fn bump_sequence(&mut self) -> SequenceNumber {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    /// Whether `id` falls inside this client's issued resource range.
    pub fn owns_id(&self, id: XId) -> bool {
        id & !self.resource_mask == self.resource_base
    }

    /// Queue raw bytes for the writer task. A closed queue means the
    /// connection is going away; the bytes are simply dropped.
    pub fn send(&self, bytes: Vec<u8>) {
        let _ = self.out.send(bytes);
    }

    /// Queue a core event, stamped with this client's byte order and the
    /// sequence of its last dispatched request.
    pub fn send_event(&self, event: &Event) {
        self.send(event.encode(self.byte_order, self.sequence));
    }

    /// Whether an XOpenDevice/SelectExtensionEvent selection admits the
    /// XI1 event `offset` from `device` on `window`.
    pub fn xi1_selects(&self, window: WindowId, device: DeviceKind, offset: u8) -> bool {
        if !self.open_devices.contains(&(device.id() as u8)) {
            return false;
        }
        self.xi1_selections
            .get(&window)
            .is_some_and(|classes| {
                classes
                    .iter()
                    .any(|&c| split_class(c) == (device.id() as u8, offset))
            })
    }

    /// Whether an XISelectEvents mask admits XI2 event `evtype` from
    /// `device` on `window`.
    pub fn xi2_selects(&self, window: WindowId, device: DeviceKind, evtype: u16) -> bool {
        self.xi2_masks.iter().any(|((w, selector), mask)| {
            *w == window
                && device.selected_by(*selector)
                && crate::protocol::xinput::XiEventMask {
                    deviceid: *selector,
                    mask: mask.clone(),
                }
                .selects(evtype)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::xinput::event_class;
    use crate::protocol::xinput::{XI_ALL_MASTER_DEVICES, xi2_event};
    use tokio::sync::mpsc::unbounded_channel;

    fn client() -> (Client, tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = unbounded_channel();
        (
            Client::new(
                1,
                ByteOrder::LittleEndian,
                0x0020_0000,
                0x001f_ffff,
                tx,
                CancellationToken::new(),
            ),
            rx,
        )
    }

    #[test]
    fn test_sequence_wraps() {
        let (mut client, _rx) = client();
        client.sequence = u16::MAX;
        assert_eq!(client.bump_sequence(), 0);
        assert_eq!(client.bump_sequence(), 1);
    }

    #[test]
    fn test_owns_id_respects_base_and_mask() {
        let (client, _rx) = client();
        assert!(client.owns_id(0x0020_0001));
        assert!(client.owns_id(0x003f_ffff));
        assert!(!client.owns_id(0x0040_0001));
        assert!(!client.owns_id(ROOT_WINDOW));
    }

    #[test]
    fn test_xi1_selection_requires_open_device() {
        let (mut client, _rx) = client();
        let class = event_class(2, 3);
        client.xi1_selections.insert(10, vec![class]);
        assert!(!client.xi1_selects(10, DeviceKind::Pointer, 3));
        client.open_devices.insert(2);
        assert!(client.xi1_selects(10, DeviceKind::Pointer, 3));
        assert!(!client.xi1_selects(10, DeviceKind::Pointer, 4));
        assert!(!client.xi1_selects(11, DeviceKind::Pointer, 3));
    }

    #[test]
    fn test_xi2_selection_wildcards() {
        let (mut client, _rx) = client();
        // bit 15 = RawButtonPress
        client
            .xi2_masks
            .insert((ROOT_WINDOW, XI_ALL_MASTER_DEVICES), vec![0, 0x80, 0, 0]);
        assert!(client.xi2_selects(
            ROOT_WINDOW,
            DeviceKind::Pointer,
            xi2_event::RAW_BUTTON_PRESS
        ));
        assert!(client.xi2_selects(
            ROOT_WINDOW,
            DeviceKind::Keyboard,
            xi2_event::RAW_BUTTON_PRESS
        ));
        assert!(!client.xi2_selects(ROOT_WINDOW, DeviceKind::Pointer, xi2_event::MOTION));
    }
}
