//! Server core
//!
//! [`Server`] owns the shared state behind a single mutex and drives
//! one connection task per client over any byte stream. The embedding
//! application injects device input through the `pointer_*`/`key_*`
//! methods; the event router fans it out to interested clients.

pub mod client;
mod connection;
pub mod dispatch;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::frontend::Frontend;
use crate::input::router;
use crate::protocol::setup::SetupRequest;
use crate::protocol::types::*;
use state::ServerState;

#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    state: Mutex<ServerState>,
    frontend: Arc<dyn Frontend>,
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig, frontend: Arc<dyn Frontend>) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                state: Mutex::new(ServerState::new(&config)),
                frontend,
                config,
            }),
        }
    }

    pub(crate) fn state(&self) -> &Mutex<ServerState> {
        &self.inner.state
    }

    pub(crate) fn frontend(&self) -> &Arc<dyn Frontend> {
        &self.inner.frontend
    }

    /// Drive one client connection over `stream` until it closes.
    pub async fn serve_connection<S>(&self, stream: S) -> crate::Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        connection::run(self, stream).await
    }

    /// Compare the handshake's authorization block against the
    /// configured protocol/cookie. No configuration accepts everyone.
    pub fn check_authorization(&self, request: &SetupRequest) -> Result<(), String> {
        let Some(expected_protocol) = &self.inner.config.auth_protocol else {
            return Ok(());
        };
        if request.auth_protocol_name != *expected_protocol {
            return Err(format!(
                "authorization protocol {:?} not accepted",
                request.auth_protocol_name
            ));
        }
        let expected_cookie = self
            .inner
            .config
            .auth_cookie
            .as_deref()
            .map(parse_hex)
            .unwrap_or_default();
        if request.auth_protocol_data != expected_cookie {
            return Err("authorization cookie mismatch".to_string());
        }
        Ok(())
    }

    /// Run `f` against the locked server state. Used by embedders to
    /// observe or adjust state outside the protocol (and by tests).
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut ServerState) -> R) -> R {
        let mut state = self.inner.state.lock().await;
        f(&mut state)
    }

    // Input injection: the transport-side application feeds device
    // input here; routing happens under the state lock.

    pub async fn pointer_moved(&self, x: i16, y: i16) {
        let mut state = self.inner.state.lock().await;
        router::pointer_moved(&mut state, x, y);
    }

    pub async fn button_pressed(&self, button: Button) {
        let mut state = self.inner.state.lock().await;
        router::button_changed(&mut state, button, true);
    }

    pub async fn button_released(&self, button: Button) {
        let mut state = self.inner.state.lock().await;
        router::button_changed(&mut state, button, false);
    }

    pub async fn key_pressed(&self, keycode: KeyCode) {
        let mut state = self.inner.state.lock().await;
        router::key_changed(&mut state, keycode, true);
    }

    pub async fn key_released(&self, keycode: KeyCode) {
        let mut state = self.inner.state.lock().await;
        router::key_changed(&mut state, keycode, false);
    }
}

fn parse_hex(s: &str) -> Vec<u8> {
    let digits: Vec<u8> = s
        .bytes()
        .filter_map(|b| match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        })
        .collect();
    digits.chunks_exact(2).map(|p| (p[0] << 4) | p[1]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::HeadlessFrontend;
    use crate::input::grabs::GrabState;
    use crate::protocol::events::code;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::time::{Duration, timeout};

    struct TestClient {
        stream: DuplexStream,
        pub resource_base: u32,
        sequence: u16,
    }

    impl TestClient {
        /// Handshake over an in-memory duplex and parse the setup
        /// response far enough to learn the resource ID base.
        async fn connect(server: &Server) -> Self {
            let (client_side, server_side) = tokio::io::duplex(1 << 20);
            let server = server.clone();
            tokio::spawn(async move {
                let _ = server.serve_connection(server_side).await;
            });

            let mut stream = client_side;
            let mut handshake = vec![b'l', 0];
            handshake.extend_from_slice(&11u16.to_le_bytes());
            handshake.extend_from_slice(&0u16.to_le_bytes());
            handshake.extend_from_slice(&0u16.to_le_bytes()); // auth name len
            handshake.extend_from_slice(&0u16.to_le_bytes()); // auth data len
            handshake.extend_from_slice(&[0, 0]);
            stream.write_all(&handshake).await.unwrap();

            let mut head = [0u8; 8];
            stream.read_exact(&mut head).await.unwrap();
            assert_eq!(head[0], 1, "setup must succeed");
            let words = u16::from_le_bytes([head[6], head[7]]) as usize;
            let mut body = vec![0u8; words * 4];
            stream.read_exact(&mut body).await.unwrap();
            let resource_base = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);

            Self {
                stream,
                resource_base,
                sequence: 0,
            }
        }

        async fn send(&mut self, opcode: u8, data: u8, body: &[u8]) {
            assert_eq!(body.len() % 4, 0);
            let mut packet = vec![opcode, data];
            packet.extend_from_slice(&((body.len() as u16 / 4) + 1).to_le_bytes());
            packet.extend_from_slice(body);
            self.stream.write_all(&packet).await.unwrap();
            self.sequence = self.sequence.wrapping_add(1);
        }

        /// Read one 32-byte message plus any reply tail.
        async fn read_message(&mut self) -> Vec<u8> {
            let mut head = vec![0u8; 32];
            self.stream.read_exact(&mut head).await.unwrap();
            if head[0] == 1 {
                let words =
                    u32::from_le_bytes([head[4], head[5], head[6], head[7]]) as usize;
                let mut tail = vec![0u8; words * 4];
                self.stream.read_exact(&mut tail).await.unwrap();
                head.extend_from_slice(&tail);
            }
            head
        }

        async fn intern_atom(&mut self, name: &str, only_if_exists: bool) -> u32 {
            let mut body = Vec::new();
            body.extend_from_slice(&(name.len() as u16).to_le_bytes());
            body.extend_from_slice(&[0, 0]);
            body.extend_from_slice(name.as_bytes());
            body.resize(body.len() + crate::protocol::wire::pad(name.len()), 0);
            self.send(16, only_if_exists as u8, &body).await;
            let reply = self.read_message().await;
            assert_eq!(reply[0], 1);
            u32::from_le_bytes([reply[8], reply[9], reply[10], reply[11]])
        }

        async fn create_window(&mut self, wid: u32, x: i16, y: i16, w: u16, h: u16, event_mask: u32) {
            let mut body = Vec::new();
            body.extend_from_slice(&wid.to_le_bytes());
            body.extend_from_slice(&ROOT_WINDOW.to_le_bytes());
            body.extend_from_slice(&x.to_le_bytes());
            body.extend_from_slice(&y.to_le_bytes());
            body.extend_from_slice(&w.to_le_bytes());
            body.extend_from_slice(&h.to_le_bytes());
            body.extend_from_slice(&0u16.to_le_bytes()); // border
            body.extend_from_slice(&1u16.to_le_bytes()); // InputOutput
            body.extend_from_slice(&ROOT_VISUAL.to_le_bytes());
            if event_mask != 0 {
                body.extend_from_slice(&0x0800u32.to_le_bytes());
                body.extend_from_slice(&event_mask.to_le_bytes());
            } else {
                body.extend_from_slice(&0u32.to_le_bytes());
            }
            self.send(1, 24, &body).await;
        }

        async fn map_window(&mut self, wid: u32) {
            self.send(8, 0, &wid.to_le_bytes()).await;
        }
    }

    fn server() -> (Server, Arc<HeadlessFrontend>) {
        let frontend = Arc::new(HeadlessFrontend::new());
        (
            Server::new(ServerConfig::default(), frontend.clone()),
            frontend,
        )
    }

    #[tokio::test]
    async fn test_intern_atom_scenario() {
        let (server, _) = server();
        let mut client = TestClient::connect(&server).await;

        assert_eq!(client.intern_atom("NON_EXISTENT", true).await, 0);
        assert_eq!(client.intern_atom("FOO", false).await, 69);

        // GetAtomName(69) == "FOO"
        client.send(17, 0, &69u32.to_le_bytes()).await;
        let reply = client.read_message().await;
        assert_eq!(reply[0], 1);
        let name_len = u16::from_le_bytes([reply[8], reply[9]]) as usize;
        assert_eq!(&reply[32..32 + name_len], b"FOO");
    }

    #[tokio::test]
    async fn test_property_scenario() {
        let (server, frontend) = server();
        let mut client = TestClient::connect(&server).await;
        let wid = client.resource_base | 1;
        client.create_window(wid, 0, 0, 100, 100, 0).await;

        // ChangeProperty WM_NAME STRING 8 "hi"
        let mut body = Vec::new();
        body.extend_from_slice(&wid.to_le_bytes());
        body.extend_from_slice(&39u32.to_le_bytes());
        body.extend_from_slice(&31u32.to_le_bytes());
        body.push(8);
        body.extend_from_slice(&[0, 0, 0]);
        body.extend_from_slice(&2u32.to_le_bytes());
        body.extend_from_slice(b"hi\0\0");
        client.send(18, 0, &body).await;

        // GetProperty WM_NAME
        let mut body = Vec::new();
        body.extend_from_slice(&wid.to_le_bytes());
        body.extend_from_slice(&39u32.to_le_bytes());
        body.extend_from_slice(&31u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&1024u32.to_le_bytes());
        client.send(20, 0, &body).await;

        let reply = client.read_message().await;
        assert_eq!(reply[0], 1);
        assert_eq!(reply[1], 8); // format
        assert_eq!(
            u32::from_le_bytes([reply[8], reply[9], reply[10], reply[11]]),
            31
        );
        assert_eq!(&reply[32..34], b"hi");

        // WM_NAME reaches the frontend as the window title
        assert_eq!(frontend.title_of(wid).as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_button_press_event_scenario() {
        let (server, _) = server();
        let mut client = TestClient::connect(&server).await;
        let wid = client.resource_base | 1;
        client
            .create_window(wid, 0, 10, 100, 100, EventMask::BUTTON_PRESS.bits())
            .await;
        client.map_window(wid).await;
        // NoOperation round-trip drains the pipeline before injecting
        client.send(127, 0, &[]).await;
        client.send(43, 0, &[]).await; // GetInputFocus
        client.read_message().await;

        server.pointer_moved(10, 20).await;
        server.button_pressed(1).await;

        let event = timeout(Duration::from_secs(1), client.read_message())
            .await
            .expect("event should arrive");
        assert_eq!(event.len(), 32);
        assert_eq!(event[0], code::BUTTON_PRESS);
        assert_eq!(event[1], 1);
        assert_eq!(
            u32::from_le_bytes([event[12], event[13], event[14], event[15]]),
            wid
        );
        let root_x = i16::from_le_bytes([event[20], event[21]]);
        let root_y = i16::from_le_bytes([event[22], event[23]]);
        assert_eq!((root_x, root_y), (10, 20));
    }

    #[tokio::test]
    async fn test_grab_key_scenario() {
        let (server, _) = server();
        let mut client = TestClient::connect(&server).await;
        let wid = client.resource_base | 1;
        client.create_window(wid, 0, 0, 100, 100, 0).await;
        client.map_window(wid).await;

        // GrabKey key=38 modifiers=AnyModifier owner-events=false
        let mut body = Vec::new();
        body.extend_from_slice(&wid.to_le_bytes());
        body.extend_from_slice(&ANY_MODIFIER.to_le_bytes());
        body.push(38);
        body.push(1); // async
        body.push(1); // async
        body.extend_from_slice(&[0, 0, 0]);
        client.send(33, 0, &body).await;
        client.send(43, 0, &[]).await; // sync
        client.read_message().await;

        server.pointer_moved(5, 5).await;
        server.key_pressed(38).await;

        server
            .with_state(|state| {
                let grab = state.grabs.keyboard.active().expect("keyboard grab active");
                assert_eq!(grab.window, wid);
            })
            .await;
    }

    #[tokio::test]
    async fn test_copy_colormap_and_free_scenario() {
        let (server, _) = server();
        let mut client = TestClient::connect(&server).await;
        let cmap_a = client.resource_base | 1;
        let cmap_b = client.resource_base | 2;

        // CreateColormap A on the root visual
        let mut body = Vec::new();
        body.extend_from_slice(&cmap_a.to_le_bytes());
        body.extend_from_slice(&ROOT_WINDOW.to_le_bytes());
        body.extend_from_slice(&ROOT_VISUAL.to_le_bytes());
        client.send(78, 0, &body).await;

        // AllocColor {0x1000, 0x2000, 0x3000}
        let mut body = Vec::new();
        body.extend_from_slice(&cmap_a.to_le_bytes());
        body.extend_from_slice(&0x1000u16.to_le_bytes());
        body.extend_from_slice(&0x2000u16.to_le_bytes());
        body.extend_from_slice(&0x3000u16.to_le_bytes());
        body.extend_from_slice(&[0, 0]);
        client.send(84, 0, &body).await;
        let reply = client.read_message().await;
        assert_eq!(reply[0], 1);
        let pixel = u32::from_le_bytes([reply[16], reply[17], reply[18], reply[19]]);
        assert_eq!(pixel, 0x0010_2030);

        // CopyColormapAndFree(B, A)
        let mut body = Vec::new();
        body.extend_from_slice(&cmap_b.to_le_bytes());
        body.extend_from_slice(&cmap_a.to_le_bytes());
        client.send(80, 0, &body).await;
        client.send(43, 0, &[]).await;
        client.read_message().await;

        server
            .with_state(|state| {
                assert!(state.registry.colormap(cmap_b).unwrap().cell(pixel).is_some());
                assert!(state.registry.colormap(cmap_a).unwrap().cell(pixel).is_none());
            })
            .await;
    }

    #[tokio::test]
    async fn test_zero_length_without_big_requests_closes() {
        let (server, _) = server();
        let mut client = TestClient::connect(&server).await;

        // length field 0 before BigReqEnable
        client
            .stream
            .write_all(&[127, 0, 0, 0])
            .await
            .unwrap();

        let error = client.read_message().await;
        assert_eq!(error[0], 0);
        assert_eq!(error[1], crate::protocol::error::ErrorKind::Length as u8);

        // the connection is dropped afterwards
        let mut probe = [0u8; 1];
        let read = timeout(Duration::from_secs(1), client.stream.read(&mut probe))
            .await
            .expect("connection should close");
        assert!(matches!(read, Ok(0)));
    }

    #[tokio::test]
    async fn test_big_requests_enable_then_extended_length() {
        let (server, _) = server();
        let mut client = TestClient::connect(&server).await;

        // BigReqEnable
        client.send(133, 0, &[]).await;
        let reply = client.read_message().await;
        assert_eq!(reply[0], 1);
        let max = u32::from_le_bytes([reply[8], reply[9], reply[10], reply[11]]);
        assert!(max > u16::MAX as u32);

        // extended-length NoOperation: header len 0, ext len 2 words
        client
            .stream
            .write_all(&[127, 0, 0, 0])
            .await
            .unwrap();
        client.stream.write_all(&2u32.to_le_bytes()).await.unwrap();

        // still alive: a further request answers normally
        client.send(43, 0, &[]).await;
        let reply = timeout(Duration::from_secs(1), client.read_message())
            .await
            .expect("reply after big request");
        assert_eq!(reply[0], 1);
    }

    #[tokio::test]
    async fn test_server_grab_defers_other_clients() {
        let (server, _) = server();
        let mut holder = TestClient::connect(&server).await;
        let mut other = TestClient::connect(&server).await;

        holder.send(36, 0, &[]).await; // GrabServer
        holder.send(43, 0, &[]).await; // sync
        holder.read_message().await;

        // the other client's request is deferred, not answered
        other.send(43, 0, &[]).await;
        let deferred = timeout(Duration::from_millis(200), other.read_message()).await;
        assert!(deferred.is_err(), "request must be deferred during grab");

        holder.send(37, 0, &[]).await; // UngrabServer
        let reply = timeout(Duration::from_secs(1), other.read_message())
            .await
            .expect("deferred request answered after release");
        assert_eq!(reply[0], 1);
    }

    #[tokio::test]
    async fn test_unknown_opcode_returns_request_error() {
        let (server, _) = server();
        let mut client = TestClient::connect(&server).await;
        client.send(200, 0, &[]).await;
        let error = client.read_message().await;
        assert_eq!(error[0], 0);
        assert_eq!(error[1], crate::protocol::error::ErrorKind::Request as u8);
        assert_eq!(u16::from_le_bytes([error[2], error[3]]), 1);
        assert_eq!(error[10], 200); // major opcode
    }

    #[tokio::test]
    async fn test_sequence_numbers_track_requests() {
        let (server, _) = server();
        let mut client = TestClient::connect(&server).await;
        for expected in 1u16..=3 {
            client.send(43, 0, &[]).await; // GetInputFocus
            let reply = client.read_message().await;
            assert_eq!(u16::from_le_bytes([reply[2], reply[3]]), expected);
        }
    }

    #[tokio::test]
    async fn test_disconnect_destroys_client_windows() {
        let (server, _) = server();
        let wid;
        {
            let mut client = TestClient::connect(&server).await;
            wid = client.resource_base | 1;
            client.create_window(wid, 0, 0, 32, 32, 0).await;
            client.send(43, 0, &[]).await;
            client.read_message().await;
            server
                .with_state(|state| assert!(state.registry.windows.contains(wid)))
                .await;
        } // dropping the duplex closes the connection

        // teardown runs asynchronously; poll briefly
        for _ in 0..50 {
            let gone = server
                .with_state(|state| !state.registry.windows.contains(wid))
                .await;
            if gone {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("window should be destroyed on disconnect");
    }

    #[tokio::test]
    async fn test_big_endian_client_handshake() {
        let (server, _) = server();
        let (mut stream, server_side) = tokio::io::duplex(1 << 16);
        let srv = server.clone();
        tokio::spawn(async move {
            let _ = srv.serve_connection(server_side).await;
        });

        let mut handshake = vec![b'B', 0];
        handshake.extend_from_slice(&11u16.to_be_bytes());
        handshake.extend_from_slice(&0u16.to_be_bytes());
        handshake.extend_from_slice(&0u16.to_be_bytes());
        handshake.extend_from_slice(&0u16.to_be_bytes());
        handshake.extend_from_slice(&[0, 0]);
        stream.write_all(&handshake).await.unwrap();

        let mut head = [0u8; 8];
        stream.read_exact(&mut head).await.unwrap();
        assert_eq!(head[0], 1);
        assert_eq!(u16::from_be_bytes([head[2], head[3]]), 11);

        let words = u16::from_be_bytes([head[6], head[7]]) as usize;
        let mut body = vec![0u8; words * 4];
        stream.read_exact(&mut body).await.unwrap();

        // InternAtom in big-endian framing
        let name = b"FOO";
        let mut packet = vec![16u8, 0];
        packet.extend_from_slice(&3u16.to_be_bytes()); // length: header + 8 bytes
        packet.extend_from_slice(&(name.len() as u16).to_be_bytes());
        packet.extend_from_slice(&[0, 0]);
        packet.extend_from_slice(name);
        packet.push(0);
        stream.write_all(&packet).await.unwrap();

        let mut reply = [0u8; 32];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[0], 1);
        assert_eq!(
            u32::from_be_bytes([reply[8], reply[9], reply[10], reply[11]]),
            69
        );
    }

    #[tokio::test]
    async fn test_auth_cookie_mismatch_refused() {
        let frontend = Arc::new(HeadlessFrontend::new());
        let config = ServerConfig {
            auth_protocol: Some("MIT-MAGIC-COOKIE-1".to_string()),
            auth_cookie: Some("deadbeef".to_string()),
            ..ServerConfig::default()
        };
        let server = Server::new(config, frontend);
        let (mut stream, server_side) = tokio::io::duplex(1 << 16);
        let srv = server.clone();
        tokio::spawn(async move {
            let _ = srv.serve_connection(server_side).await;
        });

        let name = b"MIT-MAGIC-COOKIE-1";
        let cookie = [0u8; 4]; // wrong cookie
        let mut handshake = vec![b'l', 0];
        handshake.extend_from_slice(&11u16.to_le_bytes());
        handshake.extend_from_slice(&0u16.to_le_bytes());
        handshake.extend_from_slice(&(name.len() as u16).to_le_bytes());
        handshake.extend_from_slice(&(cookie.len() as u16).to_le_bytes());
        handshake.extend_from_slice(&[0, 0]);
        handshake.extend_from_slice(name);
        handshake.extend_from_slice(&[0, 0]); // pad to 20
        handshake.extend_from_slice(&cookie);
        stream.write_all(&handshake).await.unwrap();

        let mut head = [0u8; 8];
        stream.read_exact(&mut head).await.unwrap();
        assert_eq!(head[0], 0, "setup must fail");
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("deadbeef"), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(parse_hex("DE:AD"), vec![0xde, 0xad]);
        assert!(parse_hex("").is_empty());
    }

    #[tokio::test]
    async fn test_grab_state_machine_via_requests() {
        let (server, _) = server();
        let mut client = TestClient::connect(&server).await;
        let wid = client.resource_base | 1;
        client.create_window(wid, 0, 0, 100, 100, 0).await;
        client.map_window(wid).await;

        // GrabPointer owner-events=false on the window
        let mut body = Vec::new();
        body.extend_from_slice(&wid.to_le_bytes());
        body.extend_from_slice(&(EventMask::BUTTON_RELEASE.bits() as u16).to_le_bytes());
        body.push(1);
        body.push(1);
        body.extend_from_slice(&NONE.to_le_bytes());
        body.extend_from_slice(&NONE.to_le_bytes());
        body.extend_from_slice(&CURRENT_TIME.to_le_bytes());
        client.send(26, 0, &body).await;
        let reply = client.read_message().await;
        assert_eq!(reply[0], 1);
        assert_eq!(reply[1], grab_status::SUCCESS);
        server
            .with_state(|state| assert!(state.grabs.pointer.is_active()))
            .await;

        // UngrabPointer releases it
        client.send(27, 0, &CURRENT_TIME.to_le_bytes()).await;
        client.send(43, 0, &[]).await;
        client.read_message().await;
        server
            .with_state(|state| assert_eq!(state.grabs.pointer, GrabState::Idle))
            .await;
    }
}
