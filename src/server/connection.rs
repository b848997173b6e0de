//! Connection lifecycle
//!
//! One task per client: perform the handshake, then read framed
//! requests and dispatch them under the server-wide state lock. A
//! writer task drains the client's outbound queue so event emission
//! from other connections never blocks on this socket. While another
//! client holds the server grab, dispatch parks until release.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::protocol::error::XError;
use crate::protocol::requests::{ParseError, Request, RequestHeader};
use crate::protocol::setup::{Setup, SetupRequest};
use crate::protocol::wire::pad;
use crate::protocol::types::*;
use crate::server::Server;
use crate::server::client::Client;
use crate::server::dispatch;
use crate::server::handlers::misc::BIG_REQUEST_MAXIMUM_LENGTH;

/// Requests above the advertised maximum are length violations.
const MAX_NORMAL_REQUEST: usize = u16::MAX as usize * 4;
const MAX_BIG_REQUEST: usize = BIG_REQUEST_MAXIMUM_LENGTH as usize * 4;

pub(crate) async fn run<S>(server: &Server, stream: S) -> crate::Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    // Handshake: 12-byte header, then the two padded auth blocks.
    let mut header = [0u8; 12];
    reader.read_exact(&mut header).await?;
    if ByteOrder::from_initial_byte(header[0]).is_none() {
        return Err(crate::Error::Setup(format!(
            "invalid byte-order byte {:#04x}",
            header[0]
        )));
    }
    let (order, major, minor, name_len, data_len) = SetupRequest::parse_header(&header)
        .map_err(|e| crate::Error::Setup(e.to_string()))?;
    let auth_len = name_len + pad(name_len) + data_len + pad(data_len);
    let mut auth = vec![0u8; auth_len];
    reader.read_exact(&mut auth).await?;
    let setup_request = SetupRequest::from_parts(order, major, minor, name_len, data_len, &auth)
        .map_err(|e| crate::Error::Setup(e.to_string()))?;

    if setup_request.protocol_major_version < PROTOCOL_MAJOR_VERSION {
        let reason = format!(
            "unsupported protocol version {}.{}",
            setup_request.protocol_major_version, setup_request.protocol_minor_version
        );
        warn!("{}", reason);
        writer.write_all(&Setup::encode_failed(order, &reason)).await?;
        return Ok(());
    }

    if let Err(reason) = server.check_authorization(&setup_request) {
        warn!("Refusing client: {}", reason);
        writer.write_all(&Setup::encode_failed(order, &reason)).await?;
        return Ok(());
    }

    // Register the client and send the setup response.
    let (client_id, kill, mut out_rx, mut grab_rx) = {
        let mut state = server.state().lock().await;
        let (client_id, base, mask) = state.allocate_client_id();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();
        let kill = tokio_util::sync::CancellationToken::new();
        state.clients.insert(
            client_id,
            Client::new(client_id, order, base, mask, tx, kill.clone()),
        );
        let setup = state.setup.encode_success(order, base, mask);
        writer.write_all(&setup).await?;
        let grab_rx = state.subscribe_grab_release();
        info!(
            "Client {} connected ({:?}, id base {:#x})",
            client_id, order, base
        );
        (client_id, kill, rx, grab_rx)
    };

    // Writer task: the single ordered path to this client's socket.
    let writer_task = tokio::spawn(async move {
        while let Some(bytes) = out_rx.recv().await {
            if writer.write_all(&bytes).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let result = read_loop(server, client_id, order, &mut reader, &kill, &mut grab_rx).await;

    // Teardown: release resources per the close-down mode, then let the
    // writer drain by dropping the queue with the client record.
    let destroyed = {
        let mut state = server.state().lock().await;
        state.disconnect_client(client_id)
    };
    for window in destroyed {
        let _ = server.frontend().destroy_window(window).await;
    }
    kill.cancel();
    let _ = writer_task.await;
    result
}

async fn read_loop<R>(
    server: &Server,
    client_id: ClientId,
    order: ByteOrder,
    reader: &mut R,
    kill: &tokio_util::sync::CancellationToken,
    grab_rx: &mut tokio::sync::watch::Receiver<u32>,
) -> crate::Result<()>
where
    R: AsyncRead + Send + Unpin,
{
    loop {
        let mut header_bytes = [0u8; 4];
        tokio::select! {
            _ = kill.cancelled() => {
                debug!("Client {} killed", client_id);
                return Ok(());
            }
            read = reader.read_exact(&mut header_bytes) => {
                match read {
                    Ok(_) => {}
                    // normal end of stream
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                    Err(e) => return Err(e.into()),
                }
            }
        }
        let header = RequestHeader::parse(&header_bytes, order);

        // Sequence numbers advance once per parsed request, before
        // dispatch; framing errors carry the new sequence too.
        let (sequence, big_requests) = {
            let mut state = server.state().lock().await;
            let Some(client) = state.client_mut(client_id) else {
                return Ok(());
            };
            (client.bump_sequence(), client.big_requests)
        };

        // Length == 0 introduces a Big-Requests extended length.
        let body_len = if header.length == 0 {
            if !big_requests {
                send_length_error(server, client_id, sequence, header.opcode).await;
                return Ok(());
            }
            let mut ext = [0u8; 4];
            reader.read_exact(&mut ext).await?;
            let words = match order {
                ByteOrder::LittleEndian => u32::from_le_bytes(ext),
                ByteOrder::BigEndian => u32::from_be_bytes(ext),
            } as usize;
            let total = words * 4;
            if total < 8 || total > MAX_BIG_REQUEST {
                send_length_error(server, client_id, sequence, header.opcode).await;
                return Ok(());
            }
            total - 8
        } else {
            let total = header.length as usize * 4;
            if total > MAX_NORMAL_REQUEST {
                send_length_error(server, client_id, sequence, header.opcode).await;
                return Ok(());
            }
            total - 4
        };

        let mut body = vec![0u8; body_len];
        reader.read_exact(&mut body).await?;

        let request = match Request::parse(header.opcode, header.data, &body, order) {
            Ok(request) => request,
            Err(ParseError::Short(short)) => {
                debug!(
                    "Client {} request {} too short: {}",
                    client_id, header.opcode, short
                );
                send_length_error(server, client_id, sequence, header.opcode).await;
                return Ok(());
            }
            Err(ParseError::Value(value)) => {
                send_error(
                    server,
                    client_id,
                    &XError::value(value),
                    sequence,
                    0,
                    header.opcode,
                )
                .await;
                continue;
            }
        };

        // While another client holds the server grab, requests are
        // deferred; the watch channel cannot miss the release edge.
        let mut state = loop {
            let state = server.state().lock().await;
            match state.server_grab {
                Some(holder) if holder != client_id => {
                    drop(state);
                    if grab_rx.changed().await.is_err() {
                        return Ok(());
                    }
                }
                _ => break state,
            }
        };

        let dispatched = AssertUnwindSafe(dispatch::dispatch_request(
            &mut state,
            server.frontend().as_ref(),
            client_id,
            &request,
        ))
        .catch_unwind()
        .await;

        match dispatched {
            Ok(Ok(Some(reply))) => {
                if let Some(client) = state.client(client_id) {
                    client.send(reply.encode(order, sequence));
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(xerr)) => {
                debug!(
                    "Client {} request {} failed: {:?}",
                    client_id, header.opcode, xerr
                );
                if let Some(client) = state.client(client_id) {
                    client.send(xerr.encode(
                        order,
                        sequence,
                        request.minor_opcode(),
                        request.major_opcode(),
                    ));
                }
            }
            Err(panic) => {
                error!(
                    "Handler for opcode {} panicked: {:?}; closing client {}",
                    header.opcode, panic, client_id
                );
                return Err(crate::Error::Protocol("handler panicked".to_string()));
            }
        }

        // Flush drawables touched by this request to the frontend.
        let dirty = state.take_dirty();
        for drawable in dirty {
            let _ = server.frontend().compose_window(drawable).await;
        }
    }
}

async fn send_length_error(server: &Server, client: ClientId, sequence: SequenceNumber, opcode: u8) {
    send_error(server, client, &XError::length(), sequence, 0, opcode).await;
}

async fn send_error(
    server: &Server,
    client_id: ClientId,
    error: &XError,
    sequence: SequenceNumber,
    minor: u16,
    major: u8,
) {
    let state = server.state().lock().await;
    if let Some(client) = state.client(client_id) {
        client.send(error.encode(client.byte_order, sequence, minor, major));
    }
}
