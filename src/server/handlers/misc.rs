//! Extension queries, access control and housekeeping handlers

use tracing::info;

use crate::protocol::error::XError;
use crate::protocol::opcodes::extension;
use crate::protocol::replies::Reply;
use crate::protocol::setup::MAXIMUM_REQUEST_LENGTH;
use crate::protocol::types::*;
use crate::server::state::ServerState;

use super::HandlerResult;

/// Big-Requests raises the cap to this many 4-byte units.
pub const BIG_REQUEST_MAXIMUM_LENGTH: u32 = 0x003f_ffff;

pub fn query_extension(name: &str) -> HandlerResult {
    let reply = match name {
        extension::BIG_REQUESTS_NAME => Reply::QueryExtension {
            present: true,
            major_opcode: extension::BIG_REQUESTS,
            first_event: 0,
            first_error: 0,
        },
        extension::XINPUT_NAME => Reply::QueryExtension {
            present: true,
            major_opcode: extension::XINPUT,
            first_event: extension::XINPUT_EVENT_BASE,
            first_error: extension::XINPUT_ERROR_BASE,
        },
        _ => Reply::QueryExtension {
            present: false,
            major_opcode: 0,
            first_event: 0,
            first_error: 0,
        },
    };
    Ok(Some(reply))
}

pub fn list_extensions() -> HandlerResult {
    Ok(Some(Reply::ListExtensions {
        names: vec![
            extension::BIG_REQUESTS_NAME.to_string(),
            extension::XINPUT_NAME.to_string(),
        ],
    }))
}

pub fn big_req_enable(state: &mut ServerState, client: ClientId) -> HandlerResult {
    if let Some(session) = state.client_mut(client) {
        session.big_requests = true;
    }
    Ok(Some(Reply::BigReqEnable {
        maximum_request_length: BIG_REQUEST_MAXIMUM_LENGTH.max(MAXIMUM_REQUEST_LENGTH as u32),
    }))
}

/// The host list is fixed and empty; the transport is the access
/// boundary for this server.
pub fn change_hosts(insert: bool, family: u8, address: &[u8]) -> HandlerResult {
    if family > 2 && family != 5 && family != 6 {
        return Err(XError::value(family as u32));
    }
    let _ = (insert, address);
    Ok(None)
}

pub fn list_hosts() -> HandlerResult {
    Ok(Some(Reply::ListHosts { enabled: false }))
}

pub fn set_access_control(enabled: bool) -> HandlerResult {
    let _ = enabled;
    Ok(None)
}

pub fn set_close_down_mode(
    state: &mut ServerState,
    client: ClientId,
    mode: CloseDownMode,
) -> HandlerResult {
    if let Some(session) = state.client_mut(client) {
        session.close_down = mode;
    }
    Ok(None)
}

/// KillClient: a resource names its owning client, which is torn down;
/// AllTemporary (0) reaps retained-temporary resources instead. Window
/// destruction from the reap is returned for frontend notification.
pub fn kill_client(state: &mut ServerState, resource: XId) -> Result<Vec<WindowId>, XError> {
    if resource == NONE {
        return Ok(state.kill_temporary_retained());
    }
    // the argument may be any resource, or simply a client's ID base
    let target = state
        .clients
        .values()
        .find(|c| c.owns_id(resource))
        .map(|c| (c.id, c.kill.clone()));
    match target {
        Some((id, kill)) => {
            info!("Client {} killed via resource {:#x}", id, resource);
            kill.cancel();
            Ok(Vec::new())
        }
        None => {
            // killing a retained zombie's resource releases it all now
            let zombie = state.retained.keys().copied().find(|&id| {
                let base = id << crate::server::state::RESOURCE_ID_BITS;
                resource & !crate::server::state::RESOURCE_ID_MASK == base
            });
            let Some(owner) = zombie else {
                return Err(XError::value(resource));
            };
            let mut destroyed = Vec::new();
            for toplevel in state.registry.toplevel_windows_of(owner) {
                for dead in state.destroy_window_subtree(toplevel) {
                    destroyed.push(dead.id);
                }
            }
            state.registry.free_client_resources(owner);
            state.retained.remove(&owner);
            Ok(destroyed)
        }
    }
}

pub fn no_operation() -> HandlerResult {
    Ok(None)
}
