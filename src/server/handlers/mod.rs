//! Request handlers
//!
//! One module per functional family, mirroring the opcode groups. Every
//! handler validates its arguments in protocol order and returns either
//! an optional reply or the first failing check's typed error; on error
//! nothing has been mutated.

pub mod atoms_props;
pub mod colormap;
pub mod cursor;
pub mod drawing;
pub mod font_text;
pub mod gc;
pub mod grabs;
pub mod input;
pub mod misc;
pub mod selection;
pub mod window;
pub mod xinput;

use crate::protocol::error::XError;
use crate::protocol::replies::Reply;
use crate::protocol::types::*;
use crate::server::state::ServerState;

pub type HandlerResult = Result<Option<Reply>, XError>;

/// IDChoice validation shared by every resource-creating request: the
/// ID must fall in the client's issued range and be unused.
pub fn check_id_choice(state: &ServerState, client: ClientId, id: XId) -> Result<(), XError> {
    let owns = state
        .client(client)
        .is_some_and(|c| c.owns_id(id));
    if !owns || !state.registry.id_available(id) {
        return Err(XError::id_choice(id));
    }
    Ok(())
}
