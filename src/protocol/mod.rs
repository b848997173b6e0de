//! X11 wire protocol implementation
//!
//! Bit-exact encode/decode of the X11 core protocol: connection setup,
//! request parsing, reply/event/error serialization. Everything here is
//! pure data transformation; no server state is touched.

pub mod error;
pub mod events;
pub mod opcodes;
pub mod replies;
pub mod requests;
pub mod setup;
pub mod types;
pub mod wire;
pub mod xinput;

pub use error::{ErrorKind, XError};
pub use events::Event;
pub use replies::Reply;
pub use requests::{ParseError, Request, RequestHeader};
pub use types::*;
