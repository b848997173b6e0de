//! # remotex - an in-process X Window System server core
//!
//! remotex implements the X11 core wire protocol (plus the Big-Requests
//! extension and a subset of XInput) as a library. It is designed to sit
//! behind any byte-oriented transport: a TCP socket, a forwarded SSH
//! channel, or an in-memory pipe in tests. Pixel operations, font
//! metrics, cursors and the clipboard are delegated to a [`frontend::Frontend`]
//! capability bundle supplied by the embedding application.
//!
//! ## Architecture
//!
//! - [`protocol`] - wire codec: requests, replies, events, errors, setup
//! - [`resources`] - resource registry (windows, GCs, pixmaps, colormaps, atoms)
//! - [`input`] - event router, grab manager, device state
//! - [`server`] - connection lifecycle, request dispatch, shared state
//! - [`frontend`] - the rendering/IO capability surface
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use remotex::{config::ServerConfig, frontend::HeadlessFrontend, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(ServerConfig::default(), Arc::new(HeadlessFrontend::new()));
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:6000").await?;
//!     loop {
//!         let (stream, _) = listener.accept().await?;
//!         let server = server.clone();
//!         tokio::spawn(async move { server.serve_connection(stream).await });
//!     }
//! }
//! ```

pub mod config;
pub mod frontend;
pub mod input;
pub mod logging;
pub mod protocol;
pub mod resources;
pub mod server;

pub use config::ServerConfig;
pub use frontend::{Frontend, HeadlessFrontend};
pub use server::Server;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the remotex library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection setup error: {0}")]
    Setup(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Frontend error: {0}")]
    Frontend(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
