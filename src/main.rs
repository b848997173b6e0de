use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use remotex::{
    config::load_config,
    frontend::HeadlessFrontend,
    logging::init_logging,
    server::Server,
};

#[derive(Parser, Debug)]
#[command(name = "remotex", about = "In-process X11 display server core")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address, overrides the configuration
    #[arg(short, long)]
    listen: Option<String>,

    /// Display number; shorthand for listening on 127.0.0.1:(6000 + N)
    #[arg(short, long)]
    display: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(display) = args.display {
        config.listen = format!("127.0.0.1:{}", 6000 + display);
    }
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let listen = config.listen.clone();
    let server = Server::new(config, Arc::new(HeadlessFrontend::new()));

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    info!("Listening on {}", listen);

    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        info!("Accepted connection from {}", peer);
        let server = server.clone();
        tokio::spawn(async move {
            if let Err(e) = server.serve_connection(stream).await {
                warn!("Connection from {} ended with error: {}", peer, e);
            }
        });
    }
}
