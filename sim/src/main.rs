use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use sim::{serve, SimConfig, PORT_ENV};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = SimConfig::default();
    if let Ok(port) = std::env::var(PORT_ENV) {
        config.port = port
            .trim()
            .parse()
            .map_err(|_| format!("invalid value for {}: {}", PORT_ENV, port))?;
    }

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("simulated proxy listening on {}", listener.local_addr()?);
    serve(listener, config, Arc::new(AtomicUsize::new(0))).await;
    Ok(())
}
