use std::net::SocketAddr;
use std::sync::Arc;

use konnekt_match::config::Config;
use konnekt_match::server::telemetry::{init_telemetry, shutdown_telemetry};
use konnekt_match::server::{create_router, ConnectionHandler, MemoryStorage};
use tracing::{error, info};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_telemetry(&config)?;

    let connection_handler = ConnectionHandler::new(config.router, Arc::new(MemoryStorage::new()));
    let app = create_router(connection_handler, config.index_path.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, router = ?config.router, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_telemetry(&config);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
