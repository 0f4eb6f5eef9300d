//! Signaling relay: rooms, hub dispatch and the WebSocket endpoint.

mod config;
mod room;
mod signaling;

pub use config::ServerConfig;
pub use room::*;
pub use signaling::*;

use axum::Router;
use axum::routing::get;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Builds the axum application serving `hub` under `config.hub_path`.
pub fn app(hub: Hub, config: &ServerConfig) -> Router {
    Router::new()
        .route(&config.hub_path, get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(hub)
}

/// Serves the relay on an already bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    hub: Hub,
    config: &ServerConfig,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(
        "Signaling relay listening on http://{}{}",
        listener.local_addr()?,
        config.hub_path
    );
    axum::serve(listener, app(hub, config))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Binds `config.addr` and serves the relay forever.
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.addr).await?;
    serve_with_shutdown(listener, Hub::default(), &config, std::future::pending()).await
}
