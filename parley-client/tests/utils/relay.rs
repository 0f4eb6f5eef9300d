use anyhow::Result;
use parley_server::{Hub, ServerConfig, serve_with_shutdown};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Real relay on an ephemeral local port, shut down on drop.
pub struct TestRelay {
    pub url: String,
    pub hub: Hub,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestRelay {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let config = ServerConfig {
            addr,
            ..ServerConfig::default()
        };
        let hub = Hub::default();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn({
            let hub = hub.clone();
            async move {
                let shutdown = async move {
                    let _ = shutdown_rx.await;
                };
                if let Err(e) = serve_with_shutdown(listener, hub, &config, shutdown).await {
                    tracing::error!("[TestRelay] Serve failed: {}", e);
                }
            }
        });

        Ok(Self {
            url: format!("ws://{}{}", addr, ServerConfig::default().hub_path),
            hub,
            shutdown: Some(shutdown_tx),
        })
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
