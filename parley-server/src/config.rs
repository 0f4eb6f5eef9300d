use std::net::SocketAddr;

/// Settings for the relay's HTTP listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Route the hub socket is mounted on.
    pub hub_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            hub_path: "/hub".to_owned(),
        }
    }
}
