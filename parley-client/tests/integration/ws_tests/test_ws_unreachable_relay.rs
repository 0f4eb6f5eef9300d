use parley_client::{ConnectState, ConnectionConfig, ConnectionManager, WsTransportFactory};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::integration::init_tracing;
use crate::utils::wait_for_state;

#[tokio::test]
async fn test_ws_unreachable_relay() {
    init_tracing();

    // Grab a free port, then release it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);

    let connection = ConnectionManager::new(
        Arc::new(WsTransportFactory::new(format!("ws://{}/hub", addr))),
        ConnectionConfig::default(),
    );
    let mut states = connection.connect();
    states
        .wait_for(|s| *s == ConnectState::Connecting)
        .await
        .expect("State channel closed");
    wait_for_state(&connection, ConnectState::Disconnected)
        .await
        .expect("Failed open never settled");
    assert!(connection.connection_id().is_none());
}
