use parley_client::{ClientError, ConnectState, ConnectionConfig, ConnectionManager, TransportError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::SilentFactory;

#[tokio::test(start_paused = true)]
async fn test_silent_hub_forces_reconnect() {
    init_tracing();

    let transports = SilentFactory::default();
    let connection = ConnectionManager::new(
        Arc::new(transports.clone()),
        ConnectionConfig::default(),
    );
    connection.start();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(connection.state(), ConnectState::Connected);

    let stuck = tokio::spawn({
        let connection = connection.clone();
        async move { connection.invoke("JoinGroup", vec![json!("x")]).await }
    });

    // The first heartbeat goes out at 30 s and gets no answer.
    tokio::time::sleep(Duration::from_secs(58)).await;
    assert_eq!(transports.created().len(), 1);
    assert!(!stuck.is_finished());

    // One interval later it is given up on and the transport rebuilt.
    tokio::time::sleep(Duration::from_secs(2)).await;
    let created = transports.created();
    assert_eq!(created.len(), 2);
    assert!(!created[0].is_open());
    assert!(created[1].is_open());
    assert_eq!(connection.state(), ConnectState::Connected);

    let result = stuck.await.expect("Invoke task panicked");
    assert!(
        matches!(result, Err(ClientError::Transport(TransportError::Closed))),
        "Invocation on the dropped transport should fail, got {:?}",
        result
    );
}
