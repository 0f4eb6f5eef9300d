use parley_client::ConnectState;
use parley_server::Hub;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::connection;

#[tokio::test(start_paused = true)]
async fn test_stale_heartbeat_reconnects_once() {
    init_tracing();

    let hub = Hub::default();
    let (connection, transports) = connection(&hub);
    transports.set_available(false);
    connection.start();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(connection.state(), ConnectState::Disconnected);
    assert_eq!(transports.created(), 1);

    // One rebuild per stale interval, never more.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transports.created(), 2);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transports.created(), 3);

    transports.set_available(true);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transports.created(), 4);
    assert_eq!(connection.state(), ConnectState::Connected);

    // Healthy heartbeats leave the transport alone.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transports.created(), 4);
    assert_eq!(hub.router().connection_count(), 1);
    assert!(connection.last_update().is_some(), "Heartbeat replies count as updates");
}
