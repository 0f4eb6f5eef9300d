use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{EVENT_TIMEOUT_MS, SILENCE_MS, TestClient, TestServer};

#[tokio::test]
async fn test_heartbeat_replies_to_self() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut pinger = TestClient::connect(&server.url).await.expect("Connect failed");
    let mut roommate = TestClient::connect(&server.url).await.expect("Connect failed");

    pinger.join("x").await.expect("Join failed");
    roommate.join("x").await.expect("Join failed");

    let result = pinger
        .invoke("HeartBeat", vec![])
        .await
        .expect("Invoke failed");
    assert_eq!(result, Ok(json!(null)));

    let (method, args) = pinger
        .next_event(EVENT_TIMEOUT_MS)
        .await
        .expect("No heartbeat reply");
    assert_eq!(method, "HeartBeat");
    assert_eq!(args, vec![json!("I'm alive")]);

    assert!(
        roommate.expect_silence(SILENCE_MS).await,
        "Heartbeat must never be broadcast"
    );
}
