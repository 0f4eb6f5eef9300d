use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{EVENT_TIMEOUT_MS, TestClient, TestServer};

const MESSAGE_COUNT: usize = 100;

#[tokio::test]
async fn test_rapid_relay_preserves_order() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut sender = TestClient::connect(&server.url).await.expect("Connect failed");
    let mut receiver = TestClient::connect(&server.url).await.expect("Connect failed");

    sender.join("x").await.expect("Join failed");
    receiver.join("x").await.expect("Join failed");

    for n in 0..MESSAGE_COUNT {
        let payload = json!({
            "type": "offer",
            "session": "6a0f3c0e-3f57-4b59-9a4c-3f0c1f8f3b10",
            "iceCandidate": {"candidate": format!("candidate:{}", n)}
        });
        sender
            .invoke("IceCandidate", vec![json!("x"), payload])
            .await
            .expect("Invoke failed")
            .expect("Relay rejected");
    }

    for n in 0..MESSAGE_COUNT {
        let (method, args) = receiver
            .next_event(EVENT_TIMEOUT_MS)
            .await
            .unwrap_or_else(|_| panic!("Missing candidate {}", n));
        assert_eq!(method, "OnIceCandidate");
        assert_eq!(
            args[1]["iceCandidate"]["candidate"],
            json!(format!("candidate:{}", n))
        );
    }
}
