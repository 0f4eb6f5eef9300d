use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{EVENT_TIMEOUT_MS, SILENCE_MS, TestClient, TestServer};

#[tokio::test]
async fn test_three_peers_fan_out() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");

    let mut client1 = TestClient::connect(&server.url).await.expect("Connect failed");
    let mut client2 = TestClient::connect(&server.url).await.expect("Connect failed");
    let mut client3 = TestClient::connect(&server.url).await.expect("Connect failed");
    let mut outsider = TestClient::connect(&server.url).await.expect("Connect failed");

    for client in [&mut client1, &mut client2, &mut client3] {
        client.join("x").await.expect("Join failed");
    }
    outsider.join("X").await.expect("Join failed");

    let call = json!({"session": "6a0f3c0e-3f57-4b59-9a4c-3f0c1f8f3b10", "isCaller": true});
    let result = client1
        .invoke("CallAction", vec![json!("x"), call.clone()])
        .await
        .expect("Invoke failed");
    assert_eq!(result, Ok(json!(2)));

    for (client, name) in [(&mut client2, "2"), (&mut client3, "3")] {
        let (method, args) = client
            .next_event(EVENT_TIMEOUT_MS)
            .await
            .unwrap_or_else(|_| panic!("Client {} missed the call", name));
        assert_eq!(method, "OnCallAction");
        assert_eq!(args, vec![json!("x"), call.clone()]);
    }

    assert!(client1.expect_silence(SILENCE_MS).await);
    assert!(
        outsider.expect_silence(SILENCE_MS).await,
        "Room names are case-sensitive"
    );
}
