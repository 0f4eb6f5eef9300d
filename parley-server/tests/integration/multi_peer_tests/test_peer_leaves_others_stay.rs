use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{EVENT_TIMEOUT_MS, SILENCE_MS, TestClient, TestServer};

#[tokio::test]
async fn test_peer_leaves_others_stay() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");

    let mut client1 = TestClient::connect(&server.url).await.expect("Connect failed");
    let mut client2 = TestClient::connect(&server.url).await.expect("Connect failed");
    let mut client3 = TestClient::connect(&server.url).await.expect("Connect failed");

    for client in [&mut client1, &mut client2, &mut client3] {
        client.join("x").await.expect("Join failed");
    }

    client2.leave("x").await.expect("Leave failed");

    let hangup = json!({"isLeaver": true});
    let result = client1
        .invoke("HangupAction", vec![json!("x"), hangup.clone()])
        .await
        .expect("Invoke failed");
    assert_eq!(result, Ok(json!(1)));

    let (method, args) = client3
        .next_event(EVENT_TIMEOUT_MS)
        .await
        .expect("Client 3 missed the hangup");
    assert_eq!(method, "OnHangupAction");
    assert_eq!(args[1], hangup);

    assert!(
        client2.expect_silence(SILENCE_MS).await,
        "A peer that left must not receive relays"
    );
}
