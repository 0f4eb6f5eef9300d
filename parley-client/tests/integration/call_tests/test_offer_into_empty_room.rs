use parley_client::{CallConfig, LegPhase};
use parley_server::Hub;
use serde_json::json;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{participant, wait_for_snapshot};

#[tokio::test]
async fn test_offer_into_empty_room() {
    init_tracing();

    let hub = Hub::default();
    let solo = participant(&hub, "lonely", CallConfig::default())
        .await
        .expect("Failed to join");

    let session = solo.call.call().await.expect("Call failed");
    wait_for_snapshot(&solo.call, |s| s.local == Some((session, LegPhase::Negotiating)))
        .await
        .expect("Leg never reached negotiation");

    // Nobody answers, so the leg stays put.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = solo.call.snapshot().await.expect("Snapshot failed");
    assert_eq!(snapshot.local, Some((session, LegPhase::Negotiating)));
    assert!(snapshot.remotes.is_empty());
    assert_eq!(solo.transports.sent("CreatedOffer").len(), 1);

    // The relay absorbs messages into a room with no one else in it.
    let delivered = solo
        .connection
        .invoke("CreatedOffer", vec![json!("lonely"), json!({"sdp": "v=0"})])
        .await
        .expect("Relay failed");
    assert_eq!(delivered, json!(0));
}
