use parley_client::{CallConfig, LegPhase, LegRole};
use parley_server::Hub;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{participant, wait_for_snapshot};

#[tokio::test]
async fn test_non_leaver_hangup_keeps_local_leg() {
    init_tracing();

    let hub = Hub::default();
    let a = participant(&hub, "h", CallConfig::default())
        .await
        .expect("A failed to join");
    let b = participant(&hub, "h", CallConfig::default())
        .await
        .expect("B failed to join");

    let a_session = a.call.call().await.expect("A's call failed");
    wait_for_snapshot(&b.call, |s| s.remote_phase(a_session) == Some(LegPhase::Active))
        .await
        .expect("B never accepted A's call");

    let b_session = b.call.call().await.expect("B's call failed");
    wait_for_snapshot(&a.call, |s| s.remote_phase(b_session) == Some(LegPhase::Active))
        .await
        .expect("A never accepted B's call");
    wait_for_snapshot(&b.call, |s| s.local == Some((b_session, LegPhase::Active)))
        .await
        .expect("B's own leg never became active");

    a.call.hangup(false).await.expect("Hangup failed");

    let snapshot = wait_for_snapshot(&b.call, |s| s.remote_phase(a_session).is_none())
        .await
        .expect("B kept the leg for A's call");
    assert_eq!(snapshot.local, Some((b_session, LegPhase::Active)));
    assert!(snapshot.remotes.is_empty());

    let remote = b
        .peers
        .find(a_session, LegRole::Remote)
        .expect("No leg for A's session");
    assert!(remote.log().closed);
    let local = b
        .peers
        .find(b_session, LegRole::Local)
        .expect("No leg for B's session");
    assert!(!local.log().closed);

    // A keeps answering B's call.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = a.call.snapshot().await.expect("Snapshot failed");
    assert!(snapshot.local.is_none());
    assert_eq!(snapshot.remote_phase(b_session), Some(LegPhase::Active));
}
