use parley_client::{CallConfig, CallEvent, ClientError, LegPhase, LegRole};
use parley_core::RoomName;
use parley_server::Hub;
use std::collections::HashSet;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{EVENT_TIMEOUT_MS, participant, wait_for_snapshot, wait_until};

#[tokio::test]
async fn test_leaver_hangup_closes_both_legs() {
    init_tracing();

    let hub = Hub::default();
    let a = participant(&hub, "y", CallConfig::default())
        .await
        .expect("A failed to join");
    let b = participant(&hub, "y", CallConfig::default())
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

    let mut b_events = b.call.events();
    a.call.leave().await.expect("Leave failed");

    let snapshot = wait_for_snapshot(&b.call, |s| s.local.is_none() && s.remotes.is_empty())
        .await
        .expect("B kept legs after A left");
    assert!(snapshot.remote_streams.is_empty());

    let remote = b
        .peers
        .find(a_session, LegRole::Remote)
        .expect("No leg for A's session");
    assert!(remote.log().closed);
    let local = b
        .peers
        .find(b_session, LegRole::Local)
        .expect("No leg for B's session");
    assert!(local.log().closed);

    let mut closed = HashSet::new();
    while closed.len() < 2 {
        let event = tokio::time::timeout(Duration::from_millis(EVENT_TIMEOUT_MS), b_events.recv())
            .await
            .expect("Timeout waiting for leg closures")
            .expect("Event stream ended");
        if let CallEvent::LegClosed { session, role } = event {
            closed.insert((session, role));
        }
    }
    assert!(closed.contains(&(a_session, LegRole::Remote)));
    assert!(closed.contains(&(b_session, LegRole::Local)));

    assert!(matches!(
        a.call.snapshot().await,
        Err(ClientError::SessionClosed)
    ));

    // The group leave goes out after the hangup.
    let room = RoomName::new("y").expect("Invalid room");
    let b_id = b.connection.connection_id().expect("B has no connection id");
    wait_until("A to leave the group", || hub.router().members(&room) == vec![b_id])
        .await
        .expect("A is still a member");
}
