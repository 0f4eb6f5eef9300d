use parley_client::{CallConfig, LegPhase, LegRole};
use parley_core::SessionDescription;
use parley_server::Hub;

use crate::integration::init_tracing;
use crate::utils::{participant, wait_for_snapshot, wait_until};

#[tokio::test]
async fn test_three_party_answer_routing() {
    init_tracing();

    let hub = Hub::default();
    let a = participant(&hub, "x", CallConfig::default())
        .await
        .expect("A failed to join");
    let b = participant(&hub, "x", CallConfig::default())
        .await
        .expect("B failed to join");
    let c = participant(&hub, "x", CallConfig::default())
        .await
        .expect("C failed to join");

    let session = a.call.call().await.expect("Call failed");

    wait_for_snapshot(&a.call, |s| s.local == Some((session, LegPhase::Active)))
        .await
        .expect("Caller leg never became active");

    for callee in [&b, &c] {
        let snapshot =
            wait_for_snapshot(&callee.call, |s| s.remote_phase(session) == Some(LegPhase::Active))
                .await
                .expect("Callee leg never became active");
        assert_eq!(snapshot.remotes.len(), 1, "One remote leg per callee");
        assert!(snapshot.local.is_none(), "Callees never open a local leg");
        assert!(callee.peers.peers(LegRole::Local).is_empty());
        assert_eq!(callee.peers.peers(LegRole::Remote).len(), 1);

        let leg = callee
            .peers
            .find(session, LegRole::Remote)
            .expect("No remote peer for the session");
        let log = leg.log();
        assert_eq!(
            log.remote,
            vec![SessionDescription::offer(format!("v=0 offer {}", session))],
            "A callee applies the offer and nothing else"
        );
        assert_eq!(
            log.local,
            vec![SessionDescription::answer(format!("v=0 answer {}", session))]
        );
    }

    // Each callee sends its candidate after its answer, so once both
    // candidates are in, both answers have been seen by the caller.
    let local = a
        .peers
        .find(session, LegRole::Local)
        .expect("No local peer on the caller");
    wait_until("both answer candidates", || local.log().candidates.len() == 2)
        .await
        .expect("Caller never got both candidates");
    assert_eq!(
        local.log().remote.len(),
        1,
        "Only the first answer is applied to the caller leg"
    );

    // Answer-side candidates from the other callee have no leg to land on.
    for callee in [&b, &c] {
        let leg = callee
            .peers
            .find(session, LegRole::Remote)
            .expect("No remote peer for the session");
        wait_until("the caller's candidate", || !leg.log().candidates.is_empty())
            .await
            .expect("Callee never got the caller's candidate");
        assert_eq!(leg.log().candidates.len(), 1);
        assert!(leg.log().candidates[0].candidate.starts_with("candidate:Local"));
    }
}
