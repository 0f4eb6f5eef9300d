use parley_client::ConnectState;
use parley_server::Hub;
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::connection;

#[tokio::test]
async fn test_concurrent_invokes_coalesce() {
    init_tracing();

    let hub = Hub::default();
    let (connection, transports) = connection(&hub);
    assert_eq!(connection.state(), ConnectState::Disconnected);

    let (first, second) = tokio::join!(
        connection.invoke("JoinGroup", vec![json!("x")]),
        connection.invoke("JoinGroup", vec![json!("x")]),
    );
    assert_eq!(first.expect("First invoke failed"), json!(null));
    assert_eq!(second.expect("Second invoke failed"), json!(null));

    assert_eq!(
        transports.sent("JoinGroup").len(),
        1,
        "Overlapping identical invocations must reach the hub once"
    );
    assert_eq!(connection.state(), ConnectState::Connected);

    // The key was evicted when the first one went out.
    connection
        .invoke("JoinGroup", vec![json!("x")])
        .await
        .expect("Third invoke failed");
    assert_eq!(transports.sent("JoinGroup").len(), 2);

    // Different arguments are a different invocation.
    let (x, y) = tokio::join!(
        connection.invoke("LeaveGroup", vec![json!("x")]),
        connection.invoke("LeaveGroup", vec![json!("y")]),
    );
    x.expect("Leave x failed");
    y.expect("Leave y failed");
    assert_eq!(transports.sent("LeaveGroup").len(), 2);
}
