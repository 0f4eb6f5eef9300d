use parley_client::ClientError;
use parley_server::Hub;

use crate::integration::init_tracing;
use crate::utils::connection;

#[tokio::test]
async fn test_unsubscribe_in_use() {
    init_tracing();

    let hub = Hub::default();
    let (connection, _) = connection(&hub);

    let first = connection.subscribe("OnHangupAction");
    let second = connection.subscribe("OnHangupAction");

    match connection.unsubscribe("OnHangupAction") {
        Err(ClientError::StillInUse(name)) => assert_eq!(name, "OnHangupAction"),
        other => panic!("Expected StillInUse, got {:?}", other),
    }

    drop(first);
    connection
        .unsubscribe("OnHangupAction")
        .expect_err("One observer is still attached");

    drop(second);
    connection
        .unsubscribe("OnHangupAction")
        .expect("Unsubscribe should succeed once unused");
}
