use crate::signaling::Hub;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use parley_core::{ConnectionId, ServerFrame};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Upgrades `GET /hub` to a hub socket. The connection id is assigned here
/// and announced to the client in a `Welcome` frame.
pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Hub>) -> impl IntoResponse {
    let connection_id = ConnectionId::new();

    ws.on_upgrade(move |socket| handle_socket(socket, connection_id, hub))
}

async fn handle_socket(socket: WebSocket, connection_id: ConnectionId, hub: Hub) {
    info!("New WebSocket connection: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let _ = tx.send(ServerFrame::Welcome { connection_id });
    hub.router().register(connection_id, tx.clone());

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let hub = hub.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        let Some(reply) = hub.handle_text(connection_id, text.as_str()) else {
                            continue;
                        };
                        if tx.send(reply).is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    hub.router().disconnect(&connection_id);
    info!("WebSocket disconnected: {}", connection_id);
}
