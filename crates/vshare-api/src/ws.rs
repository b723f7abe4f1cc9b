//! WebSocket notification endpoint.
//!
//! Clients connect to `/ws/events`, authenticate with their session token
//! as the first message, and then receive the events published to their
//! identity's channel (upload acks, sensitivity check lifecycle).

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use vshare_models::UserId;

use crate::state::AppState;

/// Bounded send buffer; when the client cannot keep up we block instead of
/// growing without bound.
const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const WS_AUTH_TIMEOUT: Duration = Duration::from_secs(60);

/// First message a client sends after connecting.
#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    token: String,
}

#[derive(serde::Serialize)]
struct WsError<'a> {
    error: &'a str,
}

/// WebSocket events endpoint.
pub async fn ws_events(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_events_socket(socket, state))
}

async fn send_json<T: serde::Serialize>(tx: &mpsc::Sender<Message>, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => tx.send(Message::Text(json)).await.is_ok(),
        Err(_) => false,
    }
}

async fn handle_events_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, mut receiver) = socket.split();

    // Bounded channel between the forwarding logic and the socket writer.
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);
    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // The client authenticates with its first message.
    let request: SubscribeRequest =
        match tokio::time::timeout(WS_AUTH_TIMEOUT, receiver.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str(&text) {
                Ok(req) => req,
                Err(e) => {
                    let _ = send_json(&tx, &WsError {
                        error: &format!("Invalid subscribe request: {}", e),
                    })
                    .await;
                    drop(tx);
                    let _ = send_task.await;
                    return;
                }
            },
            _ => {
                let _ = send_json(&tx, &WsError {
                    error: "Expected a JSON subscribe message",
                })
                .await;
                drop(tx);
                let _ = send_task.await;
                return;
            }
        };

    let claims = match state.auth.verify(&request.token) {
        Ok(c) => c,
        Err(_) => {
            let _ = send_json(&tx, &WsError {
                error: "Authentication failed",
            })
            .await;
            drop(tx);
            let _ = send_task.await;
            return;
        }
    };

    let identity = UserId::from(claims.sub.as_str());
    info!(identity = %identity, "WebSocket event subscription started");

    let mut events = match state.events.subscribe(&identity).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(identity = %identity, "Failed to subscribe to event channel: {}", e);
            let _ = send_json(&tx, &WsError {
                error: "Subscription unavailable",
            })
            .await;
            drop(tx);
            let _ = send_task.await;
            return;
        }
    };

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick is immediate

    loop {
        tokio::select! {
            event = events.next() => {
                match event {
                    Some(message) => {
                        if !send_json(&tx, &message.event).await {
                            break;
                        }
                    }
                    None => {
                        debug!(identity = %identity, "Event stream closed");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    // Pongs and stray client messages are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
    info!(identity = %identity, "WebSocket event subscription closed");
}
