use std::time::Duration;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use board_common::OrderKey;
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error};

use super::models::{Issue, IssueColumn};

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── WebSocket message types ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    IssueCreated {
        issue: Issue,
    },
    IssueMoved {
        issue_id: i64,
        from_column: IssueColumn,
        to_column: IssueColumn,
        order_key: OrderKey,
    },
    IssueDeleted {
        issue_id: i64,
    },
    ColumnRebalanced {
        project_id: i64,
        column: IssueColumn,
        issues: Vec<Issue>,
    },
}

// ── WebSocket handler ────────────────────────────────────────────────

/// Upgrade and stream every broadcast board event to the client.
pub async fn ws_handler(ws: WebSocketUpgrade, tx: broadcast::Sender<String>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, tx))
}

async fn handle_socket(socket: WebSocket, tx: broadcast::Sender<String>) {
    let (sender, receiver) = socket.split();
    let rx = tx.subscribe();
    debug!("websocket client connected");
    run_socket_loop(sender, receiver, rx).await;
    debug!("websocket client disconnected");
}

/// Ping/Pong bookkeeping for one connection.
#[derive(Debug)]
struct KeepAlive {
    last_pong: Instant,
    awaiting_pong: bool,
    timeout: Duration,
}

impl KeepAlive {
    fn new(now: Instant, timeout: Duration) -> Self {
        Self {
            last_pong: now,
            awaiting_pong: false,
            timeout,
        }
    }

    /// Called on every ping tick. Returns false once an outstanding Ping has
    /// gone unanswered for longer than the timeout; otherwise a Ping is due.
    fn on_tick(&mut self, now: Instant) -> bool {
        if self.awaiting_pong && now.duration_since(self.last_pong) > self.timeout {
            return false;
        }
        self.awaiting_pong = true;
        true
    }

    fn on_pong(&mut self, now: Instant) {
        self.last_pong = now;
        self.awaiting_pong = false;
    }
}

/// What the loop does with a frame read from the client.
enum ClientFrame {
    Pong,
    Ignore,
    Disconnect,
}

fn classify(frame: Option<Result<Message, axum::Error>>) -> ClientFrame {
    match frame {
        Some(Ok(Message::Pong(_))) => ClientFrame::Pong,
        Some(Ok(Message::Close(_))) | None => ClientFrame::Disconnect,
        Some(Ok(_)) => ClientFrame::Ignore,
        Some(Err(e)) => {
            debug!(error = %e, "websocket read failed");
            ClientFrame::Disconnect
        }
    }
}

/// Relay board events to one client until it disconnects, stops answering
/// pings, or the broadcast channel closes.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut events: broadcast::Receiver<String>,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await;
    let mut keepalive = KeepAlive::new(Instant::now(), PONG_TIMEOUT);

    loop {
        let delivered = tokio::select! {
            _ = ping_interval.tick() => {
                if !keepalive.on_tick(Instant::now()) {
                    debug!("websocket client missed pong, closing");
                    break;
                }
                sender.send(Message::Ping(Vec::new().into())).await.is_ok()
            }

            event = events.recv() => match event {
                Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "websocket client lagged behind broadcasts");
                    true
                }
                Err(broadcast::error::RecvError::Closed) => false,
            },

            frame = receiver.next() => match classify(frame) {
                ClientFrame::Pong => {
                    keepalive.on_pong(Instant::now());
                    true
                }
                ClientFrame::Ignore => true,
                ClientFrame::Disconnect => false,
            },
        };
        if !delivered {
            break;
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

// ── Broadcast helper ─────────────────────────────────────────────────

/// Serialize and broadcast a WsMessage to all connected WebSocket clients.
/// Returns silently even if no clients are connected.
pub fn broadcast_message(tx: &broadcast::Sender<String>, msg: &WsMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => {
            error!(error = %e, "failed to serialize WsMessage");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
