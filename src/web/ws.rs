//! WebSocket notification endpoint.
//!
//! Forwards event-bus traffic to connected clients as JSON. Best-effort by
//! design: a slow or lagged client gets dropped, and nothing here can fail a
//! state transition back in the service.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::server::AppState;

/// Live connection counts, per room filter and overall.
pub struct WsRegistry {
    per_room: DashMap<i64, usize>,
    total: AtomicUsize,
}

impl WsRegistry {
    pub fn new() -> Self {
        Self {
            per_room: DashMap::new(),
            total: AtomicUsize::new(0),
        }
    }

    fn connect(&self, room_id: Option<i64>) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if let Some(id) = room_id {
            *self.per_room.entry(id).or_insert(0) += 1;
        }
    }

    fn disconnect(&self, room_id: Option<i64>) {
        self.total.fetch_sub(1, Ordering::Relaxed);
        if let Some(id) = room_id {
            if let Some(mut count) = self.per_room.get_mut(&id) {
                *count = count.saturating_sub(1);
            }
        }
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn room_connections(&self, room_id: i64) -> usize {
        self.per_room.get(&room_id).map(|c| *c).unwrap_or(0)
    }
}

impl Default for WsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Only forward events for this room when set.
    pub room_id: Option<i64>,
}

/// GET /ws — upgrade and stream room events.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.room_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, room_filter: Option<i64>) {
    state.ws_registry.connect(room_filter);
    debug!(?room_filter, "websocket client connected");

    let mut events = state.bus.subscribe();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if let Some(room_id) = room_filter {
                            if event.room_id() != room_id {
                                continue;
                            }
                        }
                        let payload = match serde_json::to_string(&event) {
                            Ok(p) => p,
                            Err(e) => {
                                warn!(error = %e, "failed to serialize event, skipping");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "websocket client lagged behind event bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            msg = receiver.next() => {
                // Clients only listen; any close or error ends the session
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    state.ws_registry.disconnect(room_filter);
    debug!(?room_filter, "websocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_connections_per_room() {
        let registry = WsRegistry::new();
        registry.connect(Some(1));
        registry.connect(Some(1));
        registry.connect(None);
        assert_eq!(registry.total(), 3);
        assert_eq!(registry.room_connections(1), 2);
        assert_eq!(registry.room_connections(2), 0);

        registry.disconnect(Some(1));
        assert_eq!(registry.total(), 2);
        assert_eq!(registry.room_connections(1), 1);
    }
}
