//! Internal event broadcast — tokio::broadcast channel for push notifications.
//!
//! Publishing is fire-and-forget: a full or subscriber-less channel never
//! fails the state transition that produced the event.

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;

/// Room lifecycle events pushed to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomEvent {
    RoomCreated {
        room_id: i64,
        creator_id: i64,
        title: String,
    },
    PlayerJoined {
        room_id: i64,
        user_id: i64,
        player_count: i64,
        max_players: i32,
    },
    /// Room filled; everyone must agree before the start window opens.
    AgreementPhase {
        room_id: i64,
    },
    PlayerAgreed {
        room_id: i64,
        user_id: i64,
    },
    /// All agreed; waiting for every participant to press start.
    StartPhase {
        room_id: i64,
    },
    PlayerStarted {
        room_id: i64,
        user_id: i64,
    },
    RoomActivated {
        room_id: i64,
    },
    ProgressUpdated {
        room_id: i64,
        user_id: i64,
        progress: f64,
    },
    TipReceived {
        room_id: i64,
        from_user_id: i64,
        amount: Decimal,
    },
    RoomCompleted {
        room_id: i64,
        winner_id: i64,
        prize_pool: Decimal,
    },
    RoomCancelled {
        room_id: i64,
    },
}

impl RoomEvent {
    pub fn room_id(&self) -> i64 {
        match self {
            RoomEvent::RoomCreated { room_id, .. }
            | RoomEvent::PlayerJoined { room_id, .. }
            | RoomEvent::AgreementPhase { room_id }
            | RoomEvent::PlayerAgreed { room_id, .. }
            | RoomEvent::StartPhase { room_id }
            | RoomEvent::PlayerStarted { room_id, .. }
            | RoomEvent::RoomActivated { room_id }
            | RoomEvent::ProgressUpdated { room_id, .. }
            | RoomEvent::TipReceived { room_id, .. }
            | RoomEvent::RoomCompleted { room_id, .. }
            | RoomEvent::RoomCancelled { room_id } => *room_id,
        }
    }
}

/// Central event bus for broadcasting events to all subscribers.
pub struct EventBus {
    tx: broadcast::Sender<RoomEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: RoomEvent) {
        // Ignore error if no subscribers
        let _ = self.tx.send(event);
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.tx.subscribe()
    }

    /// Get current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new(16);
        bus.publish(RoomEvent::RoomActivated { room_id: 1 });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(RoomEvent::PlayerAgreed {
            room_id: 7,
            user_id: 42,
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.room_id(), 7);
    }
}
