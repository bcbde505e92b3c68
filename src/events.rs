use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::booking::Booking;

/// Fan-out payloads pushed to subscribed clients. Topic names match the
/// socket event names the mobile apps listen on.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "topic", content = "payload")]
pub enum DispatchEvent {
    #[serde(rename = "booking:created")]
    BookingCreated { booking: Booking },

    #[serde(rename = "booking:updated")]
    BookingUpdated { booking: Booking },

    #[serde(rename = "driver:status")]
    DriverStatus { driver_id: Uuid, is_online: bool },
}

/// Fire-and-forget broadcast bus. Publishing never fails the calling
/// operation; an event with no subscribers is simply dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DispatchEvent>,
}

impl EventBus {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _unused_rx) = broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn publish(&self, event: DispatchEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }
}
