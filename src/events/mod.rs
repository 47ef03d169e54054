use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::order::{DeliveryStatus, OrderStatus};

/// Lifecycle events published after a transition has been persisted.
/// No-op transitions publish nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Submitted {
        order_id: Uuid,
        seller_id: String,
        farmer_id: String,
    },
    Decided {
        order_id: Uuid,
        status: OrderStatus,
    },
    DeliveryAccepted {
        order_id: Uuid,
        deliveryman_id: String,
    },
    DeliveryStatusChanged {
        order_id: Uuid,
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> Uuid {
        match self {
            Self::Submitted { order_id, .. }
            | Self::Decided { order_id, .. }
            | Self::DeliveryAccepted { order_id, .. }
            | Self::DeliveryStatusChanged { order_id, .. } => *order_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<OrderEvent>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<OrderEvent>) -> Self {
        Self { sender }
    }

    /// Creates a bounded channel and returns both halves.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OrderEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub async fn send(&self, event: OrderEvent) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends and logs a failure instead of returning it. The transition
    /// has already been persisted by the time events go out.
    pub async fn send_or_log(&self, event: OrderEvent) {
        let order_id = event.order_id();
        if let Err(error) = self.send(event).await {
            warn!(%order_id, %error, "dropping order event");
        }
    }
}

pub async fn process_events(mut rx: mpsc::Receiver<OrderEvent>) {
    info!("Starting order event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            OrderEvent::Submitted {
                order_id,
                seller_id,
                farmer_id,
            } => info!(%order_id, %seller_id, %farmer_id, "order submitted"),
            OrderEvent::Decided { order_id, status } => {
                info!(%order_id, %status, "order decided")
            }
            OrderEvent::DeliveryAccepted {
                order_id,
                deliveryman_id,
            } => info!(%order_id, %deliveryman_id, "delivery accepted"),
            OrderEvent::DeliveryStatusChanged { order_id, from, to } => {
                info!(%order_id, %from, %to, "delivery status changed")
            }
        }
    }

    info!("Order event channel closed");
}
