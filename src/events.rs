use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Events emitted by the checkout and reconciliation paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        order_no: String,
        amount: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PaymentRequested {
        order_id: Uuid,
        payment_id: String,
        amount: Decimal,
    },
    PaymentSucceeded {
        order_id: Uuid,
        payment_id: String,
        transaction_no: String,
    },
    PaymentFailed {
        order_id: Uuid,
        payment_id: String,
    },
    EntitlementsGranted {
        user_id: Uuid,
        order_id: Uuid,
        photo_count: usize,
    },
    PhotoUploaded {
        album_id: Uuid,
        photo_id: Uuid,
    },
    PhotoDeleted {
        photo_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Runs for the lifetime of the
/// process; exits when all senders are dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                order_no,
                amount,
            } => {
                info!(%order_id, %order_no, %amount, "order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::PaymentRequested {
                order_id,
                payment_id,
                amount,
            } => {
                info!(%order_id, %payment_id, %amount, "payment requested");
            }
            Event::PaymentSucceeded {
                order_id,
                payment_id,
                transaction_no,
            } => {
                info!(%order_id, %payment_id, %transaction_no, "payment succeeded");
            }
            Event::PaymentFailed {
                order_id,
                payment_id,
            } => {
                info!(%order_id, %payment_id, "payment failed");
            }
            Event::EntitlementsGranted {
                user_id,
                order_id,
                photo_count,
            } => {
                info!(%user_id, %order_id, photo_count, "download entitlements granted");
            }
            Event::PhotoUploaded { album_id, photo_id } => {
                info!(%album_id, %photo_id, "photo uploaded");
            }
            Event::PhotoDeleted { photo_id } => {
                info!(%photo_id, "photo deleted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::PaymentFailed {
                order_id: Uuid::new_v4(),
                payment_id: "00000001_2026010112000000".into(),
            })
            .await
            .expect("send should succeed");

        assert!(matches!(
            rx.recv().await,
            Some(Event::PaymentFailed { .. })
        ));
    }

    #[tokio::test]
    async fn send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender
            .send(Event::PhotoDeleted {
                photo_id: Uuid::new_v4(),
            })
            .await;
        assert!(result.is_err());
    }
}
