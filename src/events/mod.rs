use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::inventory::TransactionKind;

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Material lifecycle
    MaterialCreated(Uuid),
    MaterialUpdated(Uuid),
    MaterialDeleted(Uuid),
    MaterialQuantityChanged {
        material_id: Uuid,
        previous_quantity: f64,
        new_quantity: f64,
    },

    // Stock transaction log
    TransactionRecorded {
        transaction_id: Uuid,
        material_id: Uuid,
        kind: TransactionKind,
    },
    TransactionReversed {
        transaction_id: Uuid,
        material_id: Uuid,
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

// Consumes events from the channel and records them. Emission must never
// fail a request, so the consumer only observes and logs.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!("Received event: {:?}", event);

        match event {
            Event::MaterialCreated(material_id) => {
                info!(material_id = %material_id, "Material registered in inventory");
            }
            Event::MaterialUpdated(material_id) => {
                info!(material_id = %material_id, "Material details updated");
            }
            Event::MaterialDeleted(material_id) => {
                info!(material_id = %material_id, "Material removed from inventory");
            }
            Event::MaterialQuantityChanged {
                material_id,
                previous_quantity,
                new_quantity,
            } => {
                info!(
                    material_id = %material_id,
                    previous_quantity,
                    new_quantity,
                    "Material quantity changed"
                );
            }
            Event::TransactionRecorded {
                transaction_id,
                material_id,
                kind,
            } => {
                info!(
                    transaction_id = %transaction_id,
                    material_id = %material_id,
                    kind = %kind,
                    "Stock transaction recorded"
                );
            }
            Event::TransactionReversed {
                transaction_id,
                material_id,
            } => {
                info!(
                    transaction_id = %transaction_id,
                    material_id = %material_id,
                    "Stock transaction reversed"
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}
