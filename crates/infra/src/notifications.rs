//! Turning committed stock events into human-facing alerts.
//!
//! Only the message is built here; delivery belongs to a [`NotificationSink`].
//! The bundled [`LogSink`] writes alerts to the log.

use std::sync::mpsc::Sender;

use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

use fiberstock_events::EventEnvelope;
use fiberstock_inventory::{InventoryEvent, StockLevel};
use fiberstock_purchasing::PurchaseOrderEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Envelope the alert was built from (for de-duplication downstream).
    pub event_id: Uuid,
    pub subject: String,
    pub body: String,
    pub urgency: Urgency,
}

/// Destination for notifications (mail, chat, pager...).
///
/// Failures are reported back to the worker, which logs them and moves on.
pub trait NotificationSink: Send + 'static {
    fn deliver(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Writes every notification to the log at `info` (`warn` when urgent).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        match notification.urgency {
            Urgency::High => warn!(subject = %notification.subject, body = %notification.body, "notification"),
            Urgency::Normal => info!(subject = %notification.subject, body = %notification.body, "notification"),
        }
        Ok(())
    }
}

/// Forward notifications to another thread.
impl NotificationSink for Sender<Notification> {
    fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        self.send(notification.clone())
            .map_err(|_| anyhow::anyhow!("notification receiver dropped"))
    }
}

fn stock_body(label: &str, level: &StockLevel) -> String {
    format!(
        "{label}: {name}\n\nCurrent Stock: {quantity}\nMinimum Stock: {minimum}\nSKU: {sku}\n\nSuggested Reorder Quantity: {reorder}",
        name = level.name,
        quantity = level.quantity,
        minimum = level.minimum_stock,
        sku = level.sku,
        reorder = level.reorder_quantity,
    )
}

/// Build the alert for an envelope, or `None` for events nobody is told about.
pub fn notification_for(
    envelope: &EventEnvelope<JsonValue>,
) -> Result<Option<Notification>, serde_json::Error> {
    let event_id = envelope.event_id();
    let notification = match envelope.event_type() {
        "inventory.item.out_of_stock" | "inventory.item.low_stock" => {
            match envelope.decode::<InventoryEvent>()? {
                InventoryEvent::OutOfStockDetected(level) => Some(Notification {
                    event_id,
                    subject: format!("URGENT: Item Out of Stock - {}", level.name),
                    body: stock_body("OUT OF STOCK", &level),
                    urgency: Urgency::High,
                }),
                InventoryEvent::LowStockDetected(level) => Some(Notification {
                    event_id,
                    subject: format!("Low Stock Alert - {}", level.name),
                    body: stock_body("LOW STOCK", &level),
                    urgency: Urgency::Normal,
                }),
                _ => None,
            }
        }
        "purchasing.order.status_changed" => match envelope.decode::<PurchaseOrderEvent>()? {
            PurchaseOrderEvent::PurchaseOrderStatusChanged(change) => Some(Notification {
                event_id,
                subject: format!(
                    "Purchase Order #{} - Status Changed to {}",
                    change.order_number,
                    change.to.label()
                ),
                body: format!(
                    "The status of Purchase Order #{} has been changed from {} to {}.",
                    change.order_number,
                    change.from.label(),
                    change.to.label()
                ),
                urgency: Urgency::Normal,
            }),
            PurchaseOrderEvent::GoodsReceived(_) => None,
        },
        _ => None,
    };
    Ok(notification)
}
