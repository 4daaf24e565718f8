//! Purchasing domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fiberstock_core::{ItemId, PurchaseOrderId, PurchaseOrderItemId};
use fiberstock_events::Event;

use crate::order::{LineReceipt, PurchaseOrder, PurchaseOrderStatus, StatusChange};

/// Event: PurchaseOrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderStatusChanged {
    pub order_id: PurchaseOrderId,
    pub order_number: String,
    pub from: PurchaseOrderStatus,
    pub to: PurchaseOrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GoodsReceived.
///
/// One per received line; the stock side is the matching `in` movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceived {
    pub order_id: PurchaseOrderId,
    pub order_number: String,
    pub line_id: PurchaseOrderItemId,
    pub item_id: ItemId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderStatusChanged(PurchaseOrderStatusChanged),
    GoodsReceived(GoodsReceived),
}

impl PurchaseOrderEvent {
    pub fn status_changed(order: &PurchaseOrder, change: StatusChange, at: DateTime<Utc>) -> Self {
        Self::PurchaseOrderStatusChanged(PurchaseOrderStatusChanged {
            order_id: order.id_typed(),
            order_number: order.order_number().to_string(),
            from: change.from,
            to: change.to,
            occurred_at: at,
        })
    }

    /// Events for a receipt: the goods, plus a status change when the status moved.
    pub fn received(order: &PurchaseOrder, receipt: &LineReceipt, at: DateTime<Utc>) -> Vec<Self> {
        let mut events = vec![Self::GoodsReceived(GoodsReceived {
            order_id: order.id_typed(),
            order_number: order.order_number().to_string(),
            line_id: receipt.line_id,
            item_id: receipt.item_id,
            quantity: receipt.quantity,
            occurred_at: at,
        })];
        if receipt.status.from != receipt.status.to {
            events.push(Self::status_changed(order, receipt.status, at));
        }
        events
    }

    pub fn order_id(&self) -> PurchaseOrderId {
        match self {
            PurchaseOrderEvent::PurchaseOrderStatusChanged(e) => e.order_id,
            PurchaseOrderEvent::GoodsReceived(e) => e.order_id,
        }
    }
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderStatusChanged(_) => "purchasing.order.status_changed",
            PurchaseOrderEvent::GoodsReceived(_) => "purchasing.order.goods_received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderStatusChanged(e) => e.occurred_at,
            PurchaseOrderEvent::GoodsReceived(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{NewLine, NewPurchaseOrder};
    use fiberstock_core::SupplierId;
    use fiberstock_inventory::Company;
    use rust_decimal_macros::dec;

    #[test]
    fn second_receipt_on_partial_order_only_reports_goods() {
        let now = Utc::now();
        let mut po = PurchaseOrder::new(
            PurchaseOrderId::new(),
            NewPurchaseOrder {
                order_number: "88".to_string(),
                supplier_id: SupplierId::new(),
                company: Company::Wisp,
                expected_delivery_date: None,
                notes: String::new(),
                shipping_address: String::new(),
                created_by: None,
            },
            now,
        )
        .unwrap();
        let line = po
            .add_line(
                NewLine {
                    item_id: ItemId::new(),
                    quantity_ordered: 3,
                    unit_price: dec!(9.99),
                },
                now,
            )
            .unwrap();
        po.submit(now).unwrap();
        po.approve(None, now).unwrap();
        po.mark_ordered(now).unwrap();

        let first = po.receive_line(line, 1, now).unwrap();
        let events = PurchaseOrderEvent::received(&po, &first, now);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type(), "purchasing.order.status_changed");

        let second = po.receive_line(line, 1, now).unwrap();
        let events = PurchaseOrderEvent::received(&po, &second, now);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "purchasing.order.goods_received");
    }
}
