//! End-to-end tests through `StockService`.
//!
//! Operation → StockStore transaction → commit → EventBus → NotificationWorker
//!
//! Verifies:
//! - Every stock change leaves a ledger that replays to the item quantity
//! - Failed operations roll back every touched record and publish nothing
//! - Purchase order receiving and count completion move stock atomically

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::Value as JsonValue;

    use fiberstock_core::{DomainError, Entity, ExpectedVersion, ItemId, LocationId, SupplierId};
    use fiberstock_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use fiberstock_inventory::{
        AdjustmentRequest, Company, CountStatus, ItemDetails, MovementRequest, MovementType,
        NewCount, NewItem, NewLocation, NewSupplier,
    };
    use fiberstock_purchasing::{NewLine, NewPurchaseOrder, PurchaseOrderStatus};

    use crate::error::ServiceError;
    use crate::notifications::{Notification, Urgency};
    use crate::service::StockService;
    use crate::store::InMemoryStockStore;
    use crate::workers::NotificationWorker;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type Service = StockService<InMemoryStockStore, Bus>;

    fn setup() -> (Service, Bus) {
        fiberstock_observability::init_test();
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let service = StockService::new(InMemoryStockStore::new(), bus.clone());
        (service, bus)
    }

    fn warehouse(service: &Service) -> LocationId {
        service
            .create_location(NewLocation {
                name: "Main Warehouse".to_string(),
                description: String::new(),
                address: "Unit 4, Industrial Park".to_string(),
                company: Company::Both,
            })
            .unwrap()
            .id
    }

    fn supplier(service: &Service) -> SupplierId {
        service
            .create_supplier(NewSupplier {
                name: "Fibre Supplies Ltd".to_string(),
                ..NewSupplier::default()
            })
            .unwrap()
            .id
    }

    fn item(service: &Service, name: &str, location: LocationId, opening: u32, minimum: u32) -> ItemId {
        let created = service
            .create_item(
                NewItem {
                    details: ItemDetails {
                        name: name.to_string(),
                        sku: name.to_uppercase().replace(' ', "-"),
                        company: Company::Fno,
                        minimum_stock: minimum,
                        reorder_quantity: 50,
                        location_id: Some(location),
                        ..ItemDetails::default()
                    },
                    opening_quantity: opening,
                },
                None,
            )
            .unwrap();
        created.id_typed()
    }

    fn domain(err: ServiceError) -> DomainError {
        match err {
            ServiceError::Domain(err) => err,
            other => panic!("expected a domain error, got {other:?}"),
        }
    }

    fn event_types(envelopes: &[EventEnvelope<JsonValue>]) -> Vec<&str> {
        envelopes.iter().map(|e| e.event_type()).collect()
    }

    #[test]
    fn stock_in_out_and_adjust_keep_the_ledger_consistent() {
        let (service, _bus) = setup();
        let shelf = warehouse(&service);
        let cable = item(&service, "Drop Cable 1F", shelf, 0, 5);

        service
            .record_movement(cable, MovementRequest::stock_in(50, shelf, Utc::now()))
            .unwrap();
        let out = service
            .record_movement(
                cable,
                MovementRequest::stock_out(12, shelf, Utc::now()).with_job("JOB-1042"),
            )
            .unwrap();
        assert_eq!(out.item.quantity(), 38);
        assert_eq!(out.movement.quantity, -12);
        assert_eq!(out.movement.stock_after, 38);

        let adjusted = service
            .adjust(cable, AdjustmentRequest::new(40, "Found on van", Utc::now()))
            .unwrap();
        assert_eq!(adjusted.item.quantity(), 40);
        assert_eq!(adjusted.adjustment.previous_quantity, 38);
        assert_eq!(adjusted.adjustment.adjustment_quantity, 2);
        assert_eq!(adjusted.movement.movement_type, MovementType::Adjustment);

        let ledger = service.movements_for(cable).unwrap();
        let after: Vec<u32> = ledger.iter().map(|m| m.stock_after).collect();
        assert_eq!(after, vec![50, 38, 40]);
        assert_eq!(service.adjustments_for(cable).unwrap().len(), 1);
        assert_eq!(service.verify_ledger().unwrap(), 1);
    }

    #[test]
    fn insufficient_stock_leaves_item_and_ledger_untouched() {
        let (service, bus) = setup();
        let shelf = warehouse(&service);
        let closure = item(&service, "Splice Closure", shelf, 38, 2);
        let version = service.item_version(closure).unwrap();
        let sub = bus.subscribe();

        let err = service
            .record_movement(closure, MovementRequest::stock_out(50, shelf, Utc::now()))
            .unwrap_err();
        assert!(matches!(
            domain(err),
            DomainError::InsufficientStock { available: 38, requested: 50, .. }
        ));

        assert_eq!(service.item(closure).unwrap().quantity(), 38);
        assert_eq!(service.item_version(closure).unwrap(), version);
        assert_eq!(service.movements_for(closure).unwrap().len(), 1);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn transfer_keeps_the_total_and_unknown_locations_are_refused() {
        let (service, _bus) = setup();
        let shelf = warehouse(&service);
        let van = service
            .create_location(NewLocation {
                name: "Van 3".to_string(),
                description: String::new(),
                address: String::new(),
                company: Company::Fno,
            })
            .unwrap()
            .id;
        let ont = item(&service, "ONT", shelf, 20, 2);

        let moved = service
            .record_movement(ont, MovementRequest::transfer(5, shelf, van, Utc::now()))
            .unwrap();
        assert_eq!(moved.item.quantity(), 20);
        assert_eq!(moved.movement.signed_delta(), 0);

        let err = service
            .record_movement(ont, MovementRequest::stock_out(1, LocationId::new(), Utc::now()))
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::NotFound(_)));
        assert_eq!(service.verify_ledger().unwrap(), 1);
    }

    #[test]
    fn failed_create_item_rolls_back_the_registration() {
        let (service, _bus) = setup();
        let err = service
            .create_item(
                NewItem {
                    details: ItemDetails {
                        name: "Patch Lead".to_string(),
                        ..ItemDetails::default()
                    },
                    opening_quantity: 10,
                },
                None,
            )
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidMovement(_)));
        assert!(service.items().unwrap().is_empty());
    }

    #[test]
    fn adjusting_to_the_current_quantity_records_a_zero_pair() {
        let (service, _bus) = setup();
        let shelf = warehouse(&service);
        let id = item(&service, "Pigtail SC/APC", shelf, 7, 2);

        let confirmed = service
            .adjust(id, AdjustmentRequest::new(7, "recount", Utc::now()))
            .unwrap();
        assert_eq!(confirmed.adjustment.adjustment_quantity, 0);
        assert_eq!(confirmed.movement.movement_type, MovementType::Adjustment);
        assert_eq!(confirmed.movement.quantity, 0);
        assert_eq!(confirmed.item.quantity(), 7);

        assert_eq!(service.movements_for(id).unwrap().len(), 2);
        assert_eq!(service.adjustments_for(id).unwrap().len(), 1);
        assert_eq!(service.verify_ledger().unwrap(), 1);
    }

    #[test]
    fn inactive_locations_cannot_move_stock() {
        let (service, _bus) = setup();
        let shelf = warehouse(&service);
        let van = service
            .create_location(NewLocation {
                name: "Van 7".to_string(),
                description: String::new(),
                address: String::new(),
                company: Company::Wisp,
            })
            .unwrap()
            .id;
        let drop = item(&service, "Drop Cable 4F", shelf, 30, 5);

        let retired = service.deactivate_location(van).unwrap();
        assert!(!retired.is_active);
        assert!(!service.location(van).unwrap().is_active);

        let err = service
            .record_movement(drop, MovementRequest::transfer(5, shelf, van, Utc::now()))
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidMovement(_)));

        let err = service
            .adjust(
                drop,
                AdjustmentRequest::new(28, "damaged", Utc::now()).at_location(Some(van)),
            )
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidMovement(_)));

        assert_eq!(service.item(drop).unwrap().quantity(), 30);
        assert_eq!(service.movements_for(drop).unwrap().len(), 1);
    }

    #[test]
    fn deactivated_items_leave_stock_reports_and_stay_quiet() {
        let (service, bus) = setup();
        let shelf = warehouse(&service);
        let old = item(&service, "Legacy Radio", shelf, 2, 5);
        assert_eq!(service.low_stock_items().unwrap().len(), 1);

        let version = service.item_version(old).unwrap();
        let retired = service
            .deactivate_item(old, ExpectedVersion::Exact(version))
            .unwrap();
        assert!(!retired.is_active());
        assert!(service.low_stock_items().unwrap().is_empty());

        let sub = bus.subscribe();
        service
            .record_movement(old, MovementRequest::stock_out(2, shelf, Utc::now()))
            .unwrap();
        assert_eq!(event_types(&sub.drain()), vec!["inventory.movement.recorded"]);
        assert!(service.out_of_stock_items().unwrap().is_empty());
    }

    #[test]
    fn generated_count_references_skip_hand_entered_ones() {
        let (service, _bus) = setup();
        let new_count = |reference: Option<&str>| NewCount {
            count_reference: reference.map(str::to_string),
            location_id: None,
            count_date: Utc::now().date_naive(),
            company: Company::Both,
            notes: None,
            created_by: None,
        };

        service.create_count(new_count(Some("COUNT-1"))).unwrap();
        service.create_count(new_count(Some("COUNT-3"))).unwrap();

        let second = service.create_count(new_count(None)).unwrap();
        let fourth = service.create_count(new_count(None)).unwrap();
        assert_eq!(second.count_reference(), "COUNT-2");
        assert_eq!(fourth.count_reference(), "COUNT-4");

        let taken = service.create_count(new_count(Some("COUNT-2"))).unwrap_err();
        assert!(matches!(domain(taken), DomainError::Conflict(_)));
    }

    #[test]
    fn stale_item_version_is_a_conflict() {
        let (service, _bus) = setup();
        let shelf = warehouse(&service);
        let id = item(&service, "Fusion Splicer", shelf, 1, 0);
        let version = service.item_version(id).unwrap();
        let mut details = service.item(id).unwrap().details().clone();
        details.minimum_stock = 2;

        service
            .update_item(id, details.clone(), ExpectedVersion::Exact(version))
            .unwrap();
        let err = service
            .update_item(id, details, ExpectedVersion::Exact(version))
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::Conflict(_)));
    }

    #[test]
    fn purchase_order_is_received_in_parts() {
        let (service, bus) = setup();
        let shelf = warehouse(&service);
        let vendor = supplier(&service);
        let cable = item(&service, "Drop Cable 2F", shelf, 0, 0);

        let order = service
            .create_purchase_order(NewPurchaseOrder {
                order_number: "PO-001".to_string(),
                supplier_id: vendor,
                company: Company::Fno,
                expected_delivery_date: None,
                notes: String::new(),
                shipping_address: String::new(),
                created_by: None,
            })
            .unwrap();
        let order_id = order.id_typed();
        let line = service
            .add_po_line(
                order_id,
                NewLine {
                    item_id: cable,
                    quantity_ordered: 10,
                    unit_price: dec!(3.20),
                },
            )
            .unwrap();
        service.submit_purchase_order(order_id).unwrap();
        service.approve_purchase_order(order_id, None).unwrap();
        service.mark_purchase_order_ordered(order_id).unwrap();

        let sub = bus.subscribe();
        let first = service.receive_po_item(line, 4, shelf, None).unwrap();
        assert_eq!(first.status.to, PurchaseOrderStatus::PartiallyReceived);
        assert_eq!(first.item.quantity(), 4);
        assert_eq!(first.movement.reference_number.as_deref(), Some("PO #PO-001"));

        let over = service.receive_po_item(line, 7, shelf, None).unwrap_err();
        assert!(matches!(domain(over), DomainError::InvalidMovement(_)));

        let last = service.receive_po_item(line, 6, shelf, None).unwrap();
        assert_eq!(last.status.to, PurchaseOrderStatus::FullyReceived);
        assert_eq!(last.item.quantity(), 10);
        assert_eq!(last.item.unit_price(), Some(dec!(3.20)));
        assert_eq!(last.item.last_ordered_date(), last.purchase_order.order_date());
        assert!(last.purchase_order.actual_delivery_date().is_some());

        let done = service.receive_po_item(line, 1, shelf, None).unwrap_err();
        assert!(matches!(domain(done), DomainError::InvalidTransition(_)));

        let published = sub.drain();
        let types = event_types(&published);
        assert_eq!(
            types.iter().filter(|t| **t == "purchasing.order.goods_received").count(),
            2
        );
        assert_eq!(
            types.iter().filter(|t| **t == "purchasing.order.status_changed").count(),
            2
        );
        assert_eq!(service.verify_ledger().unwrap(), 1);
    }

    #[test]
    fn completing_a_count_adjusts_only_discrepancies() {
        let (service, bus) = setup();
        let shelf = warehouse(&service);
        let a = item(&service, "Cable Ties", shelf, 10, 0);
        let b = item(&service, "SC Connectors", shelf, 5, 0);

        let count = service
            .create_count(NewCount {
                count_reference: None,
                location_id: Some(shelf),
                count_date: Utc::now().date_naive(),
                company: Company::Fno,
                notes: None,
                created_by: None,
            })
            .unwrap();
        assert_eq!(count.count_reference(), "COUNT-1");
        let count_id = count.id();

        let line_a = service.add_count_item(count_id, a).unwrap();
        let line_b = service.add_count_item(count_id, b).unwrap();
        let dup = service.add_count_item(count_id, a).unwrap_err();
        assert!(matches!(domain(dup), DomainError::DuplicateCountItem(_)));

        service.record_count(count_id, line_a, 10, None, None).unwrap();
        let early = service.complete_count(count_id, None).unwrap_err();
        assert!(matches!(domain(early), DomainError::IncompleteCount { uncounted: 1 }));
        service
            .record_count(count_id, line_b, 3, None, Some("two missing".to_string()))
            .unwrap();

        let sub = bus.subscribe();
        let done = service.complete_count(count_id, None).unwrap();
        assert_eq!(done.count.status(), CountStatus::Completed);
        assert_eq!(done.unchanged, vec![a]);
        assert_eq!(done.adjustments.len(), 1);
        let adjustment = &done.adjustments[0].adjustment;
        assert_eq!(adjustment.item_id, b);
        assert_eq!(adjustment.adjustment_quantity, -2);
        assert_eq!(adjustment.reason, "Inventory Count #COUNT-1");

        assert_eq!(service.item(b).unwrap().quantity(), 3);
        assert!(service.item(a).unwrap().last_counted_date().is_some());

        let ledger_b = service.movements_for(b).unwrap();
        assert_eq!(ledger_b.len(), 2);
        let correction = &ledger_b[1];
        assert_eq!(correction.id, adjustment.movement_id);
        assert_eq!(correction.movement_type, MovementType::Adjustment);
        assert_eq!(correction.quantity, -2);
        assert_eq!(correction.stock_after, 3);
        assert_eq!(correction.reference_number.as_deref(), Some("Count #COUNT-1"));
        assert_eq!(correction.source_location, Some(shelf));
        assert!(
            event_types(&sub.drain()).contains(&"inventory.count.completed")
        );

        let again = service.complete_count(count_id, None).unwrap_err();
        assert!(matches!(domain(again), DomainError::InvalidTransition(_)));
        assert_eq!(service.verify_ledger().unwrap(), 2);
    }

    #[test]
    fn low_stock_alert_is_published_after_commit() {
        let (service, bus) = setup();
        let shelf = warehouse(&service);
        let radio = item(&service, "LiteBeam 5AC", shelf, 6, 4);
        let sub = bus.subscribe();

        service
            .record_movement(radio, MovementRequest::stock_out(3, shelf, Utc::now()))
            .unwrap();
        let published = sub.drain();
        assert_eq!(
            event_types(&published),
            vec!["inventory.movement.recorded", "inventory.item.low_stock"]
        );
        assert!(published[0].sequence_number() < published[1].sequence_number());
        assert_eq!(service.low_stock_items().unwrap().len(), 1);
    }

    #[test]
    fn notification_worker_delivers_stock_alerts() {
        let (service, bus) = setup();
        let shelf = warehouse(&service);
        let radio = item(&service, "PowerBeam", shelf, 3, 1);

        let (tx, rx) = mpsc::channel::<Notification>();
        let worker = NotificationWorker::spawn(&bus, tx, Duration::from_millis(20)).unwrap();

        service
            .record_movement(radio, MovementRequest::stock_out(2, shelf, Utc::now()))
            .unwrap();
        let low = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(low.subject, "Low Stock Alert - PowerBeam");
        assert_eq!(low.urgency, Urgency::Normal);

        service
            .record_movement(radio, MovementRequest::stock_out(1, shelf, Utc::now()))
            .unwrap();
        let empty = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(empty.subject, "URGENT: Item Out of Stock - PowerBeam");
        assert_eq!(empty.urgency, Urgency::High);
        assert!(empty.body.contains("Suggested Reorder Quantity: 50"));
        worker.shutdown();
    }

    #[test]
    fn services_sharing_a_bus_all_reach_the_worker() {
        fiberstock_observability::init_test();
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let first = StockService::new(InMemoryStockStore::new(), bus.clone());
        let second = StockService::new(InMemoryStockStore::new(), bus.clone());
        let first_shelf = warehouse(&first);
        let second_shelf = warehouse(&second);
        let a = item(&first, "First", first_shelf, 5, 2);
        let b = item(&second, "Second", second_shelf, 5, 2);

        let (tx, rx) = mpsc::channel::<Notification>();
        let worker = NotificationWorker::spawn(&bus, tx, Duration::from_millis(20)).unwrap();

        first
            .record_movement(a, MovementRequest::stock_out(3, first_shelf, Utc::now()))
            .unwrap();
        second
            .record_movement(b, MovementRequest::stock_out(3, second_shelf, Utc::now()))
            .unwrap();

        let subjects: Vec<String> = (0..2)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap().subject)
            .collect();
        assert_eq!(
            subjects,
            vec!["Low Stock Alert - First", "Low Stock Alert - Second"]
        );
        worker.shutdown();
    }

    #[test]
    fn redelivered_envelope_notifies_once() {
        let (service, bus) = setup();
        let shelf = warehouse(&service);
        let radio = item(&service, "NanoBeam", shelf, 4, 1);

        let capture = bus.subscribe();
        service
            .record_movement(radio, MovementRequest::stock_out(3, shelf, Utc::now()))
            .unwrap();
        let alert = capture
            .drain()
            .into_iter()
            .find(|e| e.event_type() == "inventory.item.low_stock")
            .unwrap();

        let (tx, rx) = mpsc::channel::<Notification>();
        let worker = NotificationWorker::spawn(&bus, tx, Duration::from_millis(20)).unwrap();
        bus.publish(alert.clone()).unwrap();
        bus.publish(alert).unwrap();

        let once = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(once.subject, "Low Stock Alert - NanoBeam");
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        worker.shutdown();
    }

    #[test]
    fn failed_receive_rolls_back_the_order_line() {
        let (service, bus) = setup();
        let shelf = warehouse(&service);
        let vendor = supplier(&service);
        let ties = item(&service, "Cable Ties", shelf, u32::MAX - 5, 0);

        let order_id = service
            .create_purchase_order(NewPurchaseOrder {
                order_number: "PO-900".to_string(),
                supplier_id: vendor,
                company: Company::Wisp,
                expected_delivery_date: None,
                notes: String::new(),
                shipping_address: String::new(),
                created_by: None,
            })
            .unwrap()
            .id_typed();
        let line = service
            .add_po_line(
                order_id,
                NewLine {
                    item_id: ties,
                    quantity_ordered: 10,
                    unit_price: dec!(0.05),
                },
            )
            .unwrap();
        service.submit_purchase_order(order_id).unwrap();
        service.approve_purchase_order(order_id, None).unwrap();
        service.mark_purchase_order_ordered(order_id).unwrap();

        let sub = bus.subscribe();
        let err = service.receive_po_item(line, 10, shelf, None).unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidMovement(_)));

        let order = service.purchase_order(order_id).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Ordered);
        assert_eq!(order.line(line).unwrap().quantity_received, 0);
        assert_eq!(service.item(ties).unwrap().quantity(), u32::MAX - 5);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn concurrent_stock_outs_never_oversell() {
        let (service, _bus) = setup();
        let shelf = warehouse(&service);
        let ont = item(&service, "ONT", shelf, 25, 0);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                thread::spawn(move || {
                    (0..5)
                        .filter(|_| {
                            service
                                .record_movement(ont, MovementRequest::stock_out(1, shelf, Utc::now()))
                                .is_ok()
                        })
                        .count()
                })
            })
            .collect();
        let succeeded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(succeeded, 25);
        assert_eq!(service.item(ont).unwrap().quantity(), 0);
        assert_eq!(service.verify_ledger().unwrap(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        In(u32),
        Out(u32),
        Return(u32),
        Adjust(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..40).prop_map(Op::In),
            (1u32..40).prop_map(Op::Out),
            (1u32..10).prop_map(Op::Return),
            (0u32..60).prop_map(Op::Adjust),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn ledger_verifies_after_any_operation_sequence(ops in prop::collection::vec(op(), 1..25)) {
            let (service, _bus) = setup();
            let shelf = warehouse(&service);
            let id = item(&service, "Drop Cable", shelf, 10, 3);
            let mut expected: u32 = 10;

            for op in ops {
                let now = Utc::now();
                match op {
                    Op::In(q) => {
                        service.record_movement(id, MovementRequest::stock_in(q, shelf, now)).unwrap();
                        expected += q;
                    }
                    Op::Out(q) => {
                        let result = service.record_movement(id, MovementRequest::stock_out(q, shelf, now));
                        prop_assert_eq!(result.is_ok(), q <= expected);
                        if q <= expected {
                            expected -= q;
                        }
                    }
                    Op::Return(q) => {
                        service.record_movement(id, MovementRequest::stock_return(q, now)).unwrap();
                        expected += q;
                    }
                    Op::Adjust(target) => {
                        let result = service
                            .adjust(id, AdjustmentRequest::new(target, "Recount", now))
                            .unwrap();
                        prop_assert_eq!(result.adjustment.adjustment_quantity, i64::from(target) - i64::from(expected));
                        expected = target;
                    }
                }
            }

            prop_assert_eq!(service.item(id).unwrap().quantity(), expected);
            prop_assert_eq!(service.verify_ledger().unwrap(), 1);
        }
    }
}
