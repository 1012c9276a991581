//! Stock ledger rule tests
//!
//! Properties of the pure ledger rules the services build on:
//! - Movement deltas and non-negative counters
//! - Transfer, purchase order and delivery state machines
//! - Receipt planning and derived order status
//! - Unassigned quantity never going negative

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_delta, apply_receipt, calculate_order_total, delivery_processing_order,
    derive_order_status, plan_receipt, unassigned_quantity, DeliveryLineInput, DeliveryStatus,
    DomainError, MovementQuantity, OrderLineInput, PurchaseLine, PurchaseOrderStatus,
    ReceiptEntry, StockAssignment, TransferAction, TransferStatus,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn line(quantity: i32, received_qty: i32) -> PurchaseLine {
    PurchaseLine {
        item_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        quantity,
        received_qty,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// 50 in, 30 out leaves 20; a further 30 out is refused
    #[test]
    fn test_out_beyond_stock_is_refused() {
        let stock = apply_delta(0, MovementQuantity::In(50).signed_delta()).unwrap();
        let stock = apply_delta(stock, MovementQuantity::Out(30).signed_delta()).unwrap();
        assert_eq!(stock, 20);

        let err = apply_delta(stock, MovementQuantity::Out(30).signed_delta()).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 30,
                available: 20
            }
        );
    }

    #[test]
    fn test_negative_adjustment() {
        assert_eq!(apply_delta(20, MovementQuantity::Adjustment(-5).signed_delta()), Ok(15));
        assert!(apply_delta(4, MovementQuantity::Adjustment(-5).signed_delta()).is_err());
    }

    #[test]
    fn test_transfer_lifecycle() {
        let status = TransferStatus::Pending;
        let status = status.apply(TransferAction::MarkInTransit).unwrap();
        assert_eq!(status, TransferStatus::InTransit);
        let status = status.apply(TransferAction::Complete).unwrap();
        assert_eq!(status, TransferStatus::Completed);

        // Completed transfers cannot be cancelled afterwards
        assert!(matches!(
            status.apply(TransferAction::Cancel),
            Err(DomainError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_pending_transfer_completes_directly() {
        assert_eq!(
            TransferStatus::Pending.apply(TransferAction::Complete),
            Ok(TransferStatus::Completed)
        );
        assert!(TransferStatus::InTransit
            .apply(TransferAction::MarkInTransit)
            .is_err());
    }

    /// Ordered 10, received 4 + 4 then 2
    #[test]
    fn test_partial_receipts_end_received() {
        let lines = vec![line(10, 0)];
        let item = lines[0].item_id;

        let plan = plan_receipt(&lines, &[ReceiptEntry { item_id: item, quantity: 4 }]).unwrap();
        let lines = apply_receipt(&lines, &plan);
        assert_eq!(
            derive_order_status(PurchaseOrderStatus::Pending, &lines),
            PurchaseOrderStatus::Partial
        );

        let plan = plan_receipt(&lines, &[ReceiptEntry { item_id: item, quantity: 4 }]).unwrap();
        let lines = apply_receipt(&lines, &plan);
        assert_eq!(lines[0].received_qty, 8);

        let plan = plan_receipt(&lines, &[ReceiptEntry { item_id: item, quantity: 2 }]).unwrap();
        let lines = apply_receipt(&lines, &plan);
        assert_eq!(
            derive_order_status(PurchaseOrderStatus::Partial, &lines),
            PurchaseOrderStatus::Received
        );
    }

    #[test]
    fn test_over_receipt_rejects_whole_call() {
        let lines = vec![line(10, 8), line(5, 0)];
        let entries = [
            ReceiptEntry { item_id: lines[1].item_id, quantity: 5 },
            ReceiptEntry { item_id: lines[0].item_id, quantity: 3 },
        ];
        assert!(matches!(
            plan_receipt(&lines, &entries),
            Err(DomainError::OverReceipt { remaining: 2, requested: 3, .. })
        ));
    }

    #[test]
    fn test_duplicate_entries_are_summed() {
        let lines = vec![line(10, 0)];
        let item = lines[0].item_id;
        let entries = [
            ReceiptEntry { item_id: item, quantity: 3 },
            ReceiptEntry { item_id: item, quantity: 0 },
            ReceiptEntry { item_id: item, quantity: 4 },
        ];
        let plan = plan_receipt(&lines, &entries).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].quantity, 7);
    }

    #[test]
    fn test_cancel_after_partial_receipt() {
        let lines = vec![line(10, 4)];
        assert_eq!(
            PurchaseOrderStatus::Partial.cancel("PO-2024-000001", &lines),
            Err(DomainError::PartiallyReceived {
                order: "PO-2024-000001".to_string()
            })
        );
        assert_eq!(
            PurchaseOrderStatus::Pending.cancel("PO-2024-000002", &[line(10, 0)]),
            Ok(PurchaseOrderStatus::Cancelled)
        );
    }

    #[test]
    fn test_order_total() {
        let lines = vec![
            OrderLineInput {
                product_id: Uuid::new_v4(),
                quantity: 3,
                unit_price: dec("12.50"),
            },
            OrderLineInput {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: dec("0.25"),
            },
        ];
        assert_eq!(calculate_order_total(&lines), dec("38.00"));
    }

    #[test]
    fn test_delivery_terminal_states() {
        assert_eq!(DeliveryStatus::Draft.deliver(), Ok(DeliveryStatus::Delivered));
        assert_eq!(DeliveryStatus::Confirmed.cancel(), Ok(DeliveryStatus::Cancelled));
        assert!(DeliveryStatus::Delivered.cancel().is_err());
        assert!(DeliveryStatus::Cancelled.deliver().is_err());
        assert!(DeliveryStatus::Confirmed.confirm().is_err());
    }

    /// Assigning from the unassigned pool cannot exceed it
    #[test]
    fn test_assignment_from_unassigned() {
        let unassigned = unassigned_quantity(80, 50);
        assert_eq!(unassigned, 30);
        assert!(StockAssignment::FromUnassigned.check(30, unassigned).is_ok());
        assert!(matches!(
            StockAssignment::FromUnassigned.check(31, unassigned),
            Err(DomainError::InsufficientStock { requested: 31, available: 30 })
        ));
        // New stock is never limited by the pool
        assert!(StockAssignment::NewStock.check(500, 0).is_ok());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn movement_strategy() -> impl Strategy<Value = MovementQuantity> {
        prop_oneof![
            (1i32..500).prop_map(MovementQuantity::In),
            (1i32..500).prop_map(MovementQuantity::Out),
            (-500i32..500)
                .prop_filter("adjustment is non-zero", |d| *d != 0)
                .prop_map(MovementQuantity::Adjustment),
        ]
    }

    /// One step of a simulated ledger for a single product
    #[derive(Debug, Clone)]
    enum LedgerOp {
        Manual { warehouse: Option<usize>, movement: MovementQuantity },
        Assign { warehouse: usize, quantity: i32, is_new_stock: bool },
        Transfer { from: usize, to: usize, quantity: i32, complete: bool },
    }

    fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
        prop_oneof![
            (prop::option::of(0usize..3), movement_strategy())
                .prop_map(|(warehouse, movement)| LedgerOp::Manual { warehouse, movement }),
            (0usize..3, 1i32..200, any::<bool>()).prop_map(|(warehouse, quantity, is_new_stock)| {
                LedgerOp::Assign { warehouse, quantity, is_new_stock }
            }),
            (0usize..3, 0usize..3, 1i32..200, any::<bool>()).prop_map(
                |(from, to, quantity, complete)| LedgerOp::Transfer { from, to, quantity, complete }
            ),
        ]
    }

    /// Applies the same accept/reject rules as the services
    #[derive(Debug, Default)]
    struct Ledger {
        stock: i64,
        warehouses: [i64; 3],
        in_transit: i64,
    }

    impl Ledger {
        fn unassigned(&self) -> i64 {
            unassigned_quantity(self.stock, self.warehouses.iter().sum::<i64>() + self.in_transit)
        }

        fn apply(&mut self, op: &LedgerOp) -> Result<(), DomainError> {
            match *op {
                LedgerOp::Manual { warehouse, movement } => {
                    movement.validate()?;
                    let delta = movement.signed_delta();
                    match warehouse {
                        Some(w) => {
                            let next_w = apply_delta(self.warehouses[w], delta)?;
                            let next_stock = apply_delta(self.stock, delta)?;
                            self.warehouses[w] = next_w;
                            self.stock = next_stock;
                        }
                        None => {
                            if delta < 0 && self.unassigned() < -delta {
                                return Err(DomainError::InsufficientStock {
                                    requested: -delta,
                                    available: self.unassigned(),
                                });
                            }
                            self.stock = apply_delta(self.stock, delta)?;
                        }
                    }
                }
                LedgerOp::Assign { warehouse, quantity, is_new_stock } => {
                    let assignment = StockAssignment::from_flag(is_new_stock);
                    assignment.check(quantity, self.unassigned())?;
                    self.warehouses[warehouse] += i64::from(quantity);
                    if assignment.touches_product_total() {
                        self.stock += i64::from(quantity);
                    }
                }
                LedgerOp::Transfer { from, to, quantity, complete } => {
                    shared::validate_transfer_request(
                        Uuid::from_u128(from as u128 + 1),
                        Uuid::from_u128(to as u128 + 1),
                        quantity,
                    )?;
                    self.warehouses[from] = apply_delta(self.warehouses[from], -i64::from(quantity))?;
                    self.in_transit += i64::from(quantity);
                    // Resolve immediately: complete lands at `to`, cancel returns to `from`
                    self.in_transit -= i64::from(quantity);
                    let target = if complete { to } else { from };
                    self.warehouses[target] += i64::from(quantity);
                }
            }
            Ok(())
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Signed delta: In(q) -> +q, Out(q) -> -q, Adjustment(d) -> d
        #[test]
        fn prop_signed_delta_matches_type(movement in movement_strategy()) {
            let expected = match movement {
                MovementQuantity::In(q) => i64::from(q),
                MovementQuantity::Out(q) => -i64::from(q),
                MovementQuantity::Adjustment(d) => i64::from(d),
            };
            prop_assert_eq!(movement.signed_delta(), expected);
            prop_assert_eq!(
                MovementQuantity::from_stored(movement.movement_type(), movement.stored_quantity()),
                movement
            );
        }

        /// Derived status depends only on the lines
        #[test]
        fn prop_derived_status_is_pure(
            lines in prop::collection::vec((1i32..100, 0i32..100), 1..10)
        ) {
            let lines: Vec<PurchaseLine> = lines
                .into_iter()
                .map(|(q, r)| line(q, r.min(q)))
                .collect();
            let status = derive_order_status(PurchaseOrderStatus::Pending, &lines);

            if lines.iter().all(|l| l.received_qty == l.quantity) {
                prop_assert_eq!(status, PurchaseOrderStatus::Received);
            } else if lines.iter().any(|l| l.received_qty > 0) {
                prop_assert_eq!(status, PurchaseOrderStatus::Partial);
            } else {
                prop_assert_eq!(status, PurchaseOrderStatus::Pending);
            }
        }

        /// An accepted receipt never pushes a line past its ordered quantity
        #[test]
        fn prop_receipt_never_over_receives(
            ordered in prop::collection::vec((1i32..50, 0i32..50), 1..6),
            requests in prop::collection::vec((0usize..6, 0i32..60), 1..10)
        ) {
            let lines: Vec<PurchaseLine> = ordered
                .into_iter()
                .map(|(q, r)| line(q, r.min(q)))
                .collect();
            let entries: Vec<ReceiptEntry> = requests
                .into_iter()
                .map(|(i, quantity)| ReceiptEntry {
                    item_id: lines[i % lines.len()].item_id,
                    quantity,
                })
                .collect();

            if let Ok(plan) = plan_receipt(&lines, &entries) {
                let after = apply_receipt(&lines, &plan);
                for l in &after {
                    prop_assert!(l.received_qty <= l.quantity);
                }
                let before: i32 = lines.iter().map(|l| l.received_qty).sum();
                let added: i32 = plan.iter().map(|p| p.quantity).sum();
                let total: i32 = after.iter().map(|l| l.received_qty).sum();
                prop_assert_eq!(total, before + added);

                let keys: Vec<_> = plan.iter().map(|p| (p.product_id, p.item_id)).collect();
                let mut sorted = keys.clone();
                sorted.sort();
                prop_assert_eq!(keys, sorted);
            }
        }

        /// Delivery lines are processed in product order, none dropped
        #[test]
        fn prop_delivery_order_is_sorted(count in 1usize..12) {
            let lines: Vec<DeliveryLineInput> = (0..count)
                .map(|i| DeliveryLineInput {
                    product_id: Uuid::new_v4(),
                    quantity: i as i32 + 1,
                })
                .collect();
            let ordered = delivery_processing_order(&lines);
            prop_assert_eq!(ordered.len(), lines.len());
            prop_assert!(ordered.windows(2).all(|w| w[0].product_id <= w[1].product_id));
        }

        /// Unassigned quantity never goes negative whatever the operation order
        #[test]
        fn prop_unassigned_never_negative(
            ops in prop::collection::vec(ledger_op_strategy(), 1..60)
        ) {
            let mut ledger = Ledger::default();
            for op in &ops {
                let _ = ledger.apply(op);
                prop_assert!(ledger.unassigned() >= 0, "after {:?}: {:?}", op, ledger);
                prop_assert!(ledger.stock >= 0);
                prop_assert!(ledger.warehouses.iter().all(|w| *w >= 0));
            }
        }
    }
}
