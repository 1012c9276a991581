//! Delivery state machine
//!
//! DRAFT -> CONFIRMED -> DELIVERED, DRAFT | CONFIRMED -> CANCELLED.
//! DELIVERED and CANCELLED are terminal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Status of a delivery to an institution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Draft,
    Confirmed,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Draft => "DRAFT",
            DeliveryStatus::Confirmed => "CONFIRMED",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    fn transition_error(&self, action: &'static str) -> DomainError {
        DomainError::InvalidStateTransition {
            entity: "delivery",
            status: self.as_str().to_string(),
            action,
        }
    }

    /// DRAFT -> CONFIRMED
    pub fn confirm(self) -> DomainResult<DeliveryStatus> {
        match self {
            DeliveryStatus::Draft => Ok(DeliveryStatus::Confirmed),
            other => Err(other.transition_error("confirm")),
        }
    }

    /// DRAFT | CONFIRMED -> DELIVERED
    pub fn deliver(self) -> DomainResult<DeliveryStatus> {
        if self.is_terminal() {
            return Err(self.transition_error("deliver"));
        }
        Ok(DeliveryStatus::Delivered)
    }

    /// DRAFT | CONFIRMED -> CANCELLED
    pub fn cancel(self) -> DomainResult<DeliveryStatus> {
        if self.is_terminal() {
            return Err(self.transition_error("cancel"));
        }
        Ok(DeliveryStatus::Cancelled)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(DeliveryStatus::Draft),
            "CONFIRMED" => Ok(DeliveryStatus::Confirmed),
            "DELIVERED" => Ok(DeliveryStatus::Delivered),
            "CANCELLED" => Ok(DeliveryStatus::Cancelled),
            _ => Err(DomainError::UnknownValue {
                kind: "delivery status",
                value: s.to_string(),
            }),
        }
    }
}

/// A delivery line; fixed once the delivery is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

pub fn validate_delivery_lines(lines: &[DeliveryLineInput]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::invalid_argument(
            "items",
            "A delivery needs at least one item",
        ));
    }
    for (i, line) in lines.iter().enumerate() {
        crate::validation::validate_positive_quantity(&format!("items[{}].quantity", i), line.quantity)?;
    }
    Ok(())
}

/// Lines in the order their stock rows are locked (product id, stable)
pub fn delivery_processing_order(lines: &[DeliveryLineInput]) -> Vec<DeliveryLineInput> {
    let mut ordered = lines.to_vec();
    ordered.sort_by_key(|l| l.product_id);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_only_from_draft() {
        assert_eq!(DeliveryStatus::Draft.confirm(), Ok(DeliveryStatus::Confirmed));
        assert!(DeliveryStatus::Confirmed.confirm().is_err());
        assert!(DeliveryStatus::Cancelled.confirm().is_err());
    }

    #[test]
    fn test_deliver_from_open_states() {
        assert_eq!(DeliveryStatus::Draft.deliver(), Ok(DeliveryStatus::Delivered));
        assert_eq!(DeliveryStatus::Confirmed.deliver(), Ok(DeliveryStatus::Delivered));
        assert!(DeliveryStatus::Delivered.deliver().is_err());
        assert!(DeliveryStatus::Cancelled.deliver().is_err());
    }

    #[test]
    fn test_cannot_cancel_delivered() {
        assert!(DeliveryStatus::Delivered.cancel().is_err());
        assert!(DeliveryStatus::Cancelled.cancel().is_err());
        assert_eq!(DeliveryStatus::Confirmed.cancel(), Ok(DeliveryStatus::Cancelled));
    }

    #[test]
    fn test_validate_delivery_lines() {
        assert!(validate_delivery_lines(&[]).is_err());
        let product_id = Uuid::new_v4();
        assert!(validate_delivery_lines(&[DeliveryLineInput { product_id, quantity: 0 }]).is_err());
        assert!(validate_delivery_lines(&[DeliveryLineInput { product_id, quantity: 3 }]).is_ok());
    }

    #[test]
    fn test_processing_order_is_sorted_and_keeps_every_line() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let lines = vec![
            DeliveryLineInput { product_id: b, quantity: 1 },
            DeliveryLineInput { product_id: a, quantity: 2 },
            DeliveryLineInput { product_id: b, quantity: 3 },
        ];
        let ordered = delivery_processing_order(&lines);
        assert_eq!(ordered.len(), 3);
        assert_eq!(ordered[0].product_id, a);
        assert_eq!(ordered[1].quantity, 1);
        assert_eq!(ordered[2].quantity, 3);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone, Copy)]
        enum Step {
            Confirm,
            Deliver,
            Cancel,
        }

        fn step_strategy() -> impl Strategy<Value = Step> {
            prop_oneof![Just(Step::Confirm), Just(Step::Deliver), Just(Step::Cancel)]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            /// Stock leaves the warehouse at most once per delivery, and
            /// never after it was cancelled
            #[test]
            fn prop_delivery_ships_at_most_once(
                steps in prop::collection::vec(step_strategy(), 1..20)
            ) {
                let mut status = DeliveryStatus::Draft;
                let mut shipped = 0;
                let mut cancelled = false;
                for step in steps {
                    let result = match step {
                        Step::Confirm => status.confirm(),
                        Step::Deliver => status.deliver(),
                        Step::Cancel => status.cancel(),
                    };
                    if let Ok(next) = result {
                        prop_assert!(!status.is_terminal());
                        match next {
                            DeliveryStatus::Delivered => {
                                prop_assert!(!cancelled);
                                shipped += 1;
                            }
                            DeliveryStatus::Cancelled => cancelled = true,
                            _ => {}
                        }
                        status = next;
                    }
                }
                prop_assert!(shipped <= 1);
                prop_assert!(!(cancelled && shipped == 1));
            }
        }
    }
}
