//! Movement log models
//!
//! IN and OUT carry a positive magnitude whose sign comes from the type.
//! ADJUSTMENT carries a signed delta supplied by the caller.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Type of a stock movement as stored in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(MovementType::In),
            "OUT" => Ok(MovementType::Out),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            _ => Err(DomainError::UnknownValue {
                kind: "movement type",
                value: s.to_string(),
            }),
        }
    }
}

/// Quantity of a movement, tagged by its type
///
/// Serialized as `{"type": "IN", "quantity": 5}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "quantity", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementQuantity {
    In(i32),
    Out(i32),
    /// Signed delta added directly to stock
    Adjustment(i32),
}

impl MovementQuantity {
    pub fn validate(&self) -> DomainResult<()> {
        match *self {
            MovementQuantity::In(q) | MovementQuantity::Out(q) if q <= 0 => Err(
                DomainError::invalid_argument("quantity", "Quantity must be greater than zero"),
            ),
            MovementQuantity::Adjustment(0) => Err(DomainError::invalid_argument(
                "quantity",
                "Adjustment quantity cannot be zero",
            )),
            _ => Ok(()),
        }
    }

    pub fn movement_type(&self) -> MovementType {
        match self {
            MovementQuantity::In(_) => MovementType::In,
            MovementQuantity::Out(_) => MovementType::Out,
            MovementQuantity::Adjustment(_) => MovementType::Adjustment,
        }
    }

    /// Value written to the `quantity` column
    pub fn stored_quantity(&self) -> i32 {
        match *self {
            MovementQuantity::In(q) | MovementQuantity::Out(q) | MovementQuantity::Adjustment(q) => q,
        }
    }

    /// Effect on stock counters
    pub fn signed_delta(&self) -> i64 {
        match *self {
            MovementQuantity::In(q) => i64::from(q),
            MovementQuantity::Out(q) => -i64::from(q),
            MovementQuantity::Adjustment(d) => i64::from(d),
        }
    }

    /// Rebuild from a stored row
    pub fn from_stored(movement_type: MovementType, quantity: i32) -> Self {
        match movement_type {
            MovementType::In => MovementQuantity::In(quantity),
            MovementType::Out => MovementQuantity::Out(quantity),
            MovementType::Adjustment => MovementQuantity::Adjustment(quantity),
        }
    }
}

/// Apply a signed delta to a counter that must never go negative
pub fn apply_delta(current: i64, delta: i64) -> DomainResult<i64> {
    let next = current + delta;
    if next < 0 {
        return Err(DomainError::InsufficientStock {
            requested: -delta,
            available: current,
        });
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_delta() {
        assert_eq!(MovementQuantity::In(5).signed_delta(), 5);
        assert_eq!(MovementQuantity::Out(5).signed_delta(), -5);
        assert_eq!(MovementQuantity::Adjustment(-3).signed_delta(), -3);
        assert_eq!(MovementQuantity::Adjustment(7).signed_delta(), 7);
    }

    #[test]
    fn test_validate_rejects_non_positive_magnitudes() {
        assert!(MovementQuantity::In(0).validate().is_err());
        assert!(MovementQuantity::Out(-1).validate().is_err());
        assert!(MovementQuantity::Adjustment(0).validate().is_err());
        assert!(MovementQuantity::Adjustment(-4).validate().is_ok());
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&MovementQuantity::Adjustment(-2)).unwrap();
        assert_eq!(json, r#"{"type":"ADJUSTMENT","quantity":-2}"#);

        let parsed: MovementQuantity =
            serde_json::from_str(r#"{"type":"OUT","quantity":4}"#).unwrap();
        assert_eq!(parsed, MovementQuantity::Out(4));
    }

    #[test]
    fn test_movement_type_round_trip_through_str() {
        for t in [MovementType::In, MovementType::Out, MovementType::Adjustment] {
            assert_eq!(t.as_str().parse::<MovementType>().unwrap(), t);
        }
        assert!("TRANSFER".parse::<MovementType>().is_err());
    }

    #[test]
    fn test_apply_delta() {
        assert_eq!(apply_delta(10, -10).unwrap(), 0);
        assert_eq!(apply_delta(10, 5).unwrap(), 15);
        assert_eq!(
            apply_delta(3, -4),
            Err(DomainError::InsufficientStock {
                requested: 4,
                available: 3
            })
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn movement_strategy() -> impl Strategy<Value = MovementQuantity> {
            prop_oneof![
                (1i32..500).prop_map(MovementQuantity::In),
                (1i32..500).prop_map(MovementQuantity::Out),
                (-500i32..500)
                    .prop_filter("adjustment is non-zero", |d| *d != 0)
                    .prop_map(MovementQuantity::Adjustment),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            /// A counter fed through apply_delta never goes negative, and a
            /// refused delta leaves it untouched
            #[test]
            fn prop_counter_never_negative(
                movements in prop::collection::vec(movement_strategy(), 1..50)
            ) {
                let mut stock = 0i64;
                for movement in &movements {
                    let delta = movement.signed_delta();
                    match apply_delta(stock, delta) {
                        Ok(next) => {
                            prop_assert_eq!(next, stock + delta);
                            stock = next;
                        }
                        Err(_) => prop_assert!(stock + delta < 0),
                    }
                    prop_assert!(stock >= 0);
                }
            }
        }
    }
}
