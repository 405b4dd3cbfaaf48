//! The order state machine.
//!
//! This module is pure logic: it maps (current status, incoming event) pairs to a new status and an ordered list
//! of settlement side effects, and performs no I/O of its own. The [`order_flow`](crate::order_flow) API is
//! responsible for applying the status change atomically and executing the side effects.
//!
//! Provider events are accepted from any current status except the target status itself; a self-transition is
//! reported as [`TransitionError::NoOp`] so that duplicate deliveries (the broker is at-least-once) settle an
//! order exactly once. User-initiated cancellation is only legal while the order is still `pending`.
use std::{fmt::Display, str::FromStr};

use thiserror::Error;

use crate::db_types::OrderStatusType;

//--------------------------------------    PaymentEvent     --------------------------------------------------------
/// An event reported by the payment service on the `payment_status` topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEvent {
    /// The payment service has registered the order and started collecting payment.
    Created,
    /// Payment completed.
    Succeeded,
    /// Payment failed.
    Failed,
    /// A completed payment was refunded.
    Refunded,
}

#[derive(Debug, Clone, Error)]
#[error("Unknown payment event: {0}")]
pub struct UnknownEvent(String);

impl FromStr for PaymentEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            s => Err(UnknownEvent(s.to_string())),
        }
    }
}

impl Display for PaymentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentEvent::Created => write!(f, "created"),
            PaymentEvent::Succeeded => write!(f, "succeeded"),
            PaymentEvent::Failed => write!(f, "failed"),
            PaymentEvent::Refunded => write!(f, "refunded"),
        }
    }
}

//--------------------------------------     SideEffect      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    /// Decrement stock by each order item's quantity (order settled successfully).
    Down,
    /// Restore stock by each order item's quantity (order refunded).
    Up,
}

impl Display for StockDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockDirection::Down => write!(f, "down"),
            StockDirection::Up => write!(f, "up"),
        }
    }
}

/// A settlement job triggered by a status change. Jobs are executed in the order they appear in a
/// [`Transition`], and each one is idempotent because broker delivery is at-least-once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    AdjustStock(StockDirection),
    ClearCart,
    NotifyUserService,
    Broadcast,
    NotifyPaymentService,
}

//--------------------------------------     Transition      --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub new_status: OrderStatusType,
    pub effects: Vec<SideEffect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Order is already in the {0} state")]
    NoOp(OrderStatusType),
    #[error("Order can only be cancelled in the pending state, but it is {current}")]
    NotCancellable { current: OrderStatusType },
}

/// Applies a payment-service event to the given order status.
///
/// | Event       | New status   | Side effects (in order)                          |
/// |-------------|--------------|--------------------------------------------------|
/// | `created`   | `processing` | notify user service, broadcast                   |
/// | `succeeded` | `successful` | stock down, clear cart, notify, broadcast        |
/// | `failed`    | `failed`     | notify user service, broadcast                   |
/// | `refunded`  | `refunded`   | stock up, notify user service, broadcast         |
///
/// Cart clearing is success-only; a refund restores stock but leaves the (already empty) cart alone.
pub fn apply(current: OrderStatusType, event: PaymentEvent) -> Result<Transition, TransitionError> {
    use OrderStatusType::*;
    use SideEffect::*;
    let (new_status, effects) = match event {
        PaymentEvent::Created => (Processing, vec![NotifyUserService, Broadcast]),
        PaymentEvent::Succeeded => {
            (Successful, vec![AdjustStock(StockDirection::Down), ClearCart, NotifyUserService, Broadcast])
        },
        PaymentEvent::Failed => (Failed, vec![NotifyUserService, Broadcast]),
        PaymentEvent::Refunded => (Refunded, vec![AdjustStock(StockDirection::Up), NotifyUserService, Broadcast]),
    };
    if current == new_status {
        return Err(TransitionError::NoOp(current));
    }
    Ok(Transition { new_status, effects })
}

/// Applies a user-initiated cancellation. Only pending orders can be cancelled; anything further along must go
/// through the refund workflow on the payment service side.
pub fn cancel(current: OrderStatusType) -> Result<Transition, TransitionError> {
    match current {
        OrderStatusType::Pending => Ok(Transition {
            new_status: OrderStatusType::Cancelled,
            effects: vec![SideEffect::NotifyPaymentService],
        }),
        other => Err(TransitionError::NotCancellable { current: other }),
    }
}

/// The set of statuses from which a transition into `target` is accepted, i.e. everything except `target`
/// itself. Used by the store's conditional update so that a duplicate delivery matches zero rows.
pub fn accepted_from(target: OrderStatusType) -> Vec<OrderStatusType> {
    OrderStatusType::ALL.into_iter().filter(|s| *s != target).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::OrderStatusType::*;

    #[test]
    fn provider_events_parse() {
        assert_eq!("created".parse::<PaymentEvent>().unwrap(), PaymentEvent::Created);
        assert_eq!("succeeded".parse::<PaymentEvent>().unwrap(), PaymentEvent::Succeeded);
        assert_eq!("failed".parse::<PaymentEvent>().unwrap(), PaymentEvent::Failed);
        assert_eq!("refunded".parse::<PaymentEvent>().unwrap(), PaymentEvent::Refunded);
        assert!("paid".parse::<PaymentEvent>().is_err());
        assert!("".parse::<PaymentEvent>().is_err());
    }

    #[test]
    fn created_moves_to_processing_from_any_other_state() {
        for current in [Pending, Successful, Failed, Cancelled, Refunded] {
            let t = apply(current, PaymentEvent::Created).unwrap();
            assert_eq!(t.new_status, Processing);
            assert_eq!(t.effects, vec![SideEffect::NotifyUserService, SideEffect::Broadcast]);
        }
        assert_eq!(apply(Processing, PaymentEvent::Created), Err(TransitionError::NoOp(Processing)));
    }

    #[test]
    fn succeeded_settles_in_order() {
        let t = apply(Processing, PaymentEvent::Succeeded).unwrap();
        assert_eq!(t.new_status, Successful);
        assert_eq!(t.effects, vec![
            SideEffect::AdjustStock(StockDirection::Down),
            SideEffect::ClearCart,
            SideEffect::NotifyUserService,
            SideEffect::Broadcast,
        ]);
    }

    #[test]
    fn failed_notifies_and_broadcasts_only() {
        let t = apply(Processing, PaymentEvent::Failed).unwrap();
        assert_eq!(t.new_status, Failed);
        assert_eq!(t.effects, vec![SideEffect::NotifyUserService, SideEffect::Broadcast]);
    }

    #[test]
    fn refund_restores_stock_but_not_the_cart() {
        let t = apply(Successful, PaymentEvent::Refunded).unwrap();
        assert_eq!(t.new_status, Refunded);
        assert_eq!(t.effects, vec![
            SideEffect::AdjustStock(StockDirection::Up),
            SideEffect::NotifyUserService,
            SideEffect::Broadcast,
        ]);
        assert!(!t.effects.contains(&SideEffect::ClearCart));
    }

    #[test]
    fn duplicate_events_are_no_ops() {
        assert_eq!(apply(Successful, PaymentEvent::Succeeded), Err(TransitionError::NoOp(Successful)));
        assert_eq!(apply(Failed, PaymentEvent::Failed), Err(TransitionError::NoOp(Failed)));
        assert_eq!(apply(Refunded, PaymentEvent::Refunded), Err(TransitionError::NoOp(Refunded)));
    }

    #[test]
    fn cancel_only_from_pending() {
        let t = cancel(Pending).unwrap();
        assert_eq!(t.new_status, Cancelled);
        assert_eq!(t.effects, vec![SideEffect::NotifyPaymentService]);
        for current in [Processing, Successful, Failed, Cancelled, Refunded] {
            assert_eq!(cancel(current), Err(TransitionError::NotCancellable { current }));
        }
    }

    #[test]
    fn accepted_from_excludes_the_target() {
        let accepted = accepted_from(Successful);
        assert_eq!(accepted.len(), 5);
        assert!(!accepted.contains(&Successful));
    }
}
