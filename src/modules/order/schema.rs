use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use std::str::FromStr;
use uuid::Uuid;

use crate::api::error;

/// `pending -> confirmed -> shipped -> completed`, with `canceled` reachable
/// from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Canceled)
    }

    // position on the fulfilment path; canceled sits off the path
    fn stage(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Completed => Some(3),
            OrderStatus::Canceled => None,
        }
    }

    /// Edges of the transition graph
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Shipped)
                | (Shipped, Completed)
                | (Pending, Canceled)
                | (Confirmed, Canceled)
                | (Shipped, Canceled)
        )
    }

    /// Admin corrections may skip ahead along the path, never backwards or out of a terminal state
    pub fn can_skip_to(&self, next: OrderStatus) -> bool {
        if self.can_transition_to(next) {
            return true;
        }
        match (self.stage(), next.stage()) {
            (Some(from), Some(to)) => !self.is_terminal() && to > from,
            _ => false,
        }
    }

    pub fn check_transition(
        &self,
        next: OrderStatus,
        allow_skip: bool,
    ) -> Result<(), error::SystemError> {
        let allowed =
            if allow_skip { self.can_skip_to(next) } else { self.can_transition_to(next) };
        if allowed {
            Ok(())
        } else {
            Err(error::SystemError::invalid_transition(format!(
                "Cannot change order status from {} to {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

impl FromStr for OrderStatus {
    type Err = error::SystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| error::SystemError::invalid_transition(format!("Unknown status '{s}'")))
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderEntity {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Option<Uuid>,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItemEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;

    #[test]
    fn follows_the_fulfilment_path() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn cancel_is_allowed_until_completion() {
        for from in [Pending, Confirmed, Shipped] {
            assert!(from.can_transition_to(Canceled));
        }
        assert!(!Completed.can_transition_to(Canceled));
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for to in OrderStatus::ALL {
            assert!(!Completed.can_transition_to(to));
            assert!(!Canceled.can_transition_to(to));
            assert!(!Completed.can_skip_to(to));
            assert!(!Canceled.can_skip_to(to));
        }
    }

    #[test]
    fn skipping_ahead_never_goes_backwards() {
        assert!(Pending.can_skip_to(Completed));
        assert!(Pending.can_skip_to(Shipped));
        assert!(!Shipped.can_skip_to(Confirmed));
        assert!(!Confirmed.can_skip_to(Pending));
    }

    #[test]
    fn rejected_transition_is_invalid_transition() {
        assert!(matches!(
            Pending.check_transition(Shipped, false),
            Err(error::SystemError::InvalidTransition(_))
        ));
        assert!(Pending.check_transition(Shipped, true).is_ok());
        assert!(Pending.check_transition(Confirmed, false).is_ok());
    }

    #[test]
    fn parses_status_names() {
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), Shipped);
        assert!(matches!(
            "refunded".parse::<OrderStatus>(),
            Err(error::SystemError::InvalidTransition(_))
        ));
    }
}
