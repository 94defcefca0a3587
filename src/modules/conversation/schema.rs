use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::api::error;

/// A 1:1 conversation. The pair is stored normalised (`user_low < user_high`)
/// so that one unordered pair maps to exactly one row.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationEntity {
    pub id: Uuid,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ConversationEntity {
    pub fn includes(&self, user_id: &Uuid) -> bool {
        self.user_low == *user_id || self.user_high == *user_id
    }

    pub fn peer_of(&self, user_id: &Uuid) -> Option<Uuid> {
        if self.user_low == *user_id {
            Some(self.user_high)
        } else if self.user_high == *user_id {
            Some(self.user_low)
        } else {
            None
        }
    }
}

pub fn normalize_pair(a: Uuid, b: Uuid) -> Result<(Uuid, Uuid), error::SystemError> {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => Ok((a, b)),
        std::cmp::Ordering::Greater => Ok((b, a)),
        std::cmp::Ordering::Equal => {
            Err(error::SystemError::bad_request("Cannot start a conversation with yourself"))
        }
    }
}

/// Read cursors only move forward; returns the new position if `proposed` is ahead
pub fn advance_cursor(current: i64, proposed: i64) -> Option<i64> {
    (proposed > current).then_some(proposed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_independent() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        assert_eq!(normalize_pair(a, b).unwrap(), normalize_pair(b, a).unwrap());
        let (low, high) = normalize_pair(b, a).unwrap();
        assert!(low < high);
    }

    #[test]
    fn pair_with_self_is_rejected() {
        let a = Uuid::now_v7();
        assert!(matches!(normalize_pair(a, a), Err(error::SystemError::BadRequest(_))));
    }

    #[test]
    fn read_cursor_never_regresses() {
        let mut cursor = 0;
        for proposed in [5, 3, 8] {
            if let Some(next) = advance_cursor(cursor, proposed) {
                cursor = next;
            }
        }
        assert_eq!(cursor, 8);
        assert_eq!(advance_cursor(8, 8), None);
    }

    #[test]
    fn peer_is_the_other_participant() {
        let (low, high) = normalize_pair(Uuid::now_v7(), Uuid::now_v7()).unwrap();
        let conv = ConversationEntity {
            id: Uuid::now_v7(),
            user_low: low,
            user_high: high,
            created_at: chrono::Utc::now(),
        };
        assert_eq!(conv.peer_of(&low), Some(high));
        assert_eq!(conv.peer_of(&high), Some(low));
        assert_eq!(conv.peer_of(&Uuid::now_v7()), None);
        assert!(!conv.includes(&Uuid::now_v7()));
    }
}
