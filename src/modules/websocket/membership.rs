use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq)]
pub enum JoinStart {
    /// Already in the room
    Joined,
    /// A participant check for this conversation is still running
    InFlight,
    /// Caller should run the participant check
    Check,
}

/// Conversations a connection sits in, plus joins still waiting on their
/// participant check. A leave cancels an in-flight join.
#[derive(Debug, Default)]
pub struct Membership {
    joined: HashSet<Uuid>,
    pending: HashSet<Uuid>,
}

impl Membership {
    pub fn is_joined(&self, conversation_id: &Uuid) -> bool {
        self.joined.contains(conversation_id)
    }

    pub fn begin_join(&mut self, conversation_id: Uuid) -> JoinStart {
        if self.joined.contains(&conversation_id) {
            JoinStart::Joined
        } else if !self.pending.insert(conversation_id) {
            JoinStart::InFlight
        } else {
            JoinStart::Check
        }
    }

    /// Apply a passed check; `false` when the join was cancelled meanwhile
    pub fn complete_join(&mut self, conversation_id: Uuid) -> bool {
        self.pending.remove(&conversation_id) && self.joined.insert(conversation_id)
    }

    /// Drop a failed check; `false` when the join was cancelled meanwhile
    pub fn fail_join(&mut self, conversation_id: Uuid) -> bool {
        self.pending.remove(&conversation_id)
    }

    /// `true` if the connection was in the room
    pub fn leave(&mut self, conversation_id: Uuid) -> bool {
        self.pending.remove(&conversation_id);
        self.joined.remove(&conversation_id)
    }

    pub fn clear(&mut self) {
        self.joined.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passed_check_joins_the_room() {
        let mut membership = Membership::default();
        let conv = Uuid::now_v7();
        assert_eq!(membership.begin_join(conv), JoinStart::Check);
        assert!(!membership.is_joined(&conv));
        assert!(membership.complete_join(conv));
        assert!(membership.is_joined(&conv));
        assert_eq!(membership.begin_join(conv), JoinStart::Joined);
    }

    #[test]
    fn leave_during_check_cancels_the_join() {
        let mut membership = Membership::default();
        let conv = Uuid::now_v7();
        membership.begin_join(conv);
        assert!(!membership.leave(conv));
        assert!(!membership.complete_join(conv));
        assert!(!membership.is_joined(&conv));
    }

    #[test]
    fn repeated_join_runs_one_check() {
        let mut membership = Membership::default();
        let conv = Uuid::now_v7();
        assert_eq!(membership.begin_join(conv), JoinStart::Check);
        assert_eq!(membership.begin_join(conv), JoinStart::InFlight);
        assert!(membership.complete_join(conv));
        assert!(!membership.complete_join(conv));
    }

    #[test]
    fn failed_check_allows_a_retry() {
        let mut membership = Membership::default();
        let conv = Uuid::now_v7();
        membership.begin_join(conv);
        assert!(membership.fail_join(conv));
        assert_eq!(membership.begin_join(conv), JoinStart::Check);
    }
}
