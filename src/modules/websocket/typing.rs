use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Quiet period after which an unrefreshed typing indicator is cleared
pub const TYPING_TIMEOUT: Duration = Duration::from_millis(1500);

/// Per-connection typing indicators. Each `typing true` bumps a generation;
/// a scheduled expiry only clears the indicator if no newer keystroke arrived.
#[derive(Debug, Default)]
pub struct TypingTracker {
    active: HashMap<Uuid, u64>,
    generation: u64,
}

impl TypingTracker {
    /// Returns whether the indicator just turned on, plus the generation to expire
    pub fn start(&mut self, conversation_id: Uuid) -> (bool, u64) {
        self.generation += 1;
        let started = self.active.insert(conversation_id, self.generation).is_none();
        (started, self.generation)
    }

    /// `true` if the indicator was on and is now off
    pub fn stop(&mut self, conversation_id: Uuid) -> bool {
        self.active.remove(&conversation_id).is_some()
    }

    /// Expire the indicator if `generation` is still the latest keystroke
    pub fn expire(&mut self, conversation_id: Uuid, generation: u64) -> bool {
        if self.active.get(&conversation_id) == Some(&generation) {
            self.active.remove(&conversation_id);
            return true;
        }
        false
    }

    /// Clear everything, returning the conversations that still showed an indicator
    pub fn drain(&mut self) -> Vec<Uuid> {
        self.active.drain().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keystrokes_announce_once() {
        let mut tracker = TypingTracker::default();
        let conv = Uuid::now_v7();
        assert!(tracker.start(conv).0);
        assert!(!tracker.start(conv).0);
        assert!(tracker.stop(conv));
        assert!(!tracker.stop(conv));
    }

    #[test]
    fn stale_expiry_does_not_clear_a_refreshed_indicator() {
        let mut tracker = TypingTracker::default();
        let conv = Uuid::now_v7();
        let (_, first) = tracker.start(conv);
        let (_, second) = tracker.start(conv);
        assert!(!tracker.expire(conv, first));
        assert!(tracker.expire(conv, second));
        assert!(!tracker.stop(conv));
    }

    #[test]
    fn expiry_after_explicit_stop_is_a_no_op() {
        let mut tracker = TypingTracker::default();
        let conv = Uuid::now_v7();
        let (_, generation) = tracker.start(conv);
        assert!(tracker.stop(conv));
        assert!(!tracker.expire(conv, generation));
    }

    #[test]
    fn drain_reports_active_indicators() {
        let mut tracker = TypingTracker::default();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        tracker.start(a);
        tracker.start(b);
        tracker.stop(b);
        assert_eq!(tracker.drain(), vec![a]);
        assert!(tracker.drain().is_empty());
    }
}
