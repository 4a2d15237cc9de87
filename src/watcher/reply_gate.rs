//! Per-author reply rate limiting.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Decides whether an automatic reply should be attempted for a given
/// author. Owned by the watch loop; entries live for the session.
pub struct ReplyGate {
    cooldown: Duration,
    last_reply_at: HashMap<String, Instant>,
}

impl ReplyGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_reply_at: HashMap::new(),
        }
    }

    /// Returns true iff a reply to `author_id` should be attempted
    /// now. On authorizing, the grant time is recorded before
    /// returning, so a burst from one author inside a single poll
    /// cycle cannot double-authorize.
    pub fn should_reply(&mut self, author_id: &str, enabled: bool, is_self: bool) -> bool {
        self.should_reply_at(author_id, enabled, is_self, Instant::now())
    }

    fn should_reply_at(
        &mut self,
        author_id: &str,
        enabled: bool,
        is_self: bool,
        now: Instant,
    ) -> bool {
        if !enabled || is_self {
            return false;
        }
        if let Some(last) = self.last_reply_at.get(author_id) {
            if now.saturating_duration_since(*last) < self.cooldown {
                return false;
            }
        }
        self.last_reply_at.insert(author_id.to_string(), now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_authorizes() {
        let mut gate = ReplyGate::new(Duration::from_secs(15));
        assert!(!gate.should_reply("A", false, false));
    }

    #[test]
    fn test_self_never_authorizes() {
        let mut gate = ReplyGate::new(Duration::from_secs(15));
        assert!(!gate.should_reply("me", true, true));
        // A denied self-check must not start a cooldown for the author.
        assert!(gate.should_reply("me", true, false));
    }

    #[test]
    fn test_cooldown_scenario() {
        // cooldown=15s: authorized at t=0, denied at t=10, authorized
        // again at t=20.
        let mut gate = ReplyGate::new(Duration::from_secs(15));
        let t0 = Instant::now();
        assert!(gate.should_reply_at("A", true, false, t0));
        assert!(!gate.should_reply_at("A", true, false, t0 + Duration::from_secs(10)));
        assert!(gate.should_reply_at("A", true, false, t0 + Duration::from_secs(20)));
    }

    #[test]
    fn test_burst_in_one_cycle_authorizes_once() {
        let mut gate = ReplyGate::new(Duration::from_secs(15));
        let t0 = Instant::now();
        assert!(gate.should_reply_at("A", true, false, t0));
        assert!(!gate.should_reply_at("A", true, false, t0));
        assert!(!gate.should_reply_at("A", true, false, t0));
    }

    #[test]
    fn test_authors_are_independent() {
        let mut gate = ReplyGate::new(Duration::from_secs(15));
        let t0 = Instant::now();
        assert!(gate.should_reply_at("A", true, false, t0));
        assert!(gate.should_reply_at("B", true, false, t0));
        assert!(!gate.should_reply_at("A", true, false, t0 + Duration::from_secs(1)));
    }
}
