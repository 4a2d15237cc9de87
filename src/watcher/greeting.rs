//! Connect/disconnect greeting edges.
//!
//! Tracks whether the chat feed is currently resolvable and emits the
//! start greeting on the disconnected→connected edge and the end
//! greeting on the connected→disconnected edge, each at most once.
//! The end greeting shares one latch with the stop-triggered farewell
//! so the two paths can never both send it for the same session.

/// Greeting state machine, fed one "resolvable now" boolean per poll
/// cycle. Initial state is disconnected.
pub struct GreetingStateMachine {
    start_text: String,
    end_text: String,
    connected: bool,
    farewell_sent: bool,
}

impl GreetingStateMachine {
    /// Create with the greeting texts to emit. Callers may pass
    /// overrides in place of the character's configured texts.
    pub fn new(start_text: String, end_text: String) -> Self {
        Self {
            start_text,
            end_text,
            connected: false,
            farewell_sent: false,
        }
    }

    /// Advance the machine with the current cycle's resolvability.
    /// Returns the greeting text to send, if this poll is an edge.
    pub fn observe(&mut self, resolvable: bool) -> Option<String> {
        match (self.connected, resolvable) {
            (false, true) => {
                self.connected = true;
                self.farewell_sent = false;
                Some(self.start_text.clone())
            }
            (true, false) => {
                self.connected = false;
                if self.farewell_sent {
                    None
                } else {
                    self.farewell_sent = true;
                    Some(self.end_text.clone())
                }
            }
            _ => None,
        }
    }

    /// Consume the farewell for the current connected session, for the
    /// stop-triggered path. Returns `None` when not connected or when
    /// the farewell already went out.
    pub fn take_farewell(&mut self) -> Option<String> {
        if self.connected && !self.farewell_sent {
            self.farewell_sent = true;
            Some(self.end_text.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> GreetingStateMachine {
        GreetingStateMachine::new("hello".into(), "goodbye".into())
    }

    #[test]
    fn test_edges_emit_exactly_once() {
        // Any F* T+ F+ sequence yields one start and one end.
        for (leading_f, ts, fs) in [(0, 1, 1), (3, 1, 2), (0, 4, 1), (2, 3, 3)] {
            let mut m = machine();
            let mut starts = 0;
            let mut ends = 0;
            let mut count = |g: Option<String>| match g.as_deref() {
                Some("hello") => starts += 1,
                Some("goodbye") => ends += 1,
                Some(other) => panic!("unexpected greeting {other}"),
                None => {}
            };

            for _ in 0..leading_f {
                count(m.observe(false));
            }
            for _ in 0..ts {
                count(m.observe(true));
            }
            for _ in 0..fs {
                count(m.observe(false));
            }

            assert_eq!(starts, 1, "sequence F^{leading_f} T^{ts} F^{fs}");
            assert_eq!(ends, 1, "sequence F^{leading_f} T^{ts} F^{fs}");
        }
    }

    #[test]
    fn test_self_transitions_are_noops() {
        let mut m = machine();
        assert!(m.observe(false).is_none());
        assert_eq!(m.observe(true).as_deref(), Some("hello"));
        assert!(m.observe(true).is_none());
        assert!(m.observe(true).is_none());
    }

    #[test]
    fn test_reconnect_emits_again() {
        let mut m = machine();
        assert_eq!(m.observe(true).as_deref(), Some("hello"));
        assert_eq!(m.observe(false).as_deref(), Some("goodbye"));
        // A fresh session gets fresh greetings.
        assert_eq!(m.observe(true).as_deref(), Some("hello"));
        assert_eq!(m.observe(false).as_deref(), Some("goodbye"));
    }

    #[test]
    fn test_stop_farewell_suppresses_edge_farewell() {
        let mut m = machine();
        m.observe(true);
        assert_eq!(m.take_farewell().as_deref(), Some("goodbye"));
        // The disconnect edge must not send it a second time.
        assert!(m.observe(false).is_none());
    }

    #[test]
    fn test_edge_farewell_suppresses_stop_farewell() {
        let mut m = machine();
        m.observe(true);
        assert_eq!(m.observe(false).as_deref(), Some("goodbye"));
        assert!(m.take_farewell().is_none());
    }

    #[test]
    fn test_farewell_requires_connection() {
        let mut m = machine();
        assert!(m.take_farewell().is_none());
    }
}
