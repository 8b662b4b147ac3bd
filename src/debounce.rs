//! Search input debouncer.
//!
//! Two states: idle, or pending with a single scheduled value. Every new
//! input replaces the pending value and pushes the deadline out, so only the
//! latest keystroke can ever be applied.
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    Pending { value: String, deadline: Instant },
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    raw: String,
    active: String,
    state: State,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            raw: String::new(),
            active: String::new(),
            state: State::Idle,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            State::Pending { deadline, .. } => Some(*deadline),
            State::Idle => None,
        }
    }

    /// Record a keystroke. Cancels whatever was scheduled.
    pub fn input(&mut self, raw: impl Into<String>, now: Instant) {
        self.raw = raw.into();
        self.state = State::Pending {
            value: self.raw.clone(),
            deadline: now + self.delay,
        };
    }

    /// Apply the pending value if its deadline has passed.
    /// Returns the new active term only when it actually changed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let State::Pending { deadline, .. } = &self.state else {
            return None;
        };
        if now < *deadline {
            return None;
        }
        let State::Pending { value, .. } = std::mem::replace(&mut self.state, State::Idle) else {
            return None;
        };
        if value == self.active {
            return None;
        }
        debug!(term = %value, "debounced search term applied");
        self.active = value.clone();
        Some(value)
    }

    /// Drop any scheduled update.
    pub fn cancel(&mut self) {
        self.state = State::Idle;
    }

    /// Forget everything, as on a fresh mount.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.active.clear();
        self.state = State::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[test]
    fn burst_of_keystrokes_yields_single_update() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.input("j", t0);
        d.input("je", t0 + Duration::from_millis(120));
        assert_eq!(d.poll(t0 + Duration::from_millis(500)), None);
        d.input("jee", t0 + Duration::from_millis(480));
        assert_eq!(d.poll(t0 + Duration::from_millis(900)), None);
        assert_eq!(d.raw(), "jee");
        assert_eq!(d.active(), "");

        assert_eq!(d.poll(t0 + Duration::from_millis(980)).as_deref(), Some("jee"));
        assert_eq!(d.active(), "jee");
        assert!(!d.is_pending());
        assert_eq!(d.poll(t0 + Duration::from_secs(5)), None);
    }

    #[test]
    fn deadline_tracks_latest_input() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        assert_eq!(d.deadline(), None);
        d.input("a", t0);
        assert_eq!(d.deadline(), Some(t0 + DELAY));
        d.input("ab", t0 + Duration::from_millis(300));
        assert_eq!(d.deadline(), Some(t0 + Duration::from_millis(800)));
    }

    #[test]
    fn typing_back_to_active_term_is_not_a_change() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.input("neet", t0);
        assert!(d.poll(t0 + DELAY).is_some());
        d.input("nee", t0 + Duration::from_secs(1));
        d.input("neet", t0 + Duration::from_millis(1100));
        assert_eq!(d.poll(t0 + Duration::from_secs(2)), None);
        assert_eq!(d.active(), "neet");
    }

    #[test]
    fn cancel_prevents_late_update() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.input("physics", t0);
        d.cancel();
        assert_eq!(d.poll(t0 + Duration::from_secs(1)), None);
        assert_eq!(d.active(), "");
        assert_eq!(d.raw(), "physics");
    }
}
