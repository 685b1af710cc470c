//! Transient status line
//!
//! Shows a message for a while, then falls back to "Ready". Expiry is
//! checked against an explicit `Instant` supplied by the host.

use std::time::{Duration, Instant};

pub const DEFAULT_STATUS: &str = "Ready";

#[derive(Debug, Clone)]
pub struct StatusLine {
    message: Option<(String, Instant)>,
    timeout: Duration,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

impl StatusLine {
    pub fn new(timeout: Duration) -> Self {
        Self {
            message: None,
            timeout,
        }
    }

    /// Show `message` starting at `now`.
    pub fn set(&mut self, message: impl Into<String>, now: Instant) {
        self.message = Some((message.into(), now + self.timeout));
    }

    /// The text to display at `now`.
    pub fn text(&self, now: Instant) -> &str {
        match &self.message {
            Some((message, expires)) if now < *expires => message,
            _ => DEFAULT_STATUS,
        }
    }

    /// When the current message reverts, for arming a host timer.
    pub fn expires_at(&self) -> Option<Instant> {
        self.message.as_ref().map(|(_, at)| *at)
    }

    /// Drop an expired message. Returns whether the text changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match &self.message {
            Some((_, expires)) if now >= *expires => {
                self.message = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_reverts_after_timeout() {
        let start = Instant::now();
        let mut status = StatusLine::new(Duration::from_millis(3000));
        assert_eq!(status.text(start), DEFAULT_STATUS);

        status.set("File saved", start);
        assert_eq!(status.text(start + Duration::from_millis(2999)), "File saved");
        assert_eq!(status.text(start + Duration::from_millis(3000)), DEFAULT_STATUS);
        assert!(status.tick(start + Duration::from_millis(3000)));
        assert!(!status.tick(start + Duration::from_millis(4000)));
        assert_eq!(status.expires_at(), None);
    }

    #[test]
    fn test_new_message_restarts_timer() {
        let start = Instant::now();
        let mut status = StatusLine::new(Duration::from_millis(1000));
        status.set("one", start);
        status.set("two", start + Duration::from_millis(900));
        assert_eq!(status.text(start + Duration::from_millis(1500)), "two");
    }
}
