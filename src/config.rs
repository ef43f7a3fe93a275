// ABOUTME: Tunable timing/sizing knobs for a Session, defaulting to the reference protocol constants

use std::time::Duration;

/// Session-level tuning knobs. `Default` reproduces the reference protocol's
/// hardcoded constants; fields are exposed individually (in the same
/// builder-with-`Default` idiom as `KeepAliveConfig`) so callers that need
/// tighter liveness timing — tests in particular — don't have to accept the
/// production cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Ceiling, in bytes, on the session's inbound byte buffer.
    pub max_buffer: usize,
    /// Number of CONNECT attempts a dialer makes before giving up.
    pub dial_attempts: u32,
    /// How long a listener/dialer waits for each handshake step.
    pub handshake_timeout: Duration,
    /// How often an unacknowledged DATA message is retransmitted.
    pub retransmit_interval: Duration,
    /// How often a PING is sent on an otherwise-idle session.
    pub ping_interval: Duration,
    /// How long the session waits without receiving anything before
    /// declaring the peer gone.
    pub idle_timeout: Duration,
    /// Grace period for a write to rendezvous with its ack before moving on.
    pub ack_delivery_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_buffer: 1024 * 1024,
            dial_attempts: 5,
            handshake_timeout: Duration::from_secs(1),
            retransmit_interval: Duration::from_millis(15),
            ping_interval: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(5),
            ack_delivery_timeout: Duration::from_millis(1),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    pub fn with_dial_attempts(mut self, dial_attempts: u32) -> Self {
        self.dial_attempts = dial_attempts;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_retransmit_interval(mut self, interval: Duration) -> Self {
        self.retransmit_interval = interval;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_ack_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.ack_delivery_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_constants() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.max_buffer, 1024 * 1024);
        assert_eq!(cfg.dial_attempts, 5);
        assert_eq!(cfg.handshake_timeout, Duration::from_secs(1));
        assert_eq!(cfg.retransmit_interval, Duration::from_millis(15));
        assert_eq!(cfg.ping_interval, Duration::from_secs(1));
        assert_eq!(cfg.idle_timeout, Duration::from_secs(5));
        assert_eq!(cfg.ack_delivery_timeout, Duration::from_millis(1));
    }

    #[test]
    fn builder_methods_override_individual_fields() {
        let cfg = SessionConfig::new()
            .with_idle_timeout(Duration::from_millis(50))
            .with_ping_interval(Duration::from_millis(10));
        assert_eq!(cfg.idle_timeout, Duration::from_millis(50));
        assert_eq!(cfg.ping_interval, Duration::from_millis(10));
        // Untouched fields keep their defaults.
        assert_eq!(cfg.max_buffer, 1024 * 1024);
    }
}
