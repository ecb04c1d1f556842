//! Capped exponential backoff for reconnects.

use std::time::Duration;

use refill_core::config::RealtimeConfig;

/// Reconnect delay schedule: starts at `initial`, doubles per consecutive
/// failure up to `max`, and stops after `max_attempts` reconnects.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    max_attempts: u32,
    attempts: u32,
    delay: Duration,
}

impl Backoff {
    /// Create a schedule.
    pub fn new(initial: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            max,
            max_attempts,
            attempts: 0,
            delay: initial,
        }
    }

    /// Schedule from the realtime configuration.
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self::new(
            config.reconnect_initial_delay(),
            config.reconnect_max_delay(),
            config.max_reconnect_attempts,
        )
    }

    /// Delay for the next reconnect, or `None` when attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        let delay = self.delay;
        self.attempts += 1;
        self.delay = (self.delay * 2).min(self.max);
        Some(delay)
    }

    /// Back to the initial delay with zero attempts.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.delay = self.initial;
    }

    /// Reconnects scheduled since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay the next reconnect would use.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether no further reconnect will be scheduled.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
