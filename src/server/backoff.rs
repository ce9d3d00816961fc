//! Retry timing for the accept loop.

use std::time::Duration;

/// Exponential back-off applied after a failed `accept()`.
///
/// The first retry waits `initial_delay`; each further consecutive failure
/// doubles the wait up to `max_delay`. A successful accept starts over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl BackoffConfig {
    /// Clamps both delays to at least 1 ms and orders them.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.initial_delay = self.initial_delay.max(Duration::from_millis(1));
        self.max_delay = self.max_delay.max(Duration::from_millis(1));
        if self.initial_delay > self.max_delay {
            std::mem::swap(&mut self.initial_delay, &mut self.max_delay);
        }
        self
    }

    /// Delay to use after the one that just elapsed.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_orders_and_clamps() {
        let cfg = BackoffConfig {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::ZERO,
        }
        .normalized();

        assert_eq!(cfg.initial_delay, Duration::from_millis(1));
        assert_eq!(cfg.max_delay, Duration::from_millis(5));
    }

    #[test]
    fn next_delay_doubles_up_to_cap() {
        let cfg = BackoffConfig::default();
        let mut delay = cfg.initial_delay;
        let mut seen = Vec::new();
        for _ in 0..9 {
            seen.push(delay.as_millis());
            delay = cfg.next_delay(delay);
        }

        assert_eq!(seen, vec![10, 20, 40, 80, 160, 320, 640, 1000, 1000]);
    }
}
