use std::time::Duration;

/// Pluggable retry pacing for transient failures (backend bring-up, notes
/// commit). `next_delay` receives the number of failures so far (1-based)
/// and returns how long to wait before the next attempt, or `None` to give
/// up.
pub trait BackoffPolicy: Send + Sync {
    fn next_delay(&self, failures: u32) -> Option<Duration>;
}

/// Fixed inter-attempt delay with a bounded attempt count.
#[derive(Debug, Clone)]
pub struct FixedDelayBackoff {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl FixedDelayBackoff {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for FixedDelayBackoff {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(300),
        }
    }
}

impl BackoffPolicy for FixedDelayBackoff {
    fn next_delay(&self, failures: u32) -> Option<Duration> {
        if failures < self.max_attempts {
            Some(self.delay)
        } else {
            None
        }
    }
}
