//! Bounded retry-until-timeout polling

use std::time::{Duration, Instant};

use tokio::time::sleep;

/// Polling policy: how long to keep retrying and how often
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Wait {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Single attempt, no retries
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Start the clock for one polling loop
    pub fn start(&self) -> Deadline {
        Deadline {
            started: Instant::now(),
            policy: *self,
        }
    }
}

impl Default for Wait {
    fn default() -> Self {
        Self::new(Duration::from_millis(4000), Duration::from_millis(50))
    }
}

/// A running polling window
///
/// Callers attempt first and call [`Deadline::tick`] after each miss; the
/// first attempt always happens, even with a zero timeout.
#[derive(Debug)]
pub struct Deadline {
    started: Instant,
    policy: Wait,
}

impl Deadline {
    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.policy.timeout
    }

    /// Sleep until the next attempt; `false` once the window is exhausted
    pub async fn tick(&self) -> bool {
        let elapsed = self.started.elapsed();
        if elapsed >= self.policy.timeout {
            return false;
        }
        let remaining = self.policy.timeout - elapsed;
        sleep(self.policy.interval.min(remaining)).await;
        true
    }

    pub fn waited_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
