use std::time::{Duration, Instant};

/// Time source for the polling loops; tests substitute one that never sleeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Shortest pause between two polls of an external system.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Fixed-interval polling cadence with an optional wall-clock bound. The
/// interval never drops below [`MIN_INTERVAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl Cadence {
    pub fn bounded(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            timeout: Some(timeout),
        }
    }

    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            timeout: None,
        }
    }

    pub fn expired(&self, started: Instant, now: Instant) -> bool {
        self.timeout
            .is_some_and(|t| now.saturating_duration_since(started) >= t)
    }
}
