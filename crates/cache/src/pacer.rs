//! Cool-down pacing for the external insight-generation call.

use funnel_core::config::PacingConfig;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Minimum-interval pacer for an expensive external call.
///
/// The pacer never sleeps: `required_wait` reports the remaining cool-down
/// and the caller decides how to spend it, so no lock is ever held across
/// the external call itself.
pub struct CallPacer {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl CallPacer {
    pub fn new(config: &PacingConfig) -> Self {
        Self {
            min_interval: Duration::from_millis(config.min_call_interval_ms),
            last_call: Mutex::new(None),
        }
    }

    /// Remaining cool-down before the next call may be made, if any.
    pub fn required_wait(&self) -> Option<Duration> {
        let last_call = self.last_call.lock();
        let elapsed = (*last_call)?.elapsed();

        if elapsed < self.min_interval {
            let wait = self.min_interval - elapsed;
            debug!(wait_ms = wait.as_millis() as u64, "External call pacing");
            Some(wait)
        } else {
            None
        }
    }

    /// Record that a call was just made.
    pub fn mark(&self) {
        *self.last_call.lock() = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacer(min_call_interval_ms: u64) -> CallPacer {
        CallPacer::new(&PacingConfig {
            min_call_interval_ms,
        })
    }

    #[test]
    fn test_first_call_needs_no_wait() {
        assert!(pacer(1000).required_wait().is_none());
    }

    #[test]
    fn test_back_to_back_calls_are_paced() {
        let pacer = pacer(10_000);
        pacer.mark();

        let wait = pacer.required_wait().expect("cool-down expected");
        assert!(wait <= Duration::from_millis(10_000));
        assert!(wait > Duration::from_millis(5_000));
    }

    #[test]
    fn test_cool_down_expires() {
        let pacer = pacer(20);
        pacer.mark();
        std::thread::sleep(Duration::from_millis(30));
        assert!(pacer.required_wait().is_none());
    }
}
