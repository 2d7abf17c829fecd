use std::sync::Arc;
use std::time::Duration;
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use tracing::trace;

/// Spaces out task launches by a fixed delay using a governor quota of
/// one permit per period. The first launch is never delayed.
/// A zero delay disables pacing entirely.
#[derive(Clone)]
pub struct LaunchPacer {
    limiter: Option<Arc<GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    name: String,
    delay: Duration,
}

impl LaunchPacer {
    pub fn new(name: &str, delay: Duration) -> Self {
        // `with_period` yields a burst of one and rejects a zero period
        let limiter = Quota::with_period(delay).map(|quota| Arc::new(GovernorRateLimiter::direct(quota)));

        Self {
            limiter,
            name: name.to_string(),
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until the next launch is allowed
    pub async fn acquire(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        loop {
            match limiter.check() {
                Ok(_) => {
                    trace!(pacer = %self.name, delay_ms = self.delay.as_millis() as u64, "Launch permitted");
                    break;
                }
                Err(not_until) => {
                    let clock = DefaultClock::default();
                    let wait_duration = not_until.wait_time_from(clock.now());
                    tokio::time::sleep(wait_duration).await;
                }
            }
        }
    }
}
