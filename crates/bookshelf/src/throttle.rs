//! A minimum-gap request throttle.
//!
//! The catalog rate-limits clients, so consecutive searches must be spaced out by a fixed
//! minimum delay. There is no burst allowance: every request after the first waits until
//! the delay has passed since the previous one was issued.
//!
//! Time is read from tokio's monotonic clock, so wall-clock adjustments cannot shorten a wait.

use tokio::time::{sleep_until, Instant};

use super::*;

/// Spaces out outbound requests by at least a fixed delay.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bookshelf::Throttle;
///
/// # #[tokio::main] async fn main() {
/// let mut throttle = Throttle::new(Duration::from_millis(10));
/// throttle.wait().await; // first request goes straight out
/// throttle.wait().await; // second waits for the gap
/// # }
/// ```
#[derive(Debug)]
pub struct Throttle {
  /// Minimum gap between two requests, fixed for the throttle's lifetime
  min_delay:    Duration,
  /// When the last request was let through, if any
  last_request: Option<Instant>,
}

impl Throttle {
  /// Creates a throttle that has not let any request through yet.
  pub fn new(min_delay: Duration) -> Self { Self { min_delay, last_request: None } }

  /// The minimum gap between two requests.
  pub fn min_delay(&self) -> Duration { self.min_delay }

  /// When the last request was let through.
  pub fn last_request(&self) -> Option<Instant> { self.last_request }

  /// Waits until the next request may be issued, then records it as issued.
  pub async fn wait(&mut self) {
    if let Some(last_request) = self.last_request {
      let ready_at = last_request + self.min_delay;
      let now = Instant::now();
      if now < ready_at {
        debug!("Throttling next request for {:?}", ready_at - now);
        sleep_until(ready_at).await;
      }
    }

    self.last_request = Some(Instant::now());
  }
}
