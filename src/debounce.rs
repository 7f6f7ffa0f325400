//! Deadline-based coalescing of bursty input, such as search keystrokes.
//!
//! ```ignore
//! let mut search = Debounce::new(Duration::from_millis(300));
//!
//! // On every keystroke
//! search.push(query);
//!
//! // In event loop tick
//! if let Some(query) = search.poll() {
//!     run_search(query);
//! }
//! ```

use std::time::{Duration, Instant};

/// Holds the latest pushed value until a quiet period has passed.
#[derive(Debug)]
pub struct Debounce<T> {
  quiet: Duration,
  pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
  pub fn new(quiet: Duration) -> Self {
    Self {
      quiet,
      pending: None,
    }
  }

  /// Replace the pending value and restart the quiet period.
  pub fn push(&mut self, value: T) {
    self.push_at(value, Instant::now());
  }

  pub fn push_at(&mut self, value: T, now: Instant) {
    self.pending = Some((value, now + self.quiet));
  }

  /// Take the pending value if its quiet period is over.
  pub fn poll(&mut self) -> Option<T> {
    self.poll_at(Instant::now())
  }

  pub fn poll_at(&mut self, now: Instant) -> Option<T> {
    let due = self.deadline().is_some_and(|due| due <= now);
    if !due {
      return None;
    }
    self.pending.take().map(|(value, _)| value)
  }

  /// When the pending value becomes due.
  pub fn deadline(&self) -> Option<Instant> {
    self.pending.as_ref().map(|(_, due)| *due)
  }

  /// Drop the pending value without firing.
  pub fn cancel(&mut self) -> Option<T> {
    self.pending.take().map(|(value, _)| value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const QUIET: Duration = Duration::from_millis(300);

  #[test]
  fn test_fires_after_quiet_period() {
    let start = Instant::now();
    let mut debounce = Debounce::new(QUIET);

    debounce.push_at("e", start);

    assert_eq!(debounce.poll_at(start + Duration::from_millis(299)), None);
    assert_eq!(debounce.poll_at(start + QUIET), Some("e"));
    assert_eq!(debounce.poll_at(start + QUIET * 2), None);
  }

  #[test]
  fn test_keystrokes_restart_the_timer_and_keep_the_last_value() {
    let start = Instant::now();
    let mut debounce = Debounce::new(QUIET);

    debounce.push_at("e", start);
    debounce.push_at("en", start + Duration::from_millis(200));
    debounce.push_at("eng", start + Duration::from_millis(400));

    assert_eq!(debounce.poll_at(start + Duration::from_millis(650)), None);
    assert_eq!(
      debounce.deadline(),
      Some(start + Duration::from_millis(700))
    );
    assert_eq!(debounce.poll_at(start + Duration::from_millis(700)), Some("eng"));
    assert_eq!(debounce.deadline(), None);
  }

  #[test]
  fn test_cancel_drops_pending_value() {
    let start = Instant::now();
    let mut debounce = Debounce::new(QUIET);

    debounce.push_at("nurse", start);
    assert_eq!(debounce.cancel(), Some("nurse"));

    assert_eq!(debounce.poll_at(start + QUIET * 10), None);
    assert_eq!(debounce.deadline(), None);
  }

  #[tokio::test]
  async fn test_wall_clock_poll() {
    let mut debounce = Debounce::new(Duration::from_millis(5));
    debounce.push(42);
    assert_eq!(debounce.poll(), None);

    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(debounce.poll(), Some(42));
  }
}
