//! Sliding window rate limiter for a single routing key.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::trace;

/// Requests admitted without any spacing before the window applies.
pub const MAX_BURST: usize = 10;
/// Trailing interval the burst is measured against.
pub const WINDOW: Duration = Duration::from_secs(1);

/// Timestamps of recently admitted requests, oldest first.
pub type RateWindow = VecDeque<Instant>;

/// Admits at most `max_burst` requests in any trailing `window`.
///
/// One instance is shared by every request hitting the same routing key, so
/// `allow_request` is safe to call from many threads at once. Calls for
/// other keys go to other instances and never contend on this lock.
#[derive(Debug)]
pub struct RateLimiter {
    /// Admitted timestamps; appended and popped only under this lock
    window: Mutex<RateWindow>,
    max_burst: usize,
    duration: Duration,
}

impl RateLimiter {
    /// Create a limiter with the default burst of 10 per second.
    pub fn new() -> Self {
        Self::with_limits(MAX_BURST, WINDOW)
    }

    /// Create a limiter with a custom burst size and window.
    pub fn with_limits(max_burst: usize, window: Duration) -> Self {
        Self {
            window: Mutex::new(VecDeque::with_capacity(max_burst)),
            max_burst,
            duration: window,
        }
    }

    /// Decide whether a request arriving now is admitted.
    pub fn allow_request(&self) -> bool {
        let mut window = self.window.lock();
        // Read the clock under the lock so appends stay in order
        self.admit(&mut window, Instant::now())
    }

    /// Same as [`allow_request`](Self::allow_request) with a caller-supplied
    /// timestamp. Successive calls must not go back in time.
    #[cfg(test)]
    pub(crate) fn allow_request_at(&self, now: Instant) -> bool {
        let mut window = self.window.lock();
        self.admit(&mut window, now)
    }

    fn admit(&self, window: &mut RateWindow, now: Instant) -> bool {
        if window.len() < self.max_burst {
            window.push_back(now);
            return true;
        }

        match window.front() {
            Some(&oldest) if now.saturating_duration_since(oldest) <= self.duration => {
                trace!(held = window.len(), "Window full, rejecting");
                false
            }
            _ => {
                while let Some(&oldest) = window.front() {
                    if now.saturating_duration_since(oldest) <= self.duration {
                        break;
                    }
                    window.pop_front();
                }
                window.push_back(now);
                true
            }
        }
    }

    /// Number of timestamps currently held in the window.
    pub fn len(&self) -> usize {
        self.window.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.lock().is_empty()
    }

    pub fn max_burst(&self) -> usize {
        self.max_burst
    }

    pub fn window(&self) -> Duration {
        self.duration
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
