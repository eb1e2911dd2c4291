//! Fixed-delay throttle for remote calls.
//!
//! Every remote call holds a [`ThrottleTicket`] for its whole duration.
//! Acquiring a ticket waits until at least `delay` has passed since the
//! previous ticket was released, and callers sharing one throttle are
//! served one at a time. The only state is the last release instant.

use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};

#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_call: Mutex::new(None),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// A throttle that never waits.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Blocks until a call may start; the call ends when the ticket drops.
    pub fn acquire(&self) -> ThrottleTicket<'_> {
        let guard = self.last_call.lock();

        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                let wait = self.delay - elapsed;
                tracing::debug!("throttle: waiting {wait:?} before next remote call");
                std::thread::sleep(wait);
            }
        }

        ThrottleTicket { guard }
    }
}

/// Permission for one remote call.
#[must_use = "the call is only throttled while the ticket is held"]
pub struct ThrottleTicket<'a> {
    guard: MutexGuard<'a, Option<Instant>>,
}

impl Drop for ThrottleTicket<'_> {
    fn drop(&mut self) {
        *self.guard = Some(Instant::now());
    }
}
