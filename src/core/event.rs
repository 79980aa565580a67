//! A waitable latching flag used for shutdown and inter-thread
//! notification. Implemented as a condvar plus boolean, kept synchronous
//! because its principal caller is the blocking capture thread, which
//! polls the event at each wait. Async callers (the HTTP poll loop) use
//! [`ManualResetEvent::wait_async`], which offloads the blocking wait to a
//! blocking-pool thread rather than reimplementing the primitive twice.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

/// Cheap to clone; all clones observe the same underlying latch.
#[derive(Debug, Clone)]
pub struct ManualResetEvent {
    inner: Arc<Inner>,
}

impl ManualResetEvent {
    pub fn new() -> Self {
        ManualResetEvent {
            inner: Arc::new(Inner::default()),
        }
    }

    /// Clear the latch.
    pub fn reset(&self) {
        let mut signaled = self.inner.signaled.lock().unwrap();
        *signaled = false;
    }

    /// Latch the event and wake every waiter. Idempotent.
    pub fn signal(&self) {
        let mut signaled = self.inner.signaled.lock().unwrap();
        *signaled = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_signaled(&self) -> bool {
        *self.inner.signaled.lock().unwrap()
    }

    /// Block indefinitely until signaled.
    pub fn wait(&self) {
        let mut signaled = self.inner.signaled.lock().unwrap();
        while !*signaled {
            signaled = self.inner.condvar.wait(signaled).unwrap();
        }
    }

    /// Block until signaled or `timeout` elapses; returns whether the event
    /// was signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let signaled = self.inner.signaled.lock().unwrap();
        if *signaled {
            return true;
        }
        let (guard, result) = self
            .inner
            .condvar
            .wait_timeout(signaled, timeout)
            .unwrap();
        *guard || !result.timed_out()
    }

    /// Async-friendly wait, used by the HTTP server's poll loop which
    /// must not block its reactor thread directly.
    pub async fn wait_async(&self) {
        let this = self.clone();
        let _ = tokio::task::spawn_blocking(move || this.wait()).await;
    }
}

impl Default for ManualResetEvent {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_returns_immediately_once_signaled() {
        let event = ManualResetEvent::new();
        event.signal();
        assert!(event.wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn wait_times_out_when_unsignaled() {
        let event = ManualResetEvent::new();
        assert!(!event.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn reset_clears_the_latch() {
        let event = ManualResetEvent::new();
        event.signal();
        event.reset();
        assert!(!event.is_signaled());
    }

    #[test]
    fn signal_wakes_a_blocked_waiter() {
        let event = ManualResetEvent::new();
        let waiter = event.clone();
        let handle = thread::spawn(move || {
            waiter.wait();
        });
        thread::sleep(Duration::from_millis(20));
        event.signal();
        handle.join().unwrap();
    }
}
