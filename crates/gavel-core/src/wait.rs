//! Cancellable blocking wait.
//!
//! The solver and the edge store converge asynchronously, so the core polls
//! with blocking sleeps by contract. `Waiter` keeps that contract while
//! letting a host application cancel the whole orchestration from another
//! thread: every sleep in the matcher and the edge synchronizer goes through
//! a single `Waiter`, and `cancel()` wakes them all immediately.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
pub struct Waiter {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Waiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake all pending waits and make every future `wait` return
    /// immediately. Safe to call from any thread, idempotent.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        let mut cancelled = lock.lock().unwrap_or_else(|e| e.into_inner());
        *cancelled = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block for `duration`. Returns `true` if the full duration elapsed,
    /// `false` if the waiter was cancelled first.
    pub fn wait(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut cancelled = lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if *cancelled {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let (guard, _timeout) = cvar
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            cancelled = guard;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_elapses_when_not_cancelled() {
        let waiter = Waiter::new();
        let start = Instant::now();
        assert!(waiter.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn cancel_wakes_a_blocked_wait() {
        let waiter = Waiter::new();
        let handle = waiter.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            handle.cancel();
        });
        // Would take 10s without the cancel.
        assert!(!waiter.wait(Duration::from_secs(10)));
        t.join().unwrap();
        assert!(waiter.is_cancelled());
    }

    #[test]
    fn cancelled_waiter_returns_immediately() {
        let waiter = Waiter::new();
        waiter.cancel();
        let start = Instant::now();
        assert!(!waiter.wait(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
