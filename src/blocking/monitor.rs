//! The [`Monitor`] capability contract and its default `std` implementation.

use crate::util::fmt;
use core::ops::DerefMut;
use core::time::Duration;
use std::sync::{Condvar, Mutex, MutexGuard};

/// A mutual-exclusion lock paired with a wait/notify signal — a *monitor*,
/// in the classic sense.
///
/// This is the capability contract the [blocking queue](super::IdQueue)
/// requires of its synchronization primitives. Implementations provide
/// scoped exclusive access to the protected data through an RAII
/// [`Guard`](Self::Guard), plus the ability to atomically release the lock,
/// suspend the calling thread until notified (or until a timeout elapses),
/// and reacquire the lock before returning.
///
/// [`StdMonitor`] implements this trait over [`std::sync::Mutex`] and
/// [`std::sync::Condvar`], and is the default. Providing a different
/// implementation (say, over `parking_lot`) swaps the queue's
/// synchronization strategy without touching the queue itself.
///
/// # Contract
///
/// - [`lock`](Self::lock) provides exclusive access: no two guards for the
///   same monitor may be live at once.
/// - [`wait`](Self::wait) and [`wait_timeout`](Self::wait_timeout) must
///   release the lock and suspend atomically with respect to
///   [`notify_one`](Self::notify_one), so that a notification sent while a
///   caller holds the guard cannot be missed by that caller's subsequent
///   wait. Both may wake spuriously; callers are expected to re-check their
///   predicate in a loop.
pub trait Monitor<T> {
    /// The RAII guard proving exclusive access to the protected data.
    type Guard<'a>: DerefMut<Target = T>
    where
        Self: 'a;

    /// Returns a new monitor protecting `data`.
    fn new(data: T) -> Self;

    /// Acquires the lock, blocking the calling thread until it is available.
    fn lock(&self) -> Self::Guard<'_>;

    /// Attempts to acquire the lock without blocking.
    fn try_lock(&self) -> Option<Self::Guard<'_>>;

    /// Atomically releases `guard` and suspends the calling thread until
    /// notified, then reacquires the lock.
    fn wait<'a>(&'a self, guard: Self::Guard<'a>) -> Self::Guard<'a>;

    /// Like [`wait`](Self::wait), but suspends for at most `timeout`.
    ///
    /// The returned flag is `true` if the wait timed out rather than being
    /// notified.
    fn wait_timeout<'a>(
        &'a self,
        guard: Self::Guard<'a>,
        timeout: Duration,
    ) -> (Self::Guard<'a>, bool);

    /// Wakes one thread suspended in [`wait`](Self::wait) or
    /// [`wait_timeout`](Self::wait_timeout), if any.
    fn notify_one(&self);
}

/// The default [`Monitor`], built on [`std::sync::Mutex`] and
/// [`std::sync::Condvar`].
///
/// # Panics
///
/// Like most `std` mutex wrappers, operations on a `StdMonitor` panic if a
/// previous holder of the lock panicked (the mutex is poisoned).
pub struct StdMonitor<T> {
    data: Mutex<T>,
    signal: Condvar,
}

// === impl StdMonitor ===

impl<T> Monitor<T> for StdMonitor<T> {
    type Guard<'a>
        = MutexGuard<'a, T>
    where
        Self: 'a;

    fn new(data: T) -> Self {
        Self {
            data: Mutex::new(data),
            signal: Condvar::new(),
        }
    }

    #[track_caller]
    fn lock(&self) -> MutexGuard<'_, T> {
        self.data.lock().unwrap()
    }

    fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.data.try_lock().ok()
    }

    #[track_caller]
    fn wait<'a>(&'a self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        self.signal.wait(guard).unwrap()
    }

    #[track_caller]
    fn wait_timeout<'a>(
        &'a self,
        guard: MutexGuard<'a, T>,
        timeout: Duration,
    ) -> (MutexGuard<'a, T>, bool) {
        let (guard, result) = self.signal.wait_timeout(guard, timeout).unwrap();
        (guard, result.timed_out())
    }

    fn notify_one(&self) {
        self.signal.notify_one()
    }
}

impl<T: fmt::Debug> fmt::Debug for StdMonitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.try_lock();
        f.debug_struct("StdMonitor")
            .field("data", &fmt::opt(&data).or_else("<locked>"))
            .finish()
    }
}
