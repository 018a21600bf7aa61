//! Bounded-wait exclusive guards for the two shared resources.
//!
//! A [`Guard`] owns the resource it protects; the only way in is
//! [`Guard::with`], which runs a closure under the lock and releases it on
//! every exit path (normal return, early return from the closure, panic).
//!
//! Two rules are enforced at run time:
//!
//! - acquisition waits at most the configured timeout, after which
//!   [`GuardError::Timeout`] is returned instead of blocking forever;
//! - a thread already inside one guard may not enter another, which keeps
//!   the bus and channel critical sections disjoint and rules out
//!   lock-ordering deadlock.

use core::cell::Cell;
use core::time::Duration;

use log::error;
use parking_lot::Mutex;

use crate::error::GuardError;

std::thread_local! {
    static HELD: Cell<Option<&'static str>> = const { Cell::new(None) };
}

/// Marks the current thread as inside guard `name` until dropped.
struct HeldMark;

impl HeldMark {
    fn enter(name: &'static str) -> Self {
        HELD.with(|h| h.set(Some(name)));
        Self
    }
}

impl Drop for HeldMark {
    fn drop(&mut self) {
        HELD.with(|h| h.set(None));
    }
}

/// Exclusive access to one shared resource.
pub struct Guard<T> {
    name: &'static str,
    timeout: Duration,
    inner: Mutex<T>,
}

impl<T> Guard<T> {
    pub fn new(name: &'static str, value: T, timeout: Duration) -> Self {
        Self {
            name,
            timeout,
            inner: Mutex::new(value),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run `f` with exclusive access to the resource.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, GuardError> {
        if let Some(held) = HELD.with(Cell::get) {
            let err = GuardError::Nested {
                held,
                requested: self.name,
            };
            error!("{}", err);
            return Err(err);
        }

        let Some(mut resource) = self.inner.try_lock_for(self.timeout) else {
            let err = GuardError::Timeout(self.name);
            error!("{} after {:?}", err, self.timeout);
            return Err(err);
        };
        let _mark = HeldMark::enter(self.name);
        Ok(f(&mut resource))
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}
