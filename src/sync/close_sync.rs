//! Read-write synchronization of object destruction.
//!
//! Async code has a classic hazard: the owning object is destroyed while a
//! background task still reads it. [`CloseSync`] eases this by letting the
//! destructor block until every outstanding reader has released its guard:
//!
//! ```
//! use std::sync::Arc;
//! use parcore::sync::CloseSync;
//!
//! struct ImportantState {
//!     close: CloseSync,
//!     data: Vec<u8>,
//! }
//!
//! fn process(state: &Arc<ImportantState>) {
//!     let me = Arc::clone(state);
//!     parcore::parallel_task(move || {
//!         let Some(_guard) = me.close.try_read() else { return };
//!         // `me.data` stays untouched by the destructor until the guard
//!         // drops at scope exit.
//!         let _ = me.data.len();
//!     })
//!     .unwrap();
//! }
//!
//! impl Drop for ImportantState {
//!     fn drop(&mut self) {
//!         self.close.lock_for_close(); // blocks until readers release
//!     }
//! }
//! # let state = Arc::new(ImportantState { close: CloseSync::new(), data: vec![0; 64] });
//! # process(&state);
//! # drop(state);
//! ```
//!
//! Without an explicit `lock_for_close`, dropping the `CloseSync` itself
//! blocks until readers release; declare it as the last field so the rest of
//! the object is still intact while readers run.

use parking_lot::lock_api::RawRwLock as _;
use parking_lot::RawRwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Coordinates an owner's destruction against concurrent shared readers.
///
/// Readers take non-blocking shared guards through [`CloseSync::try_read`];
/// the closing side takes the lock exclusively, either explicitly through
/// [`CloseSync::lock_for_close`] or implicitly when the `CloseSync` is
/// dropped. Once the close has begun, `try_read` never succeeds again.
///
/// Deliberately not `Clone`: a copy would split the reader/closer pairing.
/// Keep it in place between `lock_for_close` and drop (in practice it is a
/// field of the object whose destructor locks it, which cannot move in that
/// window).
pub struct CloseSync {
    lock: RawRwLock,
    explicit_close: AtomicBool,
}

/// Shared read access to the owner; releases on drop.
pub struct ReadGuard<'a> {
    owner: &'a CloseSync,
}

impl CloseSync {
    /// Create an open coordinator.
    pub const fn new() -> CloseSync {
        CloseSync {
            lock: RawRwLock::INIT,
            explicit_close: AtomicBool::new(false),
        }
    }

    /// Attempt shared read access without blocking.
    ///
    /// Returns `None` once an exclusive close is in progress or completed.
    /// Any number of readers may hold guards simultaneously.
    pub fn try_read(&self) -> Option<ReadGuard<'_>> {
        if self.lock.try_lock_shared() {
            Some(ReadGuard { owner: self })
        } else {
            None
        }
    }

    /// Take the close lock, blocking until all readers have released.
    ///
    /// Call from the owner's destructor. After this returns, no `try_read`
    /// succeeds for the remainder of the object's life; the lock is released
    /// when the `CloseSync` itself is dropped.
    ///
    /// # Panics
    ///
    /// Panics when called twice; a second call would deadlock.
    pub fn lock_for_close(&self) {
        let already = self.explicit_close.swap(true, Ordering::AcqRel);
        assert!(
            !already,
            "CloseSync::lock_for_close called twice; this would deadlock"
        );
        self.lock.lock_exclusive();
    }
}

impl Default for CloseSync {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CloseSync {
    fn drop(&mut self) {
        if self.explicit_close.load(Ordering::Acquire) {
            // Already locked for close by the owner's destructor.
            unsafe { self.lock.unlock_exclusive() };
        } else {
            // Implicit mode: block here until async readers finish.
            self.lock.lock_exclusive();
            unsafe { self.lock.unlock_exclusive() };
        }
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        // Safety: the guard's existence proves a shared lock is held.
        unsafe { self.owner.lock.unlock_shared() };
    }
}

impl std::fmt::Debug for CloseSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseSync")
            .field("explicit_close", &self.explicit_close.load(Ordering::Relaxed))
            .finish()
    }
}

/// Take a read guard from a [`CloseSync`] or return from the enclosing
/// function.
///
/// ```
/// use parcore::{read_or_return, sync::CloseSync};
///
/// fn background_step(close: &CloseSync) {
///     read_or_return!(close);
///     // owner is alive until scope exit
/// }
/// # background_step(&CloseSync::new());
/// ```
#[macro_export]
macro_rules! read_or_return {
    ($close:expr) => {
        let _guard = match $close.try_read() {
            Some(guard) => guard,
            None => return,
        };
    };
}
