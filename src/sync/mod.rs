//! Destruction-synchronization primitives

mod close_sync;

pub use close_sync::{CloseSync, ReadGuard};
