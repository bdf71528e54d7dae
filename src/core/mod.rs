//! Core types: errors, task representation, trace capture

pub mod error;
pub mod task;
pub mod trace;

pub use error::{PoolError, Result};
pub use task::{GenericFn, RangeFn};
pub use trace::TraceProvider;

pub(crate) use task::Task;
