//! Worker tasks and the thread pool

pub mod thread_pool;
pub mod worker;

pub use thread_pool::{partition, ThreadPool};
pub use worker::{TaskPanic, WaitResult, Worker};
