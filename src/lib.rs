//! # parcore
//!
//! The concurrency and binary I/O core of a systems utility library: a
//! thread pool built from addressable workers, a destruction-synchronization
//! primitive, and a composable binary writer framework.
//!
//! ## Features
//!
//! - **Parallel range loops**: [`parallel_for`] splits `[start, end)` across
//!   physical cores and blocks until every partition finishes
//! - **Reusable workers**: each worker is one OS thread with a one-slot
//!   mailbox, an idle-timeout lifecycle, and transparent resurrection
//! - **Panic capture**: a panic in a task never kills its worker; it is
//!   re-raised from [`Worker::wait`](pool::Worker::wait)
//! - **Close synchronization**: [`sync::CloseSync`] lets a destructor block
//!   until background readers release their guards
//! - **Binary writers**: five sink variants, a two-stage buffered composite,
//!   and a typed little-endian serialization surface
//!
//! ## Parallel loops
//!
//! ```
//! use std::sync::atomic::{AtomicI32, Ordering};
//!
//! let histogram: [AtomicI32; 8] = std::array::from_fn(|_| AtomicI32::new(0));
//! parcore::parallel_for(0, 800, &|start, end| {
//!     for i in start..end {
//!         histogram[(i % 8) as usize].fetch_add(1, Ordering::Relaxed);
//!     }
//! })
//! .unwrap();
//! assert!(histogram.iter().all(|h| h.load(Ordering::Relaxed) == 100));
//! ```
//!
//! ## Background tasks
//!
//! ```
//! let worker = parcore::parallel_task(|| {
//!     // slow work runs on a pool worker
//! })
//! .unwrap();
//! worker.wait(0);
//! ```
//!
//! ## Binary writing
//!
//! ```
//! use parcore::io::{ArraySink, BinaryWriter, BufferSink, Composite, Sink};
//!
//! let mut storage = BufferSink::new();
//! {
//!     let buffered = Composite::new(ArraySink::<512>::new(), &mut storage);
//!     let mut w = BinaryWriter::new(buffered);
//!     w.write_str("hello").unwrap();
//!     w.write_u32(42).unwrap();
//! } // dropping the composite flushes into storage
//! assert_eq!(storage.size(), 11);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod io;
pub mod pool;
pub mod prelude;
pub mod sync;

pub use crate::core::{PoolError, Result, TraceProvider};
pub use crate::pool::thread_pool::{parallel_for, parallel_foreach, parallel_task};
pub use crate::pool::{ThreadPool, WaitResult, Worker};
