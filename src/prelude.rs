//! Convenient re-exports for common types and traits

pub use crate::core::{PoolError, RangeFn, Result, TraceProvider};
pub use crate::io::{
    ArraySink, ArrayWriter, BinaryWriter, BufferSink, BufferWriter, Composite, FileMode, FileSink,
    FileWriter, Sink, SocketSink, SocketWriter, StreamWriter, ViewSink, ViewWriter,
};
pub use crate::pool::{partition, ThreadPool, WaitResult, Worker};
pub use crate::sync::{CloseSync, ReadGuard};
pub use crate::{parallel_for, parallel_foreach, parallel_task};
