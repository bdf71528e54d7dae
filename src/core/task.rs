//! Task representation for pool workers.
//!
//! A worker's mailbox holds exactly one [`Task`] at a time: either a range
//! task (a borrowed `(start, end)` callback used by `parallel_for`
//! partitions) or a generic task (an owning closure).

/// An owning callable with no arguments, used for fire-and-forget work.
pub type GenericFn = Box<dyn FnOnce() + Send + 'static>;

/// A non-owning `(start, end)` range callback.
///
/// This is a lifetime-erased borrow of a caller-owned closure: a data pointer
/// paired with a monomorphized trampoline. It exists so that a blocking
/// parallel loop can hand the same stack-resident closure to several workers
/// without cloning or boxing it per partition.
///
/// The referent must be [`Sync`] because every partition invokes it
/// concurrently through a shared reference.
///
/// # Safety
///
/// `RangeFn` does not keep its closure alive. Whoever submits one to a worker
/// must guarantee the closure outlives the worker's execution of it;
/// [`ThreadPool::parallel_for`](crate::pool::ThreadPool::parallel_for)
/// guarantees this by blocking on every partition before returning.
#[derive(Clone, Copy)]
pub struct RangeFn {
    data: *const (),
    call: unsafe fn(*const (), i32, i32),
}

// The data pointer refers to a Sync closure, so moving the pointer to
// another thread and calling through it is sound as long as the referent
// is alive (the submitter's contract).
unsafe impl Send for RangeFn {}

impl RangeFn {
    /// Erase a borrowed closure into a sendable range callback.
    pub fn new<F>(f: &F) -> RangeFn
    where
        F: Fn(i32, i32) + Sync,
    {
        unsafe fn trampoline<F: Fn(i32, i32) + Sync>(data: *const (), start: i32, end: i32) {
            let f = &*(data as *const F);
            f(start, end);
        }
        RangeFn {
            data: f as *const F as *const (),
            call: trampoline::<F>,
        }
    }

    /// Invoke the callback.
    ///
    /// # Safety
    ///
    /// The closure passed to [`RangeFn::new`] must still be alive.
    pub(crate) unsafe fn invoke(self, start: i32, end: i32) {
        (self.call)(self.data, start, end)
    }
}

impl std::fmt::Debug for RangeFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RangeFn({:p})", self.data)
    }
}

/// The one-slot mailbox value of a worker.
#[derive(Default)]
pub(crate) enum Task {
    /// Nothing to run; the worker parks on its condvar.
    #[default]
    None,
    /// A partition of a parallel range loop.
    Range {
        start: i32,
        end: i32,
        call: RangeFn,
    },
    /// An owning callable.
    Generic(GenericFn),
}

impl Task {
    pub(crate) fn is_none(&self) -> bool {
        matches!(self, Task::None)
    }
}
