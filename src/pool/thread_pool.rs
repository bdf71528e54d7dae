//! Thread pool with parallel range loops.
//!
//! The pool keeps a dynamic set of [`Worker`]s. Range work is partitioned
//! across physical cores and dispatched to the first idle workers (growing
//! the pool when none is free); generic tasks go to a single worker.
//!
//! By design, nesting parallel loops is a fatal error: nested loops give no
//! extra parallelism and an accidental nesting can explode an 8-core machine
//! into 8*8 = 64 threads.

use crate::core::{trace, GenericFn, RangeFn, Result, Task, TraceProvider};
use crate::pool::worker::Worker;
use parking_lot::Mutex;
use std::panic::resume_unwind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Default idle budget for newly spawned workers, in seconds.
const DEFAULT_TASK_MAX_IDLE: f32 = 15.0;

/// A pool of reusable workers for parallel range loops and generic tasks.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use parcore::pool::ThreadPool;
///
/// let pool = ThreadPool::new();
/// let sum = AtomicI32::new(0);
/// pool.parallel_for(0, 1000, &|start, end| {
///     sum.fetch_add(end - start, Ordering::Relaxed);
/// })
/// .unwrap();
/// assert_eq!(sum.load(Ordering::Relaxed), 1000);
/// ```
pub struct ThreadPool {
    workers: Mutex<Vec<Arc<Worker>>>,
    task_max_idle: Mutex<f32>,
    physical: usize,
    range_running: AtomicBool,
}

impl ThreadPool {
    /// Create an empty pool. Workers are spawned lazily on first use.
    pub fn new() -> ThreadPool {
        ThreadPool {
            workers: Mutex::new(Vec::new()),
            task_max_idle: Mutex::new(DEFAULT_TASK_MAX_IDLE),
            physical: num_cpus::get_physical(),
            range_running: AtomicBool::new(false),
        }
    }

    /// The process-wide default pool, created lazily on first use.
    ///
    /// Rust never drops statics, so this pool's destructor does not run at
    /// process teardown; its workers retire themselves through the idle
    /// timeout instead. Locally constructed pools are shut down by
    /// [`Drop`], which waits for each worker's current callable.
    pub fn global() -> &'static ThreadPool {
        static GLOBAL: OnceLock<ThreadPool> = OnceLock::new();
        GLOBAL.get_or_init(ThreadPool::new)
    }

    /// Number of physical cores, queried once at pool construction.
    pub fn physical_cores(&self) -> usize {
        self.physical
    }

    /// Number of workers currently executing a callable.
    pub fn active_tasks(&self) -> usize {
        self.workers.lock().iter().filter(|w| w.running()).count()
    }

    /// Number of workers currently parked.
    pub fn idle_tasks(&self) -> usize {
        self.workers.lock().iter().filter(|w| !w.running()).count()
    }

    /// Total number of workers owned by the pool.
    pub fn total_tasks(&self) -> usize {
        self.workers.lock().len()
    }

    /// Remove every idle worker from the pool, returning how many were
    /// removed. Running workers are preserved.
    pub fn clear_idle_tasks(&self) -> usize {
        let mut removed = Vec::new();
        {
            let mut workers = self.workers.lock();
            let mut i = 0;
            while i < workers.len() {
                if workers[i].running() {
                    i += 1;
                } else {
                    removed.push(workers.swap_remove(i));
                }
            }
        }
        // Dropping outside the pool lock: reclaiming a worker joins its
        // thread, and the pool mutex must not be held across that.
        let cleared = removed.len();
        drop(removed);
        cleared
    }

    /// Update the idle budget for new workers and push it to every existing
    /// one. `0.0` keeps workers alive forever.
    pub fn set_task_max_idle(&self, seconds: f32) {
        *self.task_max_idle.lock() = seconds;
        for worker in self.workers.lock().iter() {
            worker.set_max_idle(seconds);
        }
    }

    /// Install (or remove, with `None`) the process-wide trace provider.
    ///
    /// When set, every submission captures a "where was this task created?"
    /// string into its worker, included in unhandled-panic reports. Tracing
    /// slows down submission since the provider runs synchronously.
    pub fn set_task_tracer(&self, provider: Option<TraceProvider>) {
        let _workers = self.workers.lock();
        trace::set_provider(provider);
    }

    /// Run `func` over `[start, end)` split across physical cores, blocking
    /// until every partition has finished.
    ///
    /// Each partition receives a `[chunk_start, chunk_end)` sub-range. With
    /// one core (or a single-element range) the callback runs inline as
    /// `func(0, end - start)`. Empty ranges return immediately.
    ///
    /// The first panic captured from any partition is re-raised here, after
    /// all partitions have been waited for.
    ///
    /// # Panics
    ///
    /// Panics when called while another `parallel_for` is already running on
    /// this pool (nested parallel loops are forbidden).
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn a needed worker thread.
    pub fn parallel_for<F>(&self, start: i32, end: i32, func: &F) -> Result<()>
    where
        F: Fn(i32, i32) + Sync,
    {
        assert!(
            !self.range_running.load(Ordering::Acquire),
            "nested parallel_for is forbidden"
        );

        let range = end.saturating_sub(start);
        if range <= 0 {
            return Ok(());
        }

        let cores = (range as usize).min(self.physical).max(1);
        if cores <= 1 {
            func(0, range);
            return Ok(());
        }

        self.range_running.store(true, Ordering::Release);
        let _guard = RangeGuard(&self.range_running);

        #[cfg(feature = "tracing")]
        debug!(start, end, cores, "dispatching parallel range");

        let call = RangeFn::new(func);
        let mut active: Vec<Arc<Worker>> = Vec::with_capacity(cores);
        let mut pool_index = 0;
        let mut spawn_error = None;
        for (chunk_start, chunk_end) in partition(start, end, cores) {
            // Safety: `func` outlives this call; every dispatched partition
            // is waited for below before returning or unwinding.
            match unsafe { self.start_range_task(&mut pool_index, chunk_start, chunk_end, call) } {
                Ok(worker) => active.push(worker),
                Err(e) => {
                    spawn_error = Some(e);
                    break;
                }
            }
        }

        // Wait for every dispatched partition before surfacing anything, so
        // no worker is left running a borrowed callback.
        let mut first_panic = None;
        for worker in &active {
            worker.wait_quiet(0);
            if first_panic.is_none() {
                first_panic = worker.take_panic();
            }
        }

        if let Some(payload) = first_panic {
            resume_unwind(payload);
        }
        match spawn_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run an owning callable on the first idle worker, growing the pool if
    /// every worker is busy. Returns the worker handle; callers may
    /// [`wait`](Worker::wait) on it or ignore it.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn a needed worker thread.
    pub fn parallel_task<F>(&self, f: F) -> Result<Arc<Worker>>
    where
        F: FnOnce() + Send + 'static,
    {
        let task = Task::Generic(Box::new(f) as GenericFn);

        let workers = self.workers.lock();
        match workers.iter().position(|w| !w.running()) {
            Some(i) => {
                // Submit under the pool lock so no other submitter can claim
                // the same idle worker in between.
                let worker = Arc::clone(&workers[i]);
                worker.submit(task)?;
                Ok(worker)
            }
            None => {
                drop(workers);
                let worker = Arc::new(Worker::spawn(*self.task_max_idle.lock())?);
                worker.submit(task)?;
                self.workers.lock().push(Arc::clone(&worker));
                Ok(worker)
            }
        }
    }

    /// Dispatch one range partition: reuse the first idle worker at or after
    /// `pool_index`, or grow the pool by one.
    ///
    /// # Safety
    ///
    /// The closure behind `call` must outlive the worker's execution of it;
    /// the caller must wait on the returned worker before letting it go out
    /// of scope.
    unsafe fn start_range_task(
        &self,
        pool_index: &mut usize,
        start: i32,
        end: i32,
        call: RangeFn,
    ) -> Result<Arc<Worker>> {
        {
            let workers = self.workers.lock();
            while *pool_index < workers.len() {
                let worker = &workers[*pool_index];
                *pool_index += 1;
                if !worker.running() {
                    worker.submit_range(start, end, call)?;
                    return Ok(Arc::clone(worker));
                }
            }
        }

        let worker = Arc::new(Worker::spawn(*self.task_max_idle.lock())?);
        worker.submit_range(start, end, call)?;
        self.workers.lock().push(Arc::clone(&worker));
        Ok(worker)
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Wait for in-flight callables; user work is never cancelled, the
        // kill only takes effect once each worker returns to its mailbox.
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in &workers {
            worker.kill(0);
        }
    }
}

/// Restores the non-reentrancy flag even when a partition panic unwinds
/// through `parallel_for`.
struct RangeGuard<'a>(&'a AtomicBool);

impl Drop for RangeGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Split `[start, end)` into `cores` contiguous chunks of `(end - start) /
/// cores` elements, the last chunk absorbing the remainder so its end is
/// exactly `end`. Returns fewer chunks when the range is shorter than
/// `cores`; an empty range yields no chunks.
pub fn partition(start: i32, end: i32, cores: usize) -> Vec<(i32, i32)> {
    let range = end.saturating_sub(start);
    if range <= 0 || cores == 0 {
        return Vec::new();
    }
    let cores = cores.min(range as usize);
    let len = range / cores as i32;
    (0..cores)
        .map(|i| {
            let chunk_start = start + i as i32 * len;
            let chunk_end = if i == cores - 1 {
                end
            } else {
                chunk_start + len
            };
            (chunk_start, chunk_end)
        })
        .collect()
}

/// Runs `parallel_for` on the process-wide default pool.
///
/// The callback receives `[chunk_start, chunk_end)` bounds so tight inner
/// loops stay cheap; if each element is heavy, prefer [`parallel_foreach`].
///
/// ```
/// use std::sync::atomic::{AtomicI32, Ordering};
///
/// let sum = AtomicI32::new(0);
/// parcore::parallel_for(0, 100, &|start, end| {
///     for i in start..end {
///         sum.fetch_add(i, Ordering::Relaxed);
///     }
/// })
/// .unwrap();
/// assert_eq!(sum.load(Ordering::Relaxed), 4950);
/// ```
pub fn parallel_for<F>(start: i32, end: i32, func: &F) -> Result<()>
where
    F: Fn(i32, i32) + Sync,
{
    ThreadPool::global().parallel_for(start, end, func)
}

/// Runs `func` once per slice element on the process-wide default pool,
/// distributing disjoint chunks across workers. Blocks until done.
///
/// ```
/// let mut values = vec![1u64, 2, 3, 4, 5];
/// parcore::parallel_foreach(&mut values, &|v| *v *= 10).unwrap();
/// assert_eq!(values, [10, 20, 30, 40, 50]);
/// ```
pub fn parallel_foreach<T, F>(items: &mut [T], func: &F) -> Result<()>
where
    T: Send,
    F: Fn(&mut T) + Sync,
{
    assert!(items.len() <= i32::MAX as usize, "slice too large for range indexing");
    let base = SendPtr(items.as_mut_ptr());
    parallel_for(0, items.len() as i32, &|start, end| {
        let base = &base;
        for i in start..end {
            // Safety: partitions never overlap, so each element is accessed
            // by exactly one worker at a time.
            let item = unsafe { &mut *base.0.add(i as usize) };
            func(item);
        }
    })
}

/// Runs an owning callable on the process-wide default pool.
///
/// Returns immediately with the worker handle; `wait` on it if the result
/// matters.
pub fn parallel_task<F>(f: F) -> Result<Arc<Worker>>
where
    F: FnOnce() + Send + 'static,
{
    ThreadPool::global().parallel_task(f)
}

/// Raw pointer wrapper so range closures can hand out disjoint `&mut`
/// elements across worker threads.
struct SendPtr<T>(*mut T);

unsafe impl<T: Send> Sync for SendPtr<T> {}
unsafe impl<T: Send> Send for SendPtr<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_partition_covers_range_exactly() {
        let chunks = partition(0, 10, 3);
        assert_eq!(chunks, vec![(0, 3), (3, 6), (6, 10)]);

        let chunks = partition(5, 9, 2);
        assert_eq!(chunks, vec![(5, 7), (7, 9)]);
    }

    #[test]
    fn test_partition_clamps_cores_to_range() {
        assert_eq!(partition(0, 2, 8), vec![(0, 1), (1, 2)]);
        assert_eq!(partition(0, 1, 4), vec![(0, 1)]);
    }

    #[test]
    fn test_partition_empty_range() {
        assert!(partition(3, 3, 4).is_empty());
        assert!(partition(5, 2, 4).is_empty());
        assert!(partition(0, 10, 0).is_empty());
    }

    #[test]
    fn test_parallel_for_empty_range_is_noop() {
        let pool = ThreadPool::new();
        let hits = AtomicUsize::new(0);
        pool.parallel_for(3, 3, &|_, _| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
        .expect("parallel_for");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parallel_for_single_element_runs_inline() {
        let pool = ThreadPool::new();
        let seen = Mutex::new(Vec::new());
        pool.parallel_for(7, 8, &|start, end| {
            seen.lock().push((start, end));
        })
        .expect("parallel_for");
        // Single chunk runs inline over the normalized range.
        assert_eq!(*seen.lock(), vec![(0, 1)]);
        assert_eq!(pool.total_tasks(), 0);
    }

    #[test]
    fn test_parallel_task_reuses_idle_worker() {
        let pool = ThreadPool::new();
        let worker = pool.parallel_task(|| {}).expect("task");
        worker.wait(0);

        let again = pool.parallel_task(|| {}).expect("task");
        again.wait(0);
        assert_eq!(worker.id(), again.id());
        assert_eq!(pool.total_tasks(), 1);
    }

    #[test]
    fn test_parallel_task_grows_when_busy() {
        let pool = ThreadPool::new();
        let slow = pool
            .parallel_task(|| thread::sleep(Duration::from_millis(200)))
            .expect("task");
        thread::sleep(Duration::from_millis(20));

        let fast = pool.parallel_task(|| {}).expect("task");
        assert_ne!(slow.id(), fast.id());
        assert_eq!(pool.total_tasks(), 2);
        fast.wait(0);
        slow.wait(0);
    }

    #[test]
    fn test_clear_idle_tasks_keeps_running_workers() {
        let pool = ThreadPool::new();
        let idle = pool.parallel_task(|| {}).expect("task");
        idle.wait(0);
        let busy = pool
            .parallel_task(|| thread::sleep(Duration::from_millis(200)))
            .expect("task");
        thread::sleep(Duration::from_millis(20));

        assert_eq!(pool.clear_idle_tasks(), 1);
        assert_eq!(pool.total_tasks(), 1);
        assert!(busy.running());
        busy.wait(0);
    }

    #[test]
    fn test_task_counts() {
        let pool = ThreadPool::new();
        assert_eq!(pool.total_tasks(), 0);

        let worker = pool
            .parallel_task(|| thread::sleep(Duration::from_millis(150)))
            .expect("task");
        thread::sleep(Duration::from_millis(20));
        assert_eq!(pool.active_tasks(), 1);
        assert_eq!(pool.idle_tasks(), 0);

        worker.wait(0);
        assert_eq!(pool.active_tasks(), 0);
        assert_eq!(pool.idle_tasks(), 1);
        assert_eq!(pool.total_tasks(), 1);
    }
}
