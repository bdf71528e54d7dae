//! Worker thread with a one-slot mailbox.
//!
//! A [`Worker`] owns one OS thread. Submitters place a single task into its
//! mailbox and the thread runs it, then parks on a condvar waiting for the
//! next one. Workers that stay idle past their idle budget release their
//! thread handle and are transparently re-spawned on the next submission.

use crate::core::{trace, PoolError, RangeFn, Result, Task};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::debug;

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(0);

/// Outcome of [`Worker::wait`] and [`Worker::kill`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// The worker finished its current task (or had none).
    Finished,
    /// The timeout elapsed while the task was still running.
    Timeout,
}

/// Payload of a panic captured from a user callable.
pub type TaskPanic = Box<dyn Any + Send + 'static>;

#[derive(Default)]
struct WorkerState {
    task: Task,
    handle: Option<JoinHandle<()>>,
    trace: Option<String>,
    panic: Option<TaskPanic>,
    /// True only while a callable is executing (set at submission, cleared
    /// by the worker loop when the callable returns).
    running: bool,
    /// Set by `kill` or by idle-timeout self-termination; the thread exits
    /// once it observes the flag. Cleared on resurrection.
    killed: bool,
    max_idle: f32,
}

struct Shared {
    state: Mutex<WorkerState>,
    cv: Condvar,
}

/// A single pool worker: one OS thread paired with a one-slot mailbox.
///
/// At most one callable runs at a time; submitting while a task is running
/// is a programmer error and panics. Panics escaping a callable never take
/// the thread down: they are captured and re-raised from [`Worker::wait`].
pub struct Worker {
    id: usize,
    shared: Arc<Shared>,
}

impl Worker {
    /// Spawn a new worker thread with the given idle budget in seconds
    /// (`0.0` keeps the thread alive forever).
    pub fn spawn(max_idle: f32) -> Result<Worker> {
        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(Shared {
            state: Mutex::new(WorkerState {
                max_idle,
                ..WorkerState::default()
            }),
            cv: Condvar::new(),
        });
        let worker = Worker { id, shared };
        let handle = worker.spawn_thread()?;
        worker.shared.state.lock().handle = Some(handle);
        Ok(worker)
    }

    /// Worker ID, unique within the process.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether a callable is currently executing.
    pub fn running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Whether the worker's thread has terminated or been asked to
    /// terminate. A killed worker is resurrected by the next submission.
    pub fn killed(&self) -> bool {
        self.shared.state.lock().killed
    }

    /// The trace string captured at the last submission, if a trace
    /// provider was installed.
    pub fn start_trace(&self) -> Option<String> {
        self.shared.state.lock().trace.clone()
    }

    /// Whether the last task ended in a captured panic that has not been
    /// re-raised or taken yet.
    pub fn has_panic(&self) -> bool {
        self.shared.state.lock().panic.is_some()
    }

    /// Remove and return the captured panic payload, if any.
    pub fn take_panic(&self) -> Option<TaskPanic> {
        self.shared.state.lock().panic.take()
    }

    /// Update the idle budget used by the worker loop the next time it
    /// parks. `0.0` disables the timeout.
    pub fn set_max_idle(&self, seconds: f32) {
        self.shared.state.lock().max_idle = seconds;
    }

    /// Submit a partition of a parallel range loop.
    ///
    /// Non-blocking. Resurrects the thread if it had self-terminated.
    ///
    /// # Panics
    ///
    /// Panics if a task is already running on this worker.
    ///
    /// # Safety
    ///
    /// The closure behind `call` must stay alive, and must not be allowed to
    /// go out of scope, until this worker has finished executing it (observe
    /// completion through [`Worker::wait`]).
    pub unsafe fn submit_range(&self, start: i32, end: i32, call: RangeFn) -> Result<()> {
        self.submit(Task::Range { start, end, call })
    }

    /// Submit an owning callable.
    ///
    /// Non-blocking. Resurrects the thread if it had self-terminated.
    ///
    /// # Panics
    ///
    /// Panics if a task is already running on this worker.
    pub fn submit_generic<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Task::Generic(Box::new(f)))
    }

    pub(crate) fn submit(&self, task: Task) -> Result<()> {
        let mut state = self.shared.state.lock();
        assert!(
            !state.running,
            "worker #{} already has a task running; wait for it before submitting",
            self.id
        );

        state.trace = trace::capture();
        state.panic = None;
        state.task = task;

        if state.killed {
            #[cfg(feature = "tracing")]
            debug!(worker = self.id, "resurrecting worker");

            // The previous thread has exited (or is past its last mailbox
            // check); reclaim its handle before spawning a replacement.
            let stale = state.handle.take();
            finish_handle(stale, WaitResult::Finished);
            match self.spawn_thread() {
                Ok(handle) => {
                    state.handle = Some(handle);
                    state.killed = false;
                }
                Err(e) => {
                    state.task = Task::None;
                    return Err(e);
                }
            }
        }

        state.running = true;
        drop(state);
        self.shared.cv.notify_one();
        Ok(())
    }

    /// Block until the current task finishes, re-raising any panic it
    /// captured. `timeout_ms == 0` waits indefinitely; on [`WaitResult::Timeout`]
    /// the task keeps running in the background.
    pub fn wait(&self, timeout_ms: u32) -> WaitResult {
        let result = self.wait_quiet(timeout_ms);
        if result == WaitResult::Finished {
            if let Some(payload) = self.take_panic() {
                resume_unwind(payload);
            }
        }
        result
    }

    /// Like [`Worker::wait`], but never re-raises: a captured panic stays
    /// observable through [`Worker::has_panic`] / [`Worker::take_panic`].
    pub fn wait_quiet(&self, timeout_ms: u32) -> WaitResult {
        let mut state = self.shared.state.lock();
        if timeout_ms > 0 {
            let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
            while state.running && !state.killed {
                if self.shared.cv.wait_until(&mut state, deadline).timed_out() {
                    return WaitResult::Timeout;
                }
            }
        } else {
            while state.running && !state.killed {
                self.shared.cv.wait(&mut state);
            }
        }
        WaitResult::Finished
    }

    /// Ask the worker to terminate and reclaim its thread.
    ///
    /// Waits up to `timeout_ms` (0 = indefinitely) for the current callable
    /// to finish. The thread is joined when the wait finished and the caller
    /// is not the worker itself; otherwise it is detached. Idempotent.
    pub fn kill(&self, timeout_ms: u32) -> WaitResult {
        {
            let mut state = self.shared.state.lock();
            if state.killed {
                let stale = state.handle.take();
                drop(state);
                return finish_handle(stale, WaitResult::Finished);
            }
            state.killed = true;
        }
        self.shared.cv.notify_all();
        let result = self.wait_quiet(timeout_ms);
        let handle = self.shared.state.lock().handle.take();
        finish_handle(handle, result)
    }

    fn spawn_thread(&self) -> Result<JoinHandle<()>> {
        let shared = Arc::clone(&self.shared);
        let id = self.id;
        thread::Builder::new()
            .name(format!("task-{}", id))
            .spawn(move || run(&shared, id))
            .map_err(|e| PoolError::spawn(id, e))
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.kill(0);
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("running", &state.running)
            .field("killed", &state.killed)
            .field("max_idle", &state.max_idle)
            .finish()
    }
}

/// Join a reclaimed thread handle, or detach it when joining would block
/// forever (timeout) or deadlock (worker reclaiming itself).
fn finish_handle(handle: Option<JoinHandle<()>>, result: WaitResult) -> WaitResult {
    if let Some(handle) = handle {
        if result == WaitResult::Timeout || handle.thread().id() == thread::current().id() {
            drop(handle); // detach
        } else {
            // The loop catches every panic, so join can only fail if the
            // runtime itself is tearing down; nothing to do about it here.
            let _ = handle.join();
        }
    }
    result
}

/// The worker loop: park, consume the mailbox, execute, repeat.
fn run(shared: &Shared, id: usize) {
    #[cfg(feature = "tracing")]
    debug!(worker = id, "worker started");

    loop {
        let task = {
            let mut state = shared.state.lock();
            if !wait_for_task(shared, &mut state) {
                #[cfg(feature = "tracing")]
                debug!(
                    worker = id,
                    killed = state.killed,
                    "worker stopping"
                );
                state.killed = true;
                state.running = false;
                shared.cv.notify_all();
                return;
            }
            // Consume atomically: the slot is cleared before the callable
            // runs so a post-completion submission finds it empty.
            let task = std::mem::take(&mut state.task);
            state.running = true;
            task
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| match task {
            // Safety: the submitter of a range task keeps the closure alive
            // until it has observed completion through wait().
            Task::Range { start, end, call } => unsafe { call.invoke(start, end) },
            Task::Generic(f) => f(),
            Task::None => {}
        }));

        let mut state = shared.state.lock();
        if let Err(payload) = outcome {
            report_unhandled(id, &payload, state.trace.as_deref());
            state.panic = Some(payload);
        }
        state.running = false;
        shared.cv.notify_all();
    }
}

/// Park until there is a task or the worker must terminate.
///
/// Returns `true` when a task is available, `false` to terminate. An idle
/// budget above zero bounds each park; when the timed wait expires the
/// mailbox is checked once more to absorb a racing submission.
fn wait_for_task(shared: &Shared, state: &mut parking_lot::MutexGuard<'_, WorkerState>) -> bool {
    loop {
        if state.killed {
            return false;
        }
        if !state.task.is_none() {
            return true;
        }
        let max_idle = state.max_idle;
        if max_idle > 1e-6 {
            let budget = Duration::from_secs_f32(max_idle);
            if shared.cv.wait_for(state, budget).timed_out() {
                return !state.task.is_none();
            }
        } else {
            shared.cv.wait(state);
        }
    }
}

fn report_unhandled(id: usize, payload: &TaskPanic, start_trace: Option<&str>) {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };

    #[cfg(feature = "tracing")]
    tracing::error!(
        worker = id,
        panic_message = %message,
        start_trace = start_trace.unwrap_or(""),
        "unhandled panic in task"
    );
    #[cfg(not(feature = "tracing"))]
    match start_trace {
        Some(trace) => eprintln!(
            "worker #{}: unhandled panic in task: {}\ntask start trace:\n{}",
            id, message, trace
        ),
        None => eprintln!("worker #{}: unhandled panic in task: {}", id, message),
    }
}
