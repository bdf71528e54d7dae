//! Submission-site trace capture.
//!
//! When a trace provider is installed, every task submission captures a
//! "where was this task created?" string into the worker. If the task later
//! panics, the report includes that string; without it there would be no hint
//! of where a background task was launched from.

use parking_lot::Mutex;

/// Produces a human-readable trace of the submitting call site.
///
/// Invoked synchronously in the submitting thread at task submission, so it
/// must be safe to call concurrently.
pub type TraceProvider = fn() -> String;

static TRACE_PROVIDER: Mutex<Option<TraceProvider>> = Mutex::new(None);

/// Install or remove the process-wide trace provider.
pub(crate) fn set_provider(provider: Option<TraceProvider>) {
    *TRACE_PROVIDER.lock() = provider;
}

/// Capture a trace for the current submission, if a provider is installed.
pub(crate) fn capture() -> Option<String> {
    let provider = *TRACE_PROVIDER.lock();
    provider.map(|tracer| tracer())
}
