//! Integration tests for destruction synchronization

use parcore::prelude::*;
use parcore::read_or_return;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_close_waits_for_sleeping_reader() {
    let order = AtomicUsize::new(0);
    let close = CloseSync::new();

    thread::scope(|scope| {
        scope.spawn(|| {
            let guard = close.try_read().expect("reader acquires");
            thread::sleep(Duration::from_millis(150));
            order.fetch_add(1, Ordering::SeqCst);
            drop(guard);
        });

        thread::sleep(Duration::from_millis(30));
        let begun = Instant::now();
        close.lock_for_close();

        // The closer only proceeded once the reader released.
        assert_eq!(order.load(Ordering::SeqCst), 1);
        assert!(begun.elapsed() >= Duration::from_millis(80));
        assert!(close.try_read().is_none());
    });
}

#[test]
fn test_no_reader_succeeds_after_close_from_any_thread() {
    let close = Arc::new(CloseSync::new());
    close.lock_for_close();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let close = Arc::clone(&close);
        handles.push(thread::spawn(move || close.try_read().is_none()));
    }
    for handle in handles {
        assert!(handle.join().expect("reader thread"));
    }
}

#[test]
fn test_pool_reader_blocks_owner_teardown() {
    struct Cache {
        close: CloseSync,
        entries: std::sync::Mutex<Vec<u32>>,
    }

    let cache = Arc::new(Cache {
        close: CloseSync::new(),
        entries: std::sync::Mutex::new(Vec::new()),
    });

    let shared = Arc::clone(&cache);
    let worker = parcore::parallel_task(move || {
        let Some(_guard) = shared.close.try_read() else {
            return;
        };
        thread::sleep(Duration::from_millis(120));
        shared.entries.lock().unwrap().push(7);
    })
    .expect("submit");

    // Let the task take its guard, then close.
    thread::sleep(Duration::from_millis(30));
    cache.close.lock_for_close();

    // The background write completed before the close finished.
    assert_eq!(*cache.entries.lock().unwrap(), vec![7]);
    assert!(cache.close.try_read().is_none());
    worker.wait(0);
}

#[test]
fn test_late_readers_bail_out_cleanly() {
    let hits = AtomicUsize::new(0);
    let close = CloseSync::new();

    fn read_step(close: &CloseSync, hits: &AtomicUsize) {
        read_or_return!(close);
        hits.fetch_add(1, Ordering::SeqCst);
    }

    read_step(&close, &hits);
    read_step(&close, &hits);
    close.lock_for_close();
    read_step(&close, &hits);

    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_many_parallel_readers_coexist() {
    let close = CloseSync::new();
    let active = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let _guard = close.try_read().expect("reader");
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(60));
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }
    });

    assert!(peak.load(Ordering::SeqCst) > 1);
}
