use criterion::{black_box, criterion_group, criterion_main, Criterion};
use parcore::prelude::*;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

fn benchmark_parallel_for(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_for");
    let pool = ThreadPool::new();

    group.bench_function("sum_1m", |b| {
        b.iter(|| {
            let total = AtomicU64::new(0);
            pool.parallel_for(0, 1_000_000, &|start, end| {
                let mut sum = 0u64;
                for i in start..end {
                    sum = sum.wrapping_add(i as u64);
                }
                total.fetch_add(sum, Ordering::Relaxed);
            })
            .expect("parallel_for");
            black_box(total.load(Ordering::Relaxed));
        });
    });

    group.bench_function("serial_baseline_1m", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for i in 0..1_000_000u64 {
                sum = sum.wrapping_add(i);
            }
            black_box(sum);
        });
    });

    group.finish();
}

fn benchmark_task_dispatch(c: &mut Criterion) {
    let pool = ThreadPool::new();

    c.bench_function("generic_task_round_trip", |b| {
        b.iter(|| {
            let worker = pool
                .parallel_task(|| {
                    black_box(1 + 1);
                })
                .expect("submit");
            worker.wait(0);
        });
    });
}

fn benchmark_writers(c: &mut Criterion) {
    let mut group = c.benchmark_group("writers");

    group.bench_function("buffer_writer_u32_x1000", |b| {
        b.iter(|| {
            let mut w = BufferWriter::new(BufferSink::new());
            for i in 0..1000u32 {
                w.write_u32(i).expect("write");
            }
            black_box(w.size());
        });
    });

    group.bench_function("buffered_composite_bytes_x1000", |b| {
        b.iter(|| {
            let mut composite = Composite::new(ArraySink::<512>::new(), BufferSink::new());
            let chunk = [0xA5u8; 24];
            for _ in 0..1000 {
                composite.write_bytes(&chunk).expect("write");
            }
            composite.flush().expect("flush");
            black_box(composite.back().size());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_parallel_for,
    benchmark_task_dispatch,
    benchmark_writers
);
criterion_main!(benches);
