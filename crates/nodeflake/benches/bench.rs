use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use nodeflake::{
    AtomicCounter, CancelToken, Generator, LockCounter, MonotonicClock, SequenceCounter, Settings,
    TimeSource, decompose, format, parse,
};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

struct FixedMockTime {
    units: u64,
}

impl TimeSource for FixedMockTime {
    fn current_units(&self) -> u64 {
        self.units
    }
}

// A fixed clock allows one full sequence per counter before the counter
// reports the clock as behind.
const UNIT_IDS: usize = 256;

// Number of IDs generated per benchmark iteration (shared across threads for
// contended benchmarks).
const TOTAL_IDS: usize = 4096;

/// Benchmarks a hot-path counter that never runs out of sequence numbers.
fn bench_counter<C>(c: &mut Criterion, group_name: &str, counter_factory: impl Fn() -> C)
where
    C: SequenceCounter,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(UNIT_IDS as u64));

    group.bench_function(format!("elems/{UNIT_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let counter = counter_factory();
                for _ in 0..UNIT_IDS {
                    black_box(counter.next_id().ok());
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks a counter on the monotonic clock, waiting out exhausted units.
fn bench_counter_mono<C>(c: &mut Criterion, group_name: &str, counter_factory: impl Fn() -> C)
where
    C: SequenceCounter,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let counter = counter_factory();
                for _ in 0..TOTAL_IDS {
                    loop {
                        if let Ok(id) = counter.next_id() {
                            black_box(id);
                            break;
                        }
                        core::hint::spin_loop();
                    }
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks one generator shared across threads, using the retrying call.
fn bench_generator_contended(c: &mut Criterion, group_name: &str) {
    let mut group = c.benchmark_group(group_name);
    let max_threads = num_cpus::get().max(1);

    for thread_count in [1, 2, 4, 8, 16].into_iter().filter(|&n| n <= max_threads) {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements(TOTAL_IDS as u64));
        group.bench_function(format!("elems/{TOTAL_IDS}/threads/{thread_count}"), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();

                for _ in 0..iters {
                    let generator = Generator::new(Settings::new().node_id(1)).unwrap();
                    let barrier = Arc::new(Barrier::new(thread_count + 1));
                    scope(|s| {
                        for _ in 0..thread_count {
                            let generator = generator.clone();
                            let barrier = Arc::clone(&barrier);
                            s.spawn(move || {
                                let token = CancelToken::new();
                                barrier.wait();
                                for _ in 0..ids_per_thread {
                                    black_box(generator.next_id_with_retry(&token).unwrap());
                                }
                            });
                        }
                        barrier.wait();
                    });
                }

                start.elapsed()
            });
        });
    }

    group.finish();
}

fn benchmark_mock_lock(c: &mut Criterion) {
    bench_counter(c, "mock/lock", || {
        LockCounter::new(0, FixedMockTime { units: 1 })
    });
}

fn benchmark_mock_atomic(c: &mut Criterion) {
    bench_counter(c, "mock/atomic", || {
        AtomicCounter::new(0, FixedMockTime { units: 1 })
    });
}

fn benchmark_mono_lock(c: &mut Criterion) {
    let clock = MonotonicClock::new().unwrap();
    bench_counter_mono(c, "mono/lock", || LockCounter::new(0, clock));
}

fn benchmark_mono_atomic(c: &mut Criterion) {
    let clock = MonotonicClock::new().unwrap();
    bench_counter_mono(c, "mono/atomic", || AtomicCounter::new(0, clock));
}

fn benchmark_generator_contended(c: &mut Criterion) {
    bench_generator_contended(c, "generator/contended");
}

fn benchmark_codec(c: &mut Criterion) {
    let generator = Generator::new(Settings::new().node_id(7)).unwrap();
    let ids: Vec<i64> = (0..UNIT_IDS).map(|_| generator.must_next_id()).collect();
    let texts: Vec<String> = ids.iter().copied().map(format).collect();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(UNIT_IDS as u64));
    group.bench_function("format", |b| {
        b.iter(|| {
            for &id in &ids {
                black_box(format(black_box(id)));
            }
        });
    });
    group.bench_function("parse", |b| {
        b.iter(|| {
            for text in &texts {
                black_box(parse(black_box(text)).unwrap());
            }
        });
    });
    group.bench_function("decompose", |b| {
        b.iter(|| {
            for &id in &ids {
                black_box(decompose(black_box(id)).unwrap());
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    // Mock clock
    benchmark_mock_lock,
    benchmark_mock_atomic,
    // Monotonic clock
    benchmark_mono_lock,
    benchmark_mono_atomic,
    benchmark_generator_contended,
    // Text form
    benchmark_codec,
);
criterion_main!(benches);
