//! Push/pop/view-claim throughput benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use hatstack::HatStack;

fn bench_single_thread_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_thread");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push", |b| {
        let stack = HatStack::new(1024);
        let mut i = 0usize;
        b.iter(|| {
            stack.push(black_box(i));
            i = i.wrapping_add(1);
        });
    });

    group.bench_function("push_then_pop", |b| {
        let stack = HatStack::new(1024);
        b.iter(|| {
            stack.push(black_box(1));
            black_box(stack.pop());
        });
    });

    group.finish();
}

fn bench_contended_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_push");
    for &threads in &[2usize, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let stack = Arc::new(HatStack::new(1024));
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let stack = Arc::clone(&stack);
                        thread::spawn(move || {
                            for i in 0..256usize {
                                stack.push(t * 256 + i);
                            }
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_view_claim_under_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("view_claim");
    group.bench_function("claim_and_drain", |b| {
        let stack = HatStack::new(1024);
        for i in 0..512usize {
            stack.push(i);
        }
        b.iter(|| {
            let mut view = stack.view();
            let mut count = 0usize;
            while view.view_next().is_some() {
                count += 1;
            }
            black_box(count);
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_single_thread_push_pop,
    bench_contended_push,
    bench_view_claim_under_load
);
criterion_main!(benches);
