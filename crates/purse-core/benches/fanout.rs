//! Benchmarks for balance credits and donation fan-out.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use purse_core::{BalanceStore, SubscriberRegistry};
use purse_protocol::DonationEvent;

fn bench_credit(c: &mut Criterion) {
    let store = BalanceStore::new();

    c.bench_function("credit_same_account", |b| {
        b.iter(|| store.credit(black_box("alice"), black_box(1.5)))
    });
}

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");
    let event = DonationEvent::new("budi", 10_000.0, "semangat terus");

    for subscribers in [1usize, 10, 100] {
        let registry = SubscriberRegistry::new();
        let mut queues: Vec<_> = (0..subscribers)
            .map(|_| registry.register(None).1)
            .collect();

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    let report = registry.broadcast(black_box(&event)).unwrap();
                    for queue in &mut queues {
                        let _ = queue.try_recv();
                    }
                    report
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_credit, bench_broadcast);
criterion_main!(benches);
