use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use taskpool::{CallerId, Config, MutualExclusionGate, OperationTable, WorkItem, WorkerPool};
use std::{hint::black_box, sync::Arc};

fn create_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .unwrap()
}

fn table() -> OperationTable<u64> {
    let mut table = OperationTable::new();
    table.register("mul", 2, |args| Ok(args[0] * args[1])).unwrap();
    table
}

// Benchmark 1: submit -> execute -> collect
fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");

    for size in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));

        for (name, config) in [("inline", Config::inline()), ("offload", Config::default())] {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                let rt = create_runtime();
                let pool = rt.block_on(async {
                    let pool = WorkerPool::new(table(), config.clone()).unwrap();
                    pool.start(num_cpus::get()).await.unwrap();
                    pool
                });

                b.to_async(&rt).iter(|| {
                    let pool = &pool;
                    async move {
                        for i in 0..size {
                            pool.submit(WorkItem::new("mul", vec![i, 7])).await.unwrap();
                        }
                        black_box(pool.collect(size as usize).await);
                    }
                });

                rt.block_on(pool.shutdown()).unwrap();
            });
        }
    }

    group.finish();
}

// Benchmark 2: contention on the gate
fn bench_gate_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_contention");

    for callers in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(callers), &callers, |b, &callers| {
            let rt = create_runtime();
            let gate = Arc::new(MutualExclusionGate::new("bench"));

            b.to_async(&rt).iter(|| {
                let gate = gate.clone();
                async move {
                    let handles: Vec<_> = (0..callers)
                        .map(|_| {
                            let gate = gate.clone();
                            tokio::spawn(async move {
                                let caller = CallerId::next();
                                for _ in 0..100 {
                                    gate.with(caller, || black_box(())).await;
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap();
                    }
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_round_trip, bench_gate_contention);
criterion_main!(benches);
