#[cfg(test)]
mod tests {
    use taskpool::{
        Capacity, Config, OperationTable, WorkItem, WorkerPool,
    };
    use std::{
        collections::HashSet,
        future::Future,
        sync::Arc,
        time::Instant,
    };

    async fn measure<F, Fut, T>(name: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let start = Instant::now();
        let result = f().await;
        let elapsed = start.elapsed();
        println!("✓ {}: {:?}", name, elapsed);
        result
    }

    fn table() -> OperationTable<u64> {
        let mut table = OperationTable::new();
        table
            .register("partial_sum", 2, |args| Ok((args[0]..args[1]).sum()))
            .unwrap()
            .register("square", 1, |args| Ok(args[0] * args[0]))
            .unwrap();
        table
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn load_test_1_many_small_items() {
        println!("\n=== LOAD TEST 1: 20k лёгких задач, 8 воркеров ===");
        let pool = WorkerPool::new(table(), Config::inline()).unwrap();
        pool.start(8).await.unwrap();

        let results = measure("20k square", || async {
            pool.submit_all((0..20_000u64).map(|i| WorkItem::new("square", vec![i])))
                .await
                .unwrap();
            pool.collect(20_000).await
        })
        .await;

        assert_eq!(results.len(), 20_000);
        assert!(results.iter().all(|r| r.is_ok()));

        let metrics = pool.metrics();
        println!("  Успешно: {}/{}", metrics.completed, metrics.submitted);
        assert_eq!(metrics.completed, 20_000);
        assert_eq!(metrics.success_rate(), 1.0);

        pool.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn load_test_2_range_sum_chunks() {
        println!("\n=== LOAD TEST 2: Сумма диапазона по частям ===");
        const TOTAL: u64 = 15u64.pow(6);
        const CHUNKS: u64 = 20;
        let chunk = TOTAL / CHUNKS;

        let pool = WorkerPool::new(table(), Config::cpu_bound()).unwrap();
        pool.start(pool.config().default_workers).await.unwrap();

        for i in 0..CHUNKS {
            let end = if i == CHUNKS - 1 { TOTAL } else { (i + 1) * chunk };
            pool.submit(WorkItem::new("partial_sum", vec![i * chunk, end])).await.unwrap();
        }

        let total: u64 = measure("20 chunks", || async {
            pool.collect(CHUNKS as usize)
                .await
                .into_iter()
                .map(|r| r.value.unwrap())
                .sum()
        })
        .await;

        assert_eq!(total, (0..TOTAL).sum::<u64>());
        pool.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn load_test_3_concurrent_producers() {
        println!("\n=== LOAD TEST 3: 8 производителей, ограниченная очередь ===");
        const PRODUCERS: u64 = 8;
        const PER_PRODUCER: u64 = 2_000;

        let config = Config::inline()
            .task_capacity(Capacity::Bounded(64))
            .result_capacity(Capacity::Bounded(64));
        let pool = Arc::new(WorkerPool::new(table(), config).unwrap());
        pool.start(4).await.unwrap();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    for i in 0..PER_PRODUCER {
                        let n = p * PER_PRODUCER + i;
                        pool.submit(WorkItem::new("square", vec![n])).await.unwrap();
                    }
                })
            })
            .collect();

        let results = measure("16k items", || pool.collect((PRODUCERS * PER_PRODUCER) as usize)).await;
        for producer in producers {
            producer.await.unwrap();
        }

        let unique: HashSet<u64> = results.iter().map(|r| r.arguments[0]).collect();
        assert_eq!(unique.len(), (PRODUCERS * PER_PRODUCER) as usize);

        pool.shutdown().await.unwrap();
        assert_eq!(pool.metrics().live_workers, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_test_4_repeated_pools() {
        println!("\n=== LOAD TEST 4: 50 циклов start/shutdown ===");
        measure("50 pools", || async {
            for round in 0..50u64 {
                let pool = WorkerPool::new(table(), Config::inline()).unwrap();
                pool.start(4).await.unwrap();
                pool.submit_all((0..10).map(|i| WorkItem::new("square", vec![round + i])))
                    .await
                    .unwrap();
                pool.shutdown().await.unwrap();
                assert_eq!(pool.collect(10).await.len(), 10);
            }
        })
        .await;
    }
}
