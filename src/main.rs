use taskpool::{
    CallerId, Config, MutualExclusionGate, OperationTable, WorkItem, WorkerPool,
};
use tokio::runtime::Builder;
use tracing_subscriber::EnvFilter;
use std::{sync::Arc, time::Instant};


const NUMBER_OF_WORKERS: usize = 4;


fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let now = Instant::now();

        let mut table = OperationTable::<i64>::new();
        table
            .register("mul", 2, |args| Ok(args[0] * args[1]))?
            .register("plus", 2, |args| Ok(args[0] + args[1]))?;

        let pool = WorkerPool::new(table, Config::default())?;

        for i in 0..20 {
            pool.submit(WorkItem::new("mul", vec![i, 7])).await?;
        }
        pool.start(NUMBER_OF_WORKERS).await?;

        println!("Unordered results:");
        for result in pool.collect(20).await {
            println!("\t {}", result);
        }

        pool.submit_all((0..10).map(|i| WorkItem::new("plus", vec![i, 8]))).await?;
        for result in pool.collect(10).await {
            println!("\t {}", result);
        }

        pool.shutdown().await?;

        let gate = Arc::new(MutualExclusionGate::new("stdout"));
        let printers: Vec<_> = (0..10)
            .map(|i| {
                let gate = gate.clone();
                tokio::spawn(async move {
                    gate.with(CallerId::next(), || println!("hello world {}", i)).await;
                })
            })
            .collect();
        for printer in printers {
            printer.await?;
        }

        println!("elapsed: {:?}", now.elapsed());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
