use super::{
    channel::{Channel, ResultChannel, TaskQueue},
    config::Config,
    errors::{PoolError, PushError},
    handle::{WorkerHandle, WorkerStatus},
    model::{Envelope, PoolMetrics, ResultItem, WorkItem, WorkerId, WorkerState},
    observer::{self, ExecutionSink},
    operation::OperationTable,
    worker::{Counters, Worker},
};
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio::{
    sync::Barrier,
    time::{Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};


const CREATED: u8 = 0;
const RUNNING: u8 = 1;
const SHUT_DOWN: u8 = 2;


/// Пул воркеров: submit -> TaskQueue -> Worker -> ResultChannel -> collect.
///
/// Остановка кооперативная: `shutdown` кладёт по одному `Envelope::Stop` на
/// воркер и ждёт, пока все воркеры перейдут в `Stopped`. Выполняющийся
/// элемент никогда не прерывается.
pub struct WorkerPool<V> {
    table: Arc<OperationTable<V>>,
    config: Config,
    tasks: Arc<TaskQueue<V>>,
    results: Arc<ResultChannel<V>>,
    counters: Arc<Counters>,
    sink: Option<Arc<dyn ExecutionSink<V>>>,
    lifecycle: AtomicU8,
    workers: Mutex<Vec<WorkerHandle>>,
    statuses: Mutex<Vec<(WorkerId, WorkerStatus)>>,
}

impl<V> WorkerPool<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(table: OperationTable<V>, config: Config) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self {
            table: Arc::new(table),
            tasks: Arc::new(Channel::new(config.task_capacity)),
            results: Arc::new(Channel::new(config.result_capacity)),
            config,
            counters: Arc::new(Counters::default()),
            sink: None,
            lifecycle: AtomicU8::new(CREATED),
            workers: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
        })
    }

    /// Подключает приёмник событий выполнения. Действует для воркеров,
    /// запущенных после вызова.
    pub fn with_sink<S: ExecutionSink<V>>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn operations(&self) -> &OperationTable<V> {
        &self.table
    }

    /// Запускает `worker_count` воркеров и возвращается, когда все они
    /// вошли в свой цикл (а не когда завершились).
    pub async fn start(&self, worker_count: usize) -> Result<(), PoolError> {
        if worker_count == 0 {
            return Err(PoolError::ZeroWorkers);
        }
        let ready = self.spawn_workers(worker_count)?;
        ready.wait().await;
        info!(workers = worker_count, "worker pool started");
        Ok(())
    }

    fn spawn_workers(&self, worker_count: usize) -> Result<Arc<Barrier>, PoolError> {
        // переход состояния и запуск под одним локом, иначе параллельный
        // shutdown может не увидеть воркеров и не послать им Stop
        let mut workers = self.workers.lock();
        match self.lifecycle.compare_exchange(CREATED, RUNNING, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {}
            Err(SHUT_DOWN) => return Err(PoolError::ShutDown),
            Err(_) => return Err(PoolError::AlreadyStarted),
        }

        let events = self.sink.clone().map(|sink| {
            let (sender, _dispatcher) = observer::spawn_dispatcher(sink);
            sender
        });

        let ready = Arc::new(Barrier::new(worker_count + 1));
        let mut statuses = Vec::with_capacity(worker_count);

        for n in 0..worker_count {
            let id = WorkerId(n);
            let status = WorkerStatus::new();
            let worker = Worker {
                id,
                status: status.clone(),
                table: self.table.clone(),
                tasks: self.tasks.clone(),
                results: self.results.clone(),
                counters: self.counters.clone(),
                events: events.clone(),
                offload_blocking: self.config.offload_blocking,
            };

            self.counters.live_workers.fetch_add(1, Ordering::AcqRel);
            let ready = ready.clone();
            let join = tokio::spawn(async move {
                worker.run(ready).await;
            });

            statuses.push((id, status));
            workers.push(WorkerHandle::new(id, join));
        }

        *self.statuses.lock() = statuses;
        Ok(ready)
    }

    /// Можно вызывать до `start` - элементы дождутся воркеров в очереди
    pub async fn submit(&self, item: WorkItem<V>) -> Result<(), PoolError> {
        match self.tasks.push(Envelope::Work(item)).await {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            // async push ждёт слот, поэтому Full здесь не бывает
            Err(PushError::Closed(_) | PushError::Full(_)) => Err(PoolError::ShutDown),
        }
    }

    pub async fn submit_all<I>(&self, items: I) -> Result<usize, PoolError>
    where
        I: IntoIterator<Item = WorkItem<V>>,
    {
        let mut submitted = 0;
        for item in items {
            self.submit(item).await?;
            submitted += 1;
        }
        Ok(submitted)
    }

    /// Ждёт ровно `expected` результатов, в порядке поступления
    pub async fn collect(&self, expected: usize) -> Vec<ResultItem<V>> {
        let mut results = Vec::with_capacity(expected);
        while results.len() < expected {
            results.push(self.results.pop().await);
        }
        results
    }

    /// Как `collect`, но возвращает то, что успело прийти до дедлайна.
    /// Уже полученные результаты не теряются.
    pub async fn collect_timeout(&self, expected: usize, timeout: Duration) -> Vec<ResultItem<V>> {
        let deadline = Instant::now() + timeout;
        let mut results = Vec::with_capacity(expected);
        while results.len() < expected {
            match tokio::time::timeout_at(deadline, self.results.pop()).await {
                Ok(item) => results.push(item),
                Err(_) => {
                    warn!(received = results.len(), expected, "collect timed out");
                    break;
                }
            }
        }
        results
    }

    pub fn try_collect(&self) -> Option<ResultItem<V>> {
        self.results.try_pop()
    }

    /// Кладёт по одному Stop на каждый запущенный воркер и ждёт их остановки.
    /// После этого `submit` возвращает `PoolError::ShutDown`.
    ///
    /// С ограниченным ResultChannel (`Capacity::Bounded`) результаты нужно
    /// забирать до вызова или параллельно с ним. Иначе воркеры повиснут в
    /// push результата, Stop не будет прочитан и ожидание не закончится.
    /// `shutdown_timeout` в этом случае вернёт `LivenessViolation`.
    pub async fn shutdown(&self) -> Result<(), PoolError> {
        self.send_sentinels();
        self.wait_stopped().await;
        self.join_workers().await
    }

    /// Watchdog-вариант shutdown: если воркеры не остановились за `timeout`,
    /// возвращает `LivenessViolation`. Воркеры при этом не прерываются.
    pub async fn shutdown_timeout(&self, timeout: Duration) -> Result<(), PoolError> {
        self.send_sentinels();
        if tokio::time::timeout(timeout, self.wait_stopped()).await.is_err() {
            let live_workers = self.counters.live_workers.load(Ordering::Acquire);
            warn!(live_workers, "workers did not stop in time");
            return Err(PoolError::LivenessViolation { live_workers });
        }
        self.join_workers().await
    }

    fn send_sentinels(&self) {
        let workers = self.workers.lock();
        let previous = self.lifecycle.swap(SHUT_DOWN, Ordering::AcqRel);
        if previous == SHUT_DOWN {
            return;
        }
        self.tasks.close();

        let spawned = workers.len();
        for _ in 0..spawned {
            self.tasks.force_push(Envelope::Stop);
        }
        info!(workers = spawned, "shutdown requested");
    }

    async fn wait_stopped(&self) {
        loop {
            let notified = self.counters.all_stopped.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.counters.live_workers.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    async fn join_workers(&self) -> Result<(), PoolError> {
        let handles = std::mem::take(&mut *self.workers.lock());
        let mut joins: FuturesUnordered<_> = handles.into_iter().map(WorkerHandle::join).collect();

        let mut first_error = None;
        while let Some(joined) = joins.next().await {
            if let Err(err) = joined {
                warn!(error = %err, "worker join failed");
                first_error.get_or_insert(err);
            }
        }
        debug!("all workers joined");
        first_error.map_or(Ok(()), Err)
    }

    pub fn worker_states(&self) -> Vec<(WorkerId, WorkerState)> {
        self.statuses
            .lock()
            .iter()
            .map(|(id, status)| (*id, status.get()))
            .collect()
    }

    pub fn is_shut_down(&self) -> bool {
        self.lifecycle.load(Ordering::Acquire) == SHUT_DOWN
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            live_workers: self.counters.live_workers.load(Ordering::Relaxed),
            idle_workers: self.counters.idle_workers.load(Ordering::Relaxed),
            queued_tasks: self.tasks.len(),
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Периодически отдаёт `PoolMetrics` в callback.
    ///
    /// Мониторинг завершается сам после остановки всех воркеров, отдав
    /// последний снимок. До этого его можно снять через возвращённый токен.
    /// В обоих случаях задача отпускает свою ссылку на пул.
    pub fn start_monitoring<F>(self: &Arc<Self>, interval: Duration, callback: F) -> CancellationToken
    where
        F: Fn(PoolMetrics) + Send + 'static,
    {
        let weak = Arc::downgrade(self);
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            // interval паникует на нулевом периоде
            let mut ticks = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // первый тик interval срабатывает сразу
            ticks.tick().await;

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticks.tick() => {}
                }

                let Some(pool) = weak.upgrade() else { break };
                let metrics = pool.metrics();
                let drained = pool.is_shut_down() && metrics.live_workers == 0;
                callback(metrics);
                if drained {
                    debug!("pool stopped, monitoring finished");
                    break;
                }
            }
        });

        token
    }
}
