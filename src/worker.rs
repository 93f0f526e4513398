use super::{
    channel::{ResultChannel, TaskQueue},
    errors::{ExecutionCause, ExecutionError, TaskError},
    handle::WorkerStatus,
    model::{Envelope, ExecutionEvent, ResultItem, WorkItem, WorkerId, WorkerState},
    observer::EventSender,
    operation::{Operation, OperationTable},
};
use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};
use tokio::sync::{Barrier, Notify};
use tracing::{debug, warn};


/// Счётчики, общие для пула и всех воркеров
#[derive(Default)]
pub(crate) struct Counters {
    pub(crate) submitted: AtomicUsize,
    pub(crate) completed: AtomicUsize,
    pub(crate) failed: AtomicUsize,
    pub(crate) idle_workers: AtomicUsize,
    pub(crate) live_workers: AtomicUsize,
    pub(crate) all_stopped: Notify,
}


/// Воркер: Idle -> Executing -> Idle -> ... -> Stopped.
/// Stop из очереди никогда не выполняется как работа.
pub(crate) struct Worker<V> {
    pub(crate) id: WorkerId,
    pub(crate) status: WorkerStatus,
    pub(crate) table: Arc<OperationTable<V>>,
    pub(crate) tasks: Arc<TaskQueue<V>>,
    pub(crate) results: Arc<ResultChannel<V>>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) events: Option<EventSender<V>>,
    pub(crate) offload_blocking: bool,
}

impl<V> Worker<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// live_workers увеличивает пул до spawn, уменьшает сам воркер
    pub(crate) async fn run(self, ready: Arc<Barrier>) {
        ready.wait().await;
        debug!(worker = %self.id, "worker started");

        loop {
            self.status.set(WorkerState::Idle);
            self.counters.idle_workers.fetch_add(1, Ordering::Relaxed);
            let envelope = self.tasks.pop().await;
            self.counters.idle_workers.fetch_sub(1, Ordering::Relaxed);

            let item = match envelope {
                Envelope::Work(item) => item,
                Envelope::Stop => break,
            };

            self.status.set(WorkerState::Executing);
            let result = self.execute(item).await;
            if let Err(err) = self.results.push(result).await {
                warn!(worker = %self.id, error = %err, "result dropped");
            }
        }

        self.status.set(WorkerState::Stopped);
        debug!(worker = %self.id, "worker stopped");

        if self.counters.live_workers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.counters.all_stopped.notify_waiters();
        }
    }

    async fn execute(&self, item: WorkItem<V>) -> ResultItem<V> {
        let started = Instant::now();
        let WorkItem { operation, arguments } = item;

        let value = match self.table.get(&operation) {
            None => Err(TaskError::UnknownOperation {
                operation: operation.clone(),
            }),
            Some(op) => self.invoke(op, &arguments).await.map_err(|cause| {
                TaskError::from(ExecutionError {
                    operation: operation.clone(),
                    arguments: arguments.clone(),
                    cause,
                })
            }),
        };
        let elapsed = started.elapsed();

        match &value {
            Ok(_) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(worker = %self.id, %operation, ?elapsed, "work item done");
            }
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker = %self.id, %operation, error = %err, "work item failed");
            }
        }

        if let Some(events) = &self.events {
            events.emit(ExecutionEvent {
                worker: self.id,
                operation: operation.clone(),
                arguments: arguments.clone(),
                duration: elapsed,
                succeeded: value.is_ok(),
            });
        }

        ResultItem {
            worker: self.id,
            operation,
            arguments,
            value,
            elapsed,
        }
    }

    async fn invoke(&self, op: &Operation<V>, arguments: &[V]) -> Result<V, ExecutionCause> {
        if let Some(expected) = op.arity() {
            if expected != arguments.len() {
                return Err(ExecutionCause::ArityMismatch {
                    expected,
                    actual: arguments.len(),
                });
            }
        }

        let func = op.func();
        let outcome = if self.offload_blocking {
            let args = arguments.to_vec();
            let joined = tokio::task::spawn_blocking(move || {
                catch_unwind(AssertUnwindSafe(|| func(args.as_slice())))
            })
            .await;
            match joined {
                Ok(outcome) => outcome,
                Err(join_err) => return Err(ExecutionCause::JoinFailed(join_err.to_string())),
            }
        } else {
            catch_unwind(AssertUnwindSafe(|| func(arguments)))
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ExecutionCause::Failed(err.0)),
            Err(payload) => Err(ExecutionCause::Panicked(panic_message(payload.as_ref()))),
        }
    }
}


fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OperationError;

    fn worker(offload_blocking: bool) -> Worker<i64> {
        let mut table = OperationTable::new();
        table
            .register("mul", 2, |args| Ok(args[0] * args[1]))
            .unwrap()
            .register("fail", 0, |_| Err(OperationError::new("boom")))
            .unwrap()
            .register("panic", 0, |_| panic!("exploded"))
            .unwrap();

        Worker {
            id: WorkerId(0),
            status: WorkerStatus::new(),
            table: Arc::new(table),
            tasks: Arc::new(TaskQueue::unbounded()),
            results: Arc::new(ResultChannel::unbounded()),
            counters: Arc::new(Counters::default()),
            events: None,
            offload_blocking,
        }
    }

    #[tokio::test]
    async fn execute_classifies_outcomes() {
        for offload in [true, false] {
            let worker = worker(offload);

            let ok = worker.execute(WorkItem::new("mul", vec![3, 7])).await;
            assert_eq!(ok.value, Ok(21));

            let unknown = worker.execute(WorkItem::new("divide", vec![1, 0])).await;
            assert!(unknown.error().unwrap().is_unknown_operation());

            let failed = worker.execute(WorkItem::new("fail", vec![])).await;
            assert_eq!(
                failed.value,
                Err(TaskError::Execution(ExecutionError {
                    operation: "fail".into(),
                    arguments: vec![],
                    cause: ExecutionCause::Failed("boom".into()),
                }))
            );

            let panicked = worker.execute(WorkItem::new("panic", vec![])).await;
            match panicked.value {
                Err(TaskError::Execution(ExecutionError { cause: ExecutionCause::Panicked(msg), .. })) => {
                    assert_eq!(msg, "exploded");
                }
                other => panic!("expected panic cause, got {:?}", other),
            }

            let arity = worker.execute(WorkItem::new("mul", vec![3])).await;
            match arity.value {
                Err(TaskError::Execution(err)) => {
                    assert_eq!(err.cause, ExecutionCause::ArityMismatch { expected: 2, actual: 1 });
                    assert_eq!(err.arguments, vec![3]);
                }
                other => panic!("expected arity mismatch, got {:?}", other),
            }

            assert_eq!(worker.counters.completed.load(Ordering::Relaxed), 1);
            assert_eq!(worker.counters.failed.load(Ordering::Relaxed), 4);
        }
    }

    #[tokio::test]
    async fn run_stops_on_sentinel_without_executing_it() {
        let worker = worker(false);
        let tasks = worker.tasks.clone();
        let results = worker.results.clone();
        let status = worker.status.clone();
        let counters = worker.counters.clone();
        counters.live_workers.store(1, Ordering::Relaxed);

        tasks.push(Envelope::Work(WorkItem::new("mul", vec![2, 5]))).await.unwrap();
        tasks.push(Envelope::Stop).await.unwrap();
        tasks.push(Envelope::Work(WorkItem::new("mul", vec![4, 4]))).await.unwrap();

        let ready = Arc::new(Barrier::new(1));
        worker.run(ready).await;

        assert!(status.is_stopped());
        assert_eq!(counters.live_workers.load(Ordering::Relaxed), 0);
        assert_eq!(results.try_pop().map(|r| r.value), Some(Ok(10)));
        assert!(results.try_pop().is_none());
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn panic_payloads_are_rendered() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic payload");
    }
}
