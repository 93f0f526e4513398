use super::model::ExecutionEvent;
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
};
use tracing::trace;


/// Внешний приёмник событий выполнения (тайминги, логирование)
pub trait ExecutionSink<V>: Send + Sync + 'static {
    fn on_event(&self, event: ExecutionEvent<V>);
}

impl<V, F> ExecutionSink<V> for F
where
    F: Fn(ExecutionEvent<V>) + Send + Sync + 'static,
{
    fn on_event(&self, event: ExecutionEvent<V>) {
        self(event)
    }
}


/// Отправитель событий для воркеров. Никогда не блокирует.
pub(crate) struct EventSender<V> {
    tx: mpsc::UnboundedSender<ExecutionEvent<V>>,
}

impl<V> Clone for EventSender<V> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<V> EventSender<V> {
    #[inline]
    pub(crate) fn emit(&self, event: ExecutionEvent<V>) {
        // приёмник мог уже завершиться - событие просто теряется
        let _ = self.tx.send(event);
    }
}


/// Запускает задачу-диспетчер, которая передаёт события в sink.
/// Диспетчер завершается, когда дропнуты все отправители.
pub(crate) fn spawn_dispatcher<V>(sink: Arc<dyn ExecutionSink<V>>) -> (EventSender<V>, JoinHandle<()>)
where
    V: Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<ExecutionEvent<V>>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            sink.on_event(event);
        }
        trace!("execution event dispatcher finished");
    });
    (EventSender { tx }, handle)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkerId;
    use std::time::Duration;

    #[tokio::test]
    async fn events_reach_the_sink_in_order() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let sink: Arc<dyn ExecutionSink<i64>> = Arc::new(move |event: ExecutionEvent<i64>| {
            let _ = seen_tx.send(event.operation);
        });

        let (sender, handle) = spawn_dispatcher(sink);
        for name in ["mul", "plus"] {
            sender.emit(ExecutionEvent {
                worker: WorkerId(0),
                operation: name.into(),
                arguments: vec![1, 2],
                duration: Duration::from_micros(5),
                succeeded: true,
            });
        }
        drop(sender);
        handle.await.unwrap();

        assert_eq!(seen_rx.recv().await.as_deref(), Some("mul"));
        assert_eq!(seen_rx.recv().await.as_deref(), Some("plus"));
    }
}
