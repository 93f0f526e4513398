use super::{
    errors::{self, PoolError},
    model::{WorkerId, WorkerState},
};
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};
use tokio::task::JoinHandle;


/// Разделяемая ячейка состояния воркера
#[derive(Debug, Clone)]
pub struct WorkerStatus(Arc<AtomicU8>);

impl WorkerStatus {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(WorkerState::Idle.as_u8())))
    }

    #[inline]
    pub(crate) fn set(&self, state: WorkerState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    #[inline]
    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.get() == WorkerState::Stopped
    }
}


/// Handle на запущенный воркер
pub(crate) struct WorkerHandle {
    pub(crate) id: WorkerId,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn new(id: WorkerId, join: JoinHandle<()>) -> Self {
        Self { id, join }
    }

    pub(crate) async fn join(self) -> Result<(), PoolError> {
        let id = self.id;
        self.join.await.map_err(|e| errors::join_failed(id, e))
    }
}
