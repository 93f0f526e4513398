use super::errors::TaskError;
use std::{
    fmt,
    time::Duration,
};


/// Единица работы: имя операции из таблицы + позиционные аргументы
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem<V> {
    pub operation: String,
    pub arguments: Vec<V>,
}

impl<V> WorkItem<V> {
    pub fn new<S: Into<String>>(operation: S, arguments: Vec<V>) -> Self {
        Self {
            operation: operation.into(),
            arguments,
        }
    }
}


/// Элемент очереди задач. Stop - сигнал воркеру завершиться,
/// он никогда не совпадает с реальной работой.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<V> {
    Work(WorkItem<V>),
    Stop,
}

impl<V> Envelope<V> {
    #[inline]
    pub fn is_stop(&self) -> bool {
        matches!(self, Envelope::Stop)
    }
}

impl<V> From<WorkItem<V>> for Envelope<V> {
    fn from(item: WorkItem<V>) -> Self {
        Envelope::Work(item)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Executing,
    Stopped,
}

impl WorkerState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            WorkerState::Idle => 0,
            WorkerState::Executing => 1,
            WorkerState::Stopped => 2,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Idle,
            1 => WorkerState::Executing,
            _ => WorkerState::Stopped,
        }
    }
}


/// Результат выполнения одного WorkItem
#[derive(Debug, Clone, PartialEq)]
pub struct ResultItem<V> {
    pub worker: WorkerId,
    pub operation: String,
    pub arguments: Vec<V>,
    pub value: Result<V, TaskError<V>>,
    pub elapsed: Duration,
}

impl<V> ResultItem<V> {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.value.is_ok()
    }

    #[inline]
    pub fn is_err(&self) -> bool {
        self.value.is_err()
    }

    pub fn ok(&self) -> Option<&V> {
        self.value.as_ref().ok()
    }

    pub fn error(&self) -> Option<&TaskError<V>> {
        self.value.as_ref().err()
    }
}

impl<V: fmt::Debug> fmt::Display for ResultItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} says that {}(", self.worker, self.operation)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", arg)?;
        }
        match &self.value {
            Ok(v) => write!(f, ") = {:?}", v),
            Err(e) => write!(f, ") failed: {}", e),
        }
    }
}


/// Событие для внешнего наблюдателя, по одному на каждый выполненный элемент
#[derive(Debug, Clone)]
pub struct ExecutionEvent<V> {
    pub worker: WorkerId,
    pub operation: String,
    pub arguments: Vec<V>,
    pub duration: Duration,
    pub succeeded: bool,
}


#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub live_workers: usize,
    pub idle_workers: usize,
    pub queued_tasks: usize,
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.live_workers == 0 {
            return 0.0;
        }
        let busy = self.live_workers.saturating_sub(self.idle_workers);
        busy as f64 / self.live_workers as f64
    }

    pub fn in_flight(&self) -> usize {
        self.submitted.saturating_sub(self.completed + self.failed)
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed + self.failed;
        if total == 0 {
            return 1.0;
        }
        self.completed as f64 / total as f64
    }
}
