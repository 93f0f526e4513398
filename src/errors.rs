use super::model::WorkerId;
use super::gate::CallerId;


/// Ошибки управления пулом (не путать с ошибками отдельных задач)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("worker_count must be > 0")]
    ZeroWorkers,

    #[error("pool is already started")]
    AlreadyStarted,

    #[error("pool is shut down")]
    ShutDown,

    #[error("worker join failed: {0}")]
    JoinFailed(String),

    #[error("{live_workers} worker(s) did not stop in time")]
    LivenessViolation { live_workers: usize },

    #[error("config error: {0}")]
    Config(String),
}

impl PoolError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PoolError::Config(msg.into())
    }
}


/// Ошибка, которую возвращает сама зарегистрированная операция
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct OperationError(pub String);

impl OperationError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        OperationError(msg.into())
    }
}

impl From<&str> for OperationError {
    fn from(msg: &str) -> Self {
        OperationError(msg.to_string())
    }
}

impl From<String> for OperationError {
    fn from(msg: String) -> Self {
        OperationError(msg)
    }
}


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionCause {
    #[error("{0}")]
    Failed(String),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("expected {expected} argument(s), got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("join failed: {0}")]
    JoinFailed(String),
}


#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("operation `{operation}` failed: {cause}")]
pub struct ExecutionError<V> {
    pub operation: String,
    pub arguments: Vec<V>,
    pub cause: ExecutionCause,
}


/// Ошибка выполнения одного WorkItem. Никогда не пересекает границу воркера,
/// а приходит как данные внутри ResultItem.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError<V> {
    #[error("unknown operation `{operation}`")]
    UnknownOperation { operation: String },

    #[error(transparent)]
    Execution(#[from] ExecutionError<V>),
}

impl<V> TaskError<V> {
    pub fn is_unknown_operation(&self) -> bool {
        matches!(self, TaskError::UnknownOperation { .. })
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, TaskError::Execution(_))
    }
}


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("operation `{0}` is already registered")]
    Duplicate(String),
}


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("{caller} does not hold gate `{gate}` (holder: {holder:?})")]
    NotHolder {
        gate: String,
        caller: CallerId,
        holder: Option<CallerId>,
    },

    #[error("gate `{0}` is held")]
    WouldBlock(String),
}


#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PushError<T> {
    #[error("channel is full")]
    Full(T),

    #[error("channel is closed")]
    Closed(T),
}

impl<T> PushError<T> {
    pub fn into_inner(self) -> T {
        match self {
            PushError::Full(item) | PushError::Closed(item) => item,
        }
    }
}


/// Воркер упал вне границы catch_unwind (ошибка рантайма)
pub(crate) fn join_failed(worker: WorkerId, err: tokio::task::JoinError) -> PoolError {
    if err.is_panic() {
        PoolError::JoinFailed(format!("{worker} panicked"))
    } else {
        PoolError::JoinFailed(format!("{worker}: {err}"))
    }
}
