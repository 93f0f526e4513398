//! Пул воркеров с общей очередью задач и общим каналом результатов
//!
//! # Features
//! - Таблица операций передаётся в пул явно, без глобального состояния
//! - Кооперативная остановка через sentinel (`Envelope::Stop`) на каждый воркер
//! - Ошибки и паники операций возвращаются как данные в `ResultItem`
//! - Ограниченные и неограниченные каналы
//! - `MutualExclusionGate` для сериализации побочных эффектов вне пула
//! - События выполнения и метрики для мониторинга

pub mod channel;
pub mod config;
pub mod errors;
pub mod gate;
pub mod handle;
pub mod model;
pub mod observer;
pub mod operation;
pub mod pool;
mod worker;

pub use channel::{Channel, ResultChannel, TaskQueue};
pub use config::{Capacity, Config};
pub use errors::{
    ExecutionCause, ExecutionError, GateError, OperationError, PoolError, PushError, RegistryError, TaskError,
};
pub use gate::{CallerId, GateGuard, MutualExclusionGate};
pub use model::{Envelope, ExecutionEvent, PoolMetrics, ResultItem, WorkItem, WorkerId, WorkerState};
pub use observer::ExecutionSink;
pub use operation::OperationTable;
pub use pool::WorkerPool;
