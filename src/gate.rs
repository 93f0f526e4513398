//! Advisory-замок для сериализации побочных эффектов вне пула
//! (например, упорядоченный вывод в консоль).

use super::errors::GateError;
use std::{
    fmt,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerId(pub u64);

impl CallerId {
    /// Уникальный в пределах процесса идентификатор
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<u64> for CallerId {
    fn from(id: u64) -> Self {
        CallerId(id)
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "caller-{}", self.0)
    }
}


/// Не реентерабельный: повторный acquire тем же caller зависнет.
/// Порядок среди ожидающих не гарантируется.
pub struct MutualExclusionGate {
    name: String,
    // (владелец, номер захвата)
    holder: Mutex<Option<(CallerId, u64)>>,
    tickets: AtomicU64,
    released: Notify,
}

impl MutualExclusionGate {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            holder: Mutex::new(None),
            tickets: AtomicU64::new(0),
            released: Notify::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn holder(&self) -> Option<CallerId> {
        self.holder.lock().map(|(caller, _)| caller)
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        self.holder.lock().is_some()
    }

    fn try_take(&self, caller: CallerId) -> Option<u64> {
        let mut holder = self.holder.lock();
        if holder.is_some() {
            return None;
        }
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        *holder = Some((caller, ticket));
        Some(ticket)
    }

    /// Ждёт освобождения и захватывает gate. Guard освобождает gate при drop,
    /// в том числе при панике и отмене футуры.
    pub async fn acquire(&self, caller: CallerId) -> GateGuard<'_> {
        let ticket = loop {
            if let Some(ticket) = self.try_take(caller) {
                break ticket;
            }

            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(ticket) = self.try_take(caller) {
                break ticket;
            }
            notified.await;
        };
        trace!(gate = %self.name, %caller, ticket, "gate acquired");
        GateGuard {
            gate: self,
            caller,
            ticket,
            released: false,
        }
    }

    pub fn try_acquire(&self, caller: CallerId) -> Result<GateGuard<'_>, GateError> {
        match self.try_take(caller) {
            Some(ticket) => Ok(GateGuard {
                gate: self,
                caller,
                ticket,
                released: false,
            }),
            None => Err(GateError::WouldBlock(self.name.clone())),
        }
    }

    /// Освобождение только текущим владельцем
    pub fn release(&self, caller: CallerId) -> Result<(), GateError> {
        self.release_if(caller, |_| true)
    }

    /// Снимает захват, только если он всё ещё тот, что выдан guard-у
    fn release_ticket(&self, caller: CallerId, ticket: u64) -> Result<(), GateError> {
        self.release_if(caller, |held| held == ticket)
    }

    fn release_if(&self, caller: CallerId, matches: impl FnOnce(u64) -> bool) -> Result<(), GateError> {
        {
            let mut holder = self.holder.lock();
            match *holder {
                Some((held_by, ticket)) if held_by == caller && matches(ticket) => *holder = None,
                current => {
                    return Err(GateError::NotHolder {
                        gate: self.name.clone(),
                        caller,
                        holder: current.map(|(held_by, _)| held_by),
                    });
                }
            }
        }
        self.released.notify_one();
        trace!(gate = %self.name, %caller, "gate released");
        Ok(())
    }

    pub async fn with<F, R>(&self, caller: CallerId, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.acquire(caller).await;
        f()
    }

    pub async fn with_async<F, Fut, R>(&self, caller: CallerId, f: F) -> R
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let _guard = self.acquire(caller).await;
        f().await
    }
}

impl fmt::Debug for MutualExclusionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutualExclusionGate")
            .field("name", &self.name)
            .field("holder", &self.holder())
            .finish()
    }
}


/// Scoped-захват gate
#[derive(Debug)]
#[must_use = "gate is released as soon as the guard is dropped"]
pub struct GateGuard<'a> {
    gate: &'a MutualExclusionGate,
    caller: CallerId,
    ticket: u64,
    released: bool,
}

impl GateGuard<'_> {
    #[inline]
    pub fn caller(&self) -> CallerId {
        self.caller
    }

    pub fn release(mut self) -> Result<(), GateError> {
        self.released = true;
        self.gate.release_ticket(self.caller, self.ticket)
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            // после ручного gate.release() тот же caller мог захватить gate
            // заново, этот захват уже не наш
            let _ = self.gate.release_ticket(self.caller, self.ticket);
        }
    }
}
