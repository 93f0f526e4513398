use super::{
    config::Capacity,
    errors::PushError,
    model::{Envelope, ResultItem},
};
use std::sync::atomic::{AtomicBool, Ordering};
use crossbeam::deque::{Injector, Steal};
use tokio::sync::{Notify, Semaphore, TryAcquireError};


pub type TaskQueue<V> = Channel<Envelope<V>>;
pub type ResultChannel<V> = Channel<ResultItem<V>>;


/// Многопроизводительный / многопотребительский FIFO канал.
///
/// Элементы хранятся в `Injector`, ожидающие потребители паркуются на `Notify`.
/// Для ограниченного канала свободные слоты считаются семафором.
/// Порядок сохраняется для одного производителя; между производителями
/// порядок не гарантируется.
pub struct Channel<T> {
    queue: Injector<T>,
    available: Notify,
    slots: Option<Semaphore>,
    capacity: Capacity,
    closed: AtomicBool,
}

impl<T> Channel<T> {
    pub fn new(capacity: Capacity) -> Self {
        let slots = match capacity {
            Capacity::Unbounded => None,
            Capacity::Bounded(n) => Some(Semaphore::new(n)),
        };
        Self {
            queue: Injector::new(),
            available: Notify::new(),
            slots,
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(Capacity::Unbounded)
    }

    pub fn bounded(capacity: usize) -> Self {
        Self::new(Capacity::Bounded(capacity))
    }

    #[inline(always)]
    fn enqueue(&self, item: T) {
        self.queue.push(item);
        self.available.notify_one();
    }

    /// Ждёт свободный слот только для ограниченного канала
    pub async fn push(&self, item: T) -> Result<(), PushError<T>> {
        if self.is_closed() {
            return Err(PushError::Closed(item));
        }
        if let Some(slots) = &self.slots {
            match slots.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(PushError::Closed(item)),
            }
        }
        self.enqueue(item);
        Ok(())
    }

    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        if self.is_closed() {
            return Err(PushError::Closed(item));
        }
        if let Some(slots) = &self.slots {
            match slots.try_acquire() {
                Ok(permit) => permit.forget(),
                Err(TryAcquireError::NoPermits) => return Err(PushError::Full(item)),
                Err(TryAcquireError::Closed) => return Err(PushError::Closed(item)),
            }
        }
        self.enqueue(item);
        Ok(())
    }

    /// Push в обход закрытия и лимита. Нужен пулу для sentinel после close().
    pub(crate) fn force_push(&self, item: T) {
        self.enqueue(item);
    }

    pub fn try_pop(&self) -> Option<T> {
        loop {
            match self.queue.steal() {
                Steal::Success(item) => {
                    if let Some(slots) = &self.slots {
                        slots.add_permits(1);
                    }
                    return Some(item);
                }
                Steal::Empty => return None,
                Steal::Retry => std::hint::spin_loop(),
            }
        }
    }

    /// Блокирует (асинхронно) до появления элемента
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.try_pop() {
                return item;
            }

            let notified = self.available.notified();
            tokio::pin!(notified);
            // регистрируемся до повторной проверки, иначе push между проверкой
            // и ожиданием потеряет пробуждение
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return item;
            }
            notified.await;
        }
    }

    /// Закрывает канал для новых push. Уже лежащие элементы остаются доступны.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(slots) = &self.slots {
            slots.close();
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}
