use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

/// Захваченная блокировка канала. Освобождается при `Drop`.
pub type LockGuard<'a> = MutexGuard<'a, Box<[u8]>>;

/// Исключительная блокировка канала вместе с защищаемым буфером сообщения.
///
/// Буфер лежит внутри мьютекса, поэтому прочитать или изменить его без
/// захваченной блокировки невозможно.
#[derive(Debug)]
pub struct ChannelLock {
    inner: Mutex<Box<[u8]>>,
}

impl ChannelLock {
    /// Создаёт блокировку, буфер которой содержит копию `initial`.
    pub fn new(initial: &[u8]) -> Self {
        Self {
            inner: Mutex::new(initial.into()),
        }
    }

    /// Захватывает блокировку, ожидая не дольше `wait`.
    ///
    /// Возвращает `None`, если блокировка не получена вовремя.
    pub fn acquire(
        &self,
        wait: Option<Duration>,
    ) -> Option<LockGuard<'_>> {
        match wait {
            None => Some(self.inner.lock()),
            Some(d) if d.is_zero() => self.inner.try_lock(),
            Some(d) => self.inner.try_lock_for(d),
        }
    }

    /// Удерживается ли блокировка в данный момент.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}
