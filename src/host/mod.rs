//! Примитивы хост-платформы, на которых построена шина.
//!
//! - `Host`: монотонные тики, длительность тика и признак контекста
//!   прерывания.
//! - `lock`: исключительная блокировка канала с ограниченным ожиданием.
//! - `queue`: ограниченная очередь подписчика с ограниченным ожиданием.
//!
//! Ожидание во всех примитивах задаётся как `Option<Duration>`: `None` означает
//! бесконечное ожидание, `Some(Duration::ZERO)` означает отказ от ожидания.

pub mod lock;
pub mod queue;

use std::time::{Duration, Instant};

pub use lock::{ChannelLock, LockGuard};
pub use queue::BoundedQueue;

/// Монотонный тик: единица измерения таймаутов шины.
pub type Tick = u64;

/// Длительность тика по умолчанию.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Сервисы хоста, которые нужны движку шины.
pub trait Host: Send + Sync + 'static {
    /// Текущее значение монотонного счётчика тиков.
    fn now(&self) -> Tick;

    /// Реальная длительность одного тика.
    fn tick_period(&self) -> Duration;

    /// Выполняется ли текущий код в контексте прерывания.
    ///
    /// На хосте с потоками ОС прерываний нет, поэтому по умолчанию `false`.
    fn in_interrupt(&self) -> bool {
        false
    }
}

/// Хост поверх `std`: тики отсчитываются от момента создания.
#[derive(Debug, Clone)]
pub struct StdHost {
    epoch: Instant,
    tick_period: Duration,
}

impl StdHost {
    /// Создаёт хост с заданной длительностью тика (не меньше 1 нс).
    pub fn new(tick_period: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            tick_period: tick_period.max(Duration::from_nanos(1)),
        }
    }
}

impl Default for StdHost {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_PERIOD)
    }
}

impl Host for StdHost {
    fn now(&self) -> Tick {
        let elapsed = self.epoch.elapsed().as_nanos();
        let ticks = elapsed / self.tick_period.as_nanos();
        Tick::try_from(ticks).unwrap_or(Tick::MAX)
    }

    fn tick_period(&self) -> Duration {
        self.tick_period
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    /// Тест проверяет, что счётчик тиков монотонно растёт.
    #[test]
    fn test_std_host_ticks_are_monotonic() {
        let host = StdHost::new(Duration::from_millis(1));
        let first = host.now();
        thread::sleep(Duration::from_millis(5));
        let second = host.now();
        assert!(second >= first + 4, "first={first}, second={second}");
    }

    /// Тест проверяет, что нулевая длительность тика заменяется минимальной.
    #[test]
    fn test_zero_tick_period_is_clamped() {
        let host = StdHost::new(Duration::ZERO);
        assert_eq!(host.tick_period(), Duration::from_nanos(1));
        let _ = host.now();
    }

    /// Тест проверяет, что `StdHost` никогда не сообщает о прерывании.
    #[test]
    fn test_std_host_is_never_in_interrupt() {
        assert!(!StdHost::default().in_interrupt());
    }
}
