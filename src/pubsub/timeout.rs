use std::time::Duration;

use crate::host::{Host, Tick};

/// Относительный таймаут, который передаёт вызывающий код.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Не ждать: операция либо выполняется сразу, либо завершается ошибкой.
    NoWait,
    /// Ждать не больше указанного числа тиков. `Ticks(0)` равносилен
    /// `NoWait`.
    Ticks(Tick),
    /// Ждать бесконечно.
    Forever,
}

impl Timeout {
    pub const fn ticks(n: Tick) -> Self {
        if n == 0 {
            Self::NoWait
        } else {
            Self::Ticks(n)
        }
    }

    /// Переводит таймаут в ожидание для примитивов хоста (`None` означает
    /// ожидание без ограничения). Арифметика насыщающая.
    pub fn as_duration(
        &self,
        tick_period: Duration,
    ) -> Option<Duration> {
        match *self {
            Self::Forever => None,
            Self::NoWait | Self::Ticks(0) => Some(Duration::ZERO),
            Self::Ticks(n) => {
                let nanos = u64::try_from(tick_period.as_nanos()).unwrap_or(u64::MAX);
                Some(Duration::from_nanos(nanos.saturating_mul(n)))
            }
        }
    }
}

/// Абсолютный срок, до которого должна завершиться операция.
///
/// Вычисляется один раз в начале вызова; все последующие ожидания внутри
/// того же вызова берут из него остаток бюджета, поэтому их сумма не
/// превышает исходный таймаут.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deadline {
    Never,
    At(Tick),
}

impl Deadline {
    /// Срок, отсчитанный от текущего тика хоста.
    pub fn after<H: Host + ?Sized>(
        host: &H,
        timeout: Timeout,
    ) -> Self {
        match timeout {
            Timeout::Forever => Self::Never,
            Timeout::NoWait | Timeout::Ticks(0) => Self::At(host.now()),
            Timeout::Ticks(n) => Self::At(host.now().saturating_add(n)),
        }
    }

    /// Остаток бюджета: `max(deadline - now, 0)`.
    pub fn remaining<H: Host + ?Sized>(
        &self,
        host: &H,
    ) -> Timeout {
        match *self {
            Self::Never => Timeout::Forever,
            Self::At(end) => Timeout::ticks(end.saturating_sub(host.now())),
        }
    }
}
