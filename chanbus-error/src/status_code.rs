use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Коды статуса для категоризации ошибок шины.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки и ошибки вызова (аргументы, контекст, инициализация)
/// - 2xxx: Ошибки сообщения (валидатор)
/// - 3xxx: Блокировка канала
/// - 4xxx: Доставка наблюдателям
///
/// # Реализация:
/// - `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`.
/// - опционально: `strum` для `AsRefStr`/`EnumIter` (feature = "strum").
/// - опционально: `serde_repr` для сериализации в виде числового значения
///   (feature = "serde_repr").
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Internal = 1001,
    InvalidArgs = 1002,
    CalledFromInterrupt = 1003,
    NotInitialized = 1004,

    // === 2xxx: Сообщение ===
    MessageRejected = 2000,

    // === 3xxx: Блокировка канала ===
    LockTimeout = 3000,

    // === 4xxx: Доставка ===
    DeliveryTimeout = 4000,
    WaitTimeout = 4001,
    NotASubscriber = 4002,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// Значения errno, которые возвращал C-интерфейс шины (со знаком минус).
const EIO: i32 = 5;
const EAGAIN: i32 = 11;
const EFAULT: i32 = 14;
const ENODEV: i32 = 19;
const EINVAL: i32 = 22;
const ENOMSG: i32 = 42;

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    ///
    /// Возвращает `None`, если значение не соответствует ни одному варианту.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Отрицательный errno, соответствующий коду (0 для `Success`).
    ///
    /// Нужен для прослоек, которые отдают результат в C-стиле.
    pub const fn errno(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InvalidArgs | Self::NotASubscriber => -EINVAL,
            Self::MessageRejected => -ENOMSG,
            Self::LockTimeout | Self::DeliveryTimeout | Self::WaitTimeout => -EAGAIN,
            Self::CalledFromInterrupt => -EFAULT,
            Self::NotInitialized => -ENODEV,
            Self::Unknown | Self::Internal => -EIO,
        }
    }

    /// Истёк ли бюджет ожидания. Повтор операции позже может завершиться
    /// успешно; сама шина никогда не повторяет операции.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LockTimeout | Self::DeliveryTimeout | Self::WaitTimeout
        )
    }

    /// Ошибка использования API: повтор с теми же аргументами бессмысленен.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgs
                | Self::CalledFromInterrupt
                | Self::NotInitialized
                | Self::NotASubscriber
        )
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::MessageRejected | Self::WaitTimeout => LogLevel::Debug,
            Self::LockTimeout => LogLevel::Info,
            Self::DeliveryTimeout => LogLevel::Warn,
            Self::InvalidArgs
            | Self::CalledFromInterrupt
            | Self::NotInitialized
            | Self::NotASubscriber => LogLevel::Warn,
            Self::Unknown | Self::Internal => LogLevel::Error,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        // Если включён feature "strum", используем human-readable имя (AsRefStr).
        // Иначе Debug-имя.
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
