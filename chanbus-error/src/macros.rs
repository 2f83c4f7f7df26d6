/// Немедленно возвращает ошибку из текущей функции.
///
/// Ошибка преобразуется через `From`, поэтому макрос работает в любой
/// функции, чей тип ошибки умеет принимать переданное значение.
///
/// Пример:
///
/// ```ignore
/// use chanbus_error::{bail, BusError, BusResult};
///
/// fn check_size(len: usize) -> BusResult<()> {
///     if len == 0 {
///         bail!(BusError::invalid_argument("empty message"));
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err(::core::convert::From::from($err))
    };
}

/// Проверяет условие и вызывает `bail!`, если условие ложно.
///
/// Формы:
/// - `ensure!(cond, err)`: если `cond` ложно, выполняется `bail!(err)`.
/// - `ensure!(cond, "msg")` и `ensure!(cond, "fmt {}", arg)`: возвращают
///   [`BusError::InvalidArgument`](crate::BusError::InvalidArgument) с
///   указанным описанием.
///
/// Пример:
///
/// ```ignore
/// use chanbus_error::{ensure, BusResult};
///
/// fn check(len: usize, expected: usize) -> BusResult<()> {
///     ensure!(len == expected, "message size {} (expected {})", len, expected);
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:literal) => {
        if !($cond) {
            $crate::bail!($crate::BusError::invalid_argument($msg));
        }
    };
    ($cond:expr, $fmt:literal, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($crate::BusError::invalid_argument(format!($fmt, $($arg)*)));
        }
    };
    ($cond:expr, $err:expr) => {
        if !($cond) {
            $crate::bail!($err);
        }
    };
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
