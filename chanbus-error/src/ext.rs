use std::error::Error;

use crate::{LogLevel, StatusCode};

/// Классификация ошибок шины по статус-коду.
pub trait ErrorExt: Error + Send + Sync + 'static {
    fn status_code(&self) -> StatusCode;

    /// Уровень, на котором шина логирует эту ошибку.
    fn log_level(&self) -> LogLevel {
        self.status_code().log_level()
    }

    /// Отрицательный errno для прослоек в C-стиле.
    fn errno(&self) -> i32 {
        self.status_code().errno()
    }
}
