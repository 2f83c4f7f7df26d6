use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use tracing_appender::non_blocking::WorkerGuard;

/// Сколько может длиться сброс файлового вывода при `shutdown`, прежде чем
/// будет напечатано предупреждение.
const SHUTDOWN_WARN_AFTER: Duration = Duration::from_secs(5);

/// Handle для управления жизненным циклом логирования.
///
/// Владеет `WorkerGuard` файлового вывода: пока handle жив, фоновый поток
/// записи работает. `shutdown` сбрасывает буферы явно.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    shutdown_in_progress: AtomicBool,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            file_guard,
            shutdown_in_progress: AtomicBool::new(false),
        }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Завершение: сбрасывает файловый вывод и освобождает `WorkerGuard`.
    pub fn shutdown(mut self) {
        self.shutdown_in_progress.store(true, Ordering::Release);
        tracing::info!(file_sink = self.has_file_sink(), "Initiating logging shutdown");

        let start = Instant::now();
        drop(self.file_guard.take());
        let elapsed = start.elapsed();

        if elapsed > SHUTDOWN_WARN_AFTER {
            eprintln!(
                "WARNING: Logging shutdown took {}ms (limit: {}ms)",
                elapsed.as_millis(),
                SHUTDOWN_WARN_AFTER.as_millis()
            );
        }
    }
}

impl Drop for LoggingHandle {
    fn drop(&mut self) {
        if self.file_guard.is_some() && !self.shutdown_in_progress.load(Ordering::Acquire) {
            eprintln!(
                "WARNING: LoggingHandle dropped without explicit shutdown(). \
                 Some logs may be lost."
            );
        }
    }
}
