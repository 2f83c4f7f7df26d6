//! Настройка `tracing` для приложений поверх шины.
//!
//! Библиотека только генерирует события; подписчик устанавливает
//! приложение через [`init_logging`].

pub mod config;
mod filters;
mod formatter;
pub mod handle;

use std::{fs, io};

pub use config::{FileConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use thiserror::Error;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    layer::SubscriberExt, registry::Registry, util::SubscriberInitExt, util::TryInitError, Layer,
};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid logging configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot prepare log directory: {0}")]
    Io(#[from] io::Error),
    #[error("global subscriber already installed: {0}")]
    Init(#[from] TryInitError),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Устанавливает глобальный подписчик: фильтр, консольный вывод и,
/// если задан, файловый.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.validate().map_err(LoggingError::InvalidConfig)?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(formatter::build_formatter_from_config(
        config,
        io::stdout,
        config.with_ansi,
    ));

    let file_guard = match &config.file {
        Some(file) => {
            let (layer, guard) = file_layer(config, file)?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filters::build_filter_from_config(config))
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = %config.format,
        file = config.file.is_some(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}

fn file_layer(
    config: &LoggingConfig,
    file: &FileConfig,
) -> Result<(BoxedLayer, WorkerGuard), LoggingError> {
    fs::create_dir_all(&file.dir)?;
    let appender = rolling::daily(&file.dir, &file.filename);
    let (writer, guard) = non_blocking(appender);
    let layer = formatter::build_formatter_from_config(config, writer, false);
    Ok((layer, guard))
}
