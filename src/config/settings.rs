use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    host::StdHost,
    logging::LoggingConfig,
    pubsub::{Timeout, DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY},
};

/// Префикс переменных окружения (`CHANBUS_TICK_PERIOD_MS`,
/// `CHANBUS_LOGGING__LEVEL`).
pub const ENV_PREFIX: &str = "CHANBUS";

/// Имя необязательного файла конфигурации без расширения.
pub const CONFIG_FILE: &str = "chanbus";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Длительность тика хоста в миллисекундах.
    pub tick_period_ms: u64,
    pub default_timeout_ticks: u64,
    pub default_queue_capacity: usize,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_period_ms: 1,
            default_timeout_ticks: 10,
            default_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Значения по умолчанию, затем `chanbus.toml` (если есть), затем
    /// переменные окружения.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name(CONFIG_FILE).required(false))
    }

    /// То же, но файл конфигурации обязателен и берётся из `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(File::from(path).required(true))
    }

    fn build<F>(file: F) -> Result<Self, ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let settings: Self = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::Message("tick_period_ms must be positive".into()));
        }
        if self.default_queue_capacity == 0 {
            return Err(ConfigError::Message(
                "default_queue_capacity must be positive".into(),
            ));
        }
        if self.default_queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::Message(format!(
                "default_queue_capacity must not exceed {MAX_QUEUE_CAPACITY}"
            )));
        }
        self.logging.validate().map_err(ConfigError::Message)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn default_timeout(&self) -> Timeout {
        Timeout::ticks(self.default_timeout_ticks)
    }

    /// Хост с длительностью тика из настроек.
    pub fn host(&self) -> StdHost {
        StdHost::new(self.tick_period())
    }
}
