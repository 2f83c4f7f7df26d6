pub mod settings;

pub use settings::{Settings, CONFIG_FILE, ENV_PREFIX};
