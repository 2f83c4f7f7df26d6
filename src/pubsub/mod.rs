//! Шина сообщений с синхронными слушателями и асинхронными подписчиками.
//!
//! - `channel`: объявление и состояние канала (буфер, валидатор,
//!   пользовательские данные, список наблюдателей).
//! - `observer`: слушатели и подписчики, уведомление для слушателя.
//! - `registry`: реестр объявлений и двухфазный запуск.
//! - `bus`: операции над каналами (`publish`, `read`, `notify`, `claim`,
//!   `finish`, `subscriber_wait`).
//! - `message`: типизированный доступ к сообщениям через `bytemuck::Pod`.
//! - `timeout`: относительные таймауты и абсолютные сроки.

pub mod bus;
pub mod channel;
pub mod message;
pub mod observer;
pub mod registry;
pub mod timeout;

pub use bus::*;
pub use channel::*;
pub use message::decode;
pub use observer::*;
pub use registry::*;
pub use timeout::*;
