//! In-process message bus with fixed-size channels, synchronous listeners and
//! queued subscribers.
//!
//! Channels and observers are declared into a [`Registry`], which is started
//! once into a [`Bus`]. Every bus operation is bounded by a caller-supplied
//! [`Timeout`] measured in host ticks.

/// Bus settings loading.
pub mod config;
/// Host primitives: tick clock, channel lock, bounded queue.
pub mod host;
/// Logging setup (formatting, filters, file sink).
pub mod logging;
/// Declaration macros: `channel!`, `listener!`, `subscriber!`.
#[macro_use]
pub mod macros;
/// Channels, observers, registry and bus operations.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Re-exported for the `Pod` bound of the typed message helpers.
pub use bytemuck;
/// Error types and status codes.
pub use chanbus_error::{BusError, BusResult, ErrorExt, StatusCode};
/// Settings.
pub use config::Settings;
/// Host abstraction.
pub use host::{Host, StdHost, Tick};
/// Logging entry point.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Bus API.
pub use pubsub::{
    Bus, Channel, ChannelClaim, ChannelDecl, Deadline, Notification, Observer, ObserverKind,
    Registry, Timeout, DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY,
};
