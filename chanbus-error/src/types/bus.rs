use std::sync::Arc;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки операций шины.
///
/// Ошибки аргументов и контекста возвращаются до захвата блокировки.
/// `DeliveryTimeout` фиксируется для отдельного наблюдателя и не прерывает
/// публикацию.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("bus API called from interrupt context")]
    CalledFromInterrupt,

    #[error("message rejected by the validator of channel '{channel}'")]
    MessageRejected { channel: Arc<str> },

    #[error("lock of channel '{channel}' was not acquired before the deadline")]
    LockTimeout { channel: Arc<str> },

    #[error("observer '{observer}' was not notified by channel '{channel}' before the deadline")]
    DeliveryTimeout {
        observer: Arc<str>,
        channel: Arc<str>,
    },

    #[error("no notification reached observer '{observer}' before the deadline")]
    WaitTimeout { observer: Arc<str> },

    #[error("observer '{observer}' is a listener and has no queue")]
    NotASubscriber { observer: Arc<str> },

    #[error("'{name}' is used before startup materialized it")]
    NotInitialized { name: Arc<str> },
}

impl BusError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl ErrorExt for BusError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument { .. } => StatusCode::InvalidArgs,
            Self::CalledFromInterrupt => StatusCode::CalledFromInterrupt,
            Self::MessageRejected { .. } => StatusCode::MessageRejected,
            Self::LockTimeout { .. } => StatusCode::LockTimeout,
            Self::DeliveryTimeout { .. } => StatusCode::DeliveryTimeout,
            Self::WaitTimeout { .. } => StatusCode::WaitTimeout,
            Self::NotASubscriber { .. } => StatusCode::NotASubscriber,
            Self::NotInitialized { .. } => StatusCode::NotInitialized,
        }
    }
}
