//! Типизированный доступ к сообщениям каналов.
//!
//! Шина хранит сообщения как байты фиксированного размера. Любой тип
//! `T: Pod` с `size_of::<T>()`, равным размеру сообщения канала, можно
//! публиковать и читать напрямую, без ручной сериализации.

use std::mem::size_of;

use bytemuck::Pod;
use chanbus_error::{ensure, BusResult};

use super::{Bus, Channel, ChannelClaim, ChannelDecl, Notification, Timeout};
use crate::host::Host;

/// Читает `T` из байтов сообщения. `None`, если размер не совпадает.
pub fn decode<T: Pod>(bytes: &[u8]) -> Option<T> {
    bytemuck::try_pod_read_unaligned(bytes).ok()
}

impl ChannelDecl {
    /// Канал, сообщение которого имеет тип `T`; `initial` становится
    /// начальным значением буфера.
    pub fn typed<T: Pod>(
        name: impl Into<std::sync::Arc<str>>,
        initial: &T,
    ) -> Self {
        Self::new(name, bytemuck::bytes_of(initial))
    }

    /// Валидатор, работающий с уже декодированным сообщением.
    pub fn validate_with<T, F>(
        self,
        validator: F,
    ) -> Self
    where
        T: Pod,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.validator(move |bytes| decode::<T>(bytes).is_some_and(|msg| validator(&msg)))
    }
}

impl Channel {
    /// Совпадает ли размер `T` с размером сообщения канала.
    pub fn fits<T: Pod>(&self) -> bool {
        size_of::<T>() == self.message_size()
    }
}

impl<H: Host> Bus<H> {
    pub fn publish_msg<T: Pod>(
        &self,
        channel: &std::sync::Arc<Channel>,
        message: &T,
        timeout: Timeout,
    ) -> BusResult<()> {
        self.publish(channel, bytemuck::bytes_of(message), timeout)
    }

    pub fn read_msg<T: Pod>(
        &self,
        channel: &Channel,
        timeout: Timeout,
    ) -> BusResult<T> {
        let mut out = T::zeroed();
        self.read(channel, bytemuck::bytes_of_mut(&mut out), timeout)?;
        Ok(out)
    }
}

impl<H: Host> ChannelClaim<'_, H> {
    /// Текущее содержимое буфера как `T`.
    pub fn message<T: Pod>(&self) -> BusResult<T> {
        ensure!(
            self.channel().fits::<T>(),
            "type of {} bytes for channel '{}' with {}-byte messages",
            size_of::<T>(),
            self.channel().name(),
            self.channel().message_size()
        );
        Ok(bytemuck::pod_read_unaligned(self))
    }

    pub fn set_message<T: Pod>(
        &mut self,
        message: &T,
    ) -> BusResult<()> {
        self.write(bytemuck::bytes_of(message))
    }
}

impl Notification<'_> {
    /// Сообщение как `T`; `None`, если размер не совпадает.
    pub fn message_as<T: Pod>(&self) -> Option<T> {
        decode(self.message())
    }
}
