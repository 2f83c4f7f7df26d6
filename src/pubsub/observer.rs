use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use once_cell::sync::OnceCell;

use super::Channel;
use crate::host::BoundedQueue;

/// Ёмкость очереди подписчика, если она не указана явно.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Наибольшая допустимая ёмкость очереди подписчика.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 16;

/// Обратный вызов слушателя.
///
/// Выполняется в потоке публикующего кода, пока блокировка канала
/// удерживается: он должен быть быстрым, не блокироваться и не обращаться к
/// тому же каналу.
pub type ListenerFn = dyn Fn(&Notification<'_>) + Send + Sync;

/// Очередь уведомлений подписчика: в неё кладутся ссылки на каналы.
pub type NotificationQueue = BoundedQueue<Arc<Channel>>;

/// Способ доставки уведомлений наблюдателю.
pub enum ObserverKind {
    /// Синхронный обратный вызов.
    Listener(Box<ListenerFn>),
    /// Асинхронный подписчик с ограниченной очередью. Очередь создаётся при
    /// запуске шины.
    Subscriber {
        capacity: usize,
        queue: OnceCell<NotificationQueue>,
    },
}

/// Наблюдатель, привязанный к одному или нескольким каналам.
pub struct Observer {
    name: Arc<str>,
    enabled: AtomicBool,
    kind: ObserverKind,
}

impl Observer {
    /// Слушатель с синхронным обратным вызовом.
    pub fn listener<F>(
        name: impl Into<Arc<str>>,
        callback: F,
    ) -> Self
    where
        F: Fn(&Notification<'_>) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            enabled: AtomicBool::new(true),
            kind: ObserverKind::Listener(Box::new(callback)),
        }
    }

    /// Подписчик с очередью на `capacity` уведомлений.
    pub fn subscriber(
        name: impl Into<Arc<str>>,
        capacity: usize,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: AtomicBool::new(true),
            kind: ObserverKind::Subscriber {
                capacity,
                queue: OnceCell::new(),
            },
        }
    }

    /// Задаёт начальное состояние флага `enabled`.
    pub fn with_enabled(
        mut self,
        enabled: bool,
    ) -> Self {
        *self.enabled.get_mut() = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn kind(&self) -> &ObserverKind {
        &self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Включает или выключает наблюдателя. Выключенный наблюдатель
    /// пропускается при уведомлении.
    pub fn set_enabled(
        &self,
        enabled: bool,
    ) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_listener(&self) -> bool {
        matches!(self.kind, ObserverKind::Listener(_))
    }

    pub fn is_subscriber(&self) -> bool {
        matches!(self.kind, ObserverKind::Subscriber { .. })
    }

    /// Объявленная ёмкость очереди (только для подписчика).
    pub fn capacity(&self) -> Option<usize> {
        match self.kind {
            ObserverKind::Subscriber { capacity, .. } => Some(capacity),
            ObserverKind::Listener(_) => None,
        }
    }

    /// Количество уведомлений, ожидающих в очереди подписчика.
    pub fn pending(&self) -> usize {
        self.queue().map_or(0, BoundedQueue::len)
    }

    /// Создана ли очередь подписчика. Для слушателя всегда `true`.
    pub fn is_initialized(&self) -> bool {
        match &self.kind {
            ObserverKind::Listener(_) => true,
            ObserverKind::Subscriber { queue, .. } => queue.get().is_some(),
        }
    }

    pub(crate) fn queue(&self) -> Option<&NotificationQueue> {
        match &self.kind {
            ObserverKind::Subscriber { queue, .. } => queue.get(),
            ObserverKind::Listener(_) => None,
        }
    }

    /// Создаёт очередь подписчика. Возвращает `true`, если очередь создана
    /// этим вызовом.
    pub(crate) fn init_queue(&self) -> bool {
        match &self.kind {
            ObserverKind::Subscriber { capacity, queue } => {
                let mut created = false;
                queue.get_or_init(|| {
                    created = true;
                    BoundedQueue::new(*capacity)
                });
                created
            }
            ObserverKind::Listener(_) => false,
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let kind = match self.kind {
            ObserverKind::Listener(_) => "listener",
            ObserverKind::Subscriber { .. } => "subscriber",
        };
        f.debug_struct("Observer")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("enabled", &self.is_enabled())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// То, что получает слушатель: канал и только что записанное сообщение.
///
/// Блокировка канала удерживается, пока живёт уведомление, поэтому
/// сообщение читается напрямую, без копирования и без повторного захвата.
pub struct Notification<'a> {
    channel: &'a Arc<Channel>,
    message: &'a [u8],
}

impl<'a> Notification<'a> {
    pub(crate) fn new(
        channel: &'a Arc<Channel>,
        message: &'a [u8],
    ) -> Self {
        Self { channel, message }
    }

    pub fn channel(&self) -> &'a Arc<Channel> {
        self.channel
    }

    /// Текущее содержимое буфера канала.
    pub fn message(&self) -> &'a [u8] {
        self.message
    }
}
