use std::{any::Any, fmt, sync::Arc};

use chanbus_error::{BusError, BusResult};
use once_cell::sync::OnceCell;

use super::Observer;
use crate::host::ChannelLock;

/// Предикат, который решает, принимать ли публикуемое сообщение.
/// Получает сырые байты; их длина равна размеру сообщения канала.
pub type Validator = dyn Fn(&[u8]) -> bool + Send + Sync;

/// Непрозрачные пользовательские данные канала.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Объявление канала: всё, что известно до запуска шины.
pub struct ChannelDecl {
    pub(crate) name: Arc<str>,
    pub(crate) initial: Box<[u8]>,
    pub(crate) validator: Option<Box<Validator>>,
    pub(crate) user_data: Option<UserData>,
    pub(crate) observers: Vec<Arc<Observer>>,
}

impl ChannelDecl {
    /// Канал с начальным сообщением `initial`. Длина `initial` задаёт размер
    /// сообщения канала.
    pub fn new(
        name: impl Into<Arc<str>>,
        initial: impl Into<Box<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            initial: initial.into(),
            validator: None,
            user_data: None,
            observers: Vec::new(),
        }
    }

    pub fn validator<F>(
        mut self,
        validator: F,
    ) -> Self
    where
        F: Fn(&[u8]) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn user_data<T>(
        mut self,
        data: T,
    ) -> Self
    where
        T: Any + Send + Sync,
    {
        self.user_data = Some(Arc::new(data));
        self
    }

    /// Добавляет наблюдателя в конец списка. Наблюдатели уведомляются в
    /// порядке объявления.
    pub fn observer(
        mut self,
        observer: Arc<Observer>,
    ) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn observers<I>(
        mut self,
        observers: I,
    ) -> Self
    where
        I: IntoIterator<Item = Arc<Observer>>,
    {
        self.observers.extend(observers);
        self
    }
}

/// Именованный канал: последнее сообщение, блокировка и список
/// наблюдателей.
pub struct Channel {
    name: Arc<str>,
    initial: Box<[u8]>,
    lock: OnceCell<ChannelLock>,
    validator: Option<Box<Validator>>,
    user_data: Option<UserData>,
    observers: Vec<Arc<Observer>>,
}

impl Channel {
    pub(crate) fn from_decl(decl: ChannelDecl) -> Self {
        Self {
            name: decl.name,
            initial: decl.initial,
            lock: OnceCell::new(),
            validator: decl.validator,
            user_data: decl.user_data,
            observers: decl.observers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Размер сообщения канала в байтах.
    pub fn message_size(&self) -> usize {
        self.initial.len()
    }

    /// Наблюдатели в порядке объявления.
    pub fn observers(&self) -> &[Arc<Observer>] {
        &self.observers
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    /// Пользовательские данные, приведённые к `T`.
    pub fn user_data_as<T: Any>(&self) -> Option<&T> {
        self.user_data.as_deref()?.downcast_ref::<T>()
    }

    /// Создана ли блокировка канала.
    pub fn is_initialized(&self) -> bool {
        self.lock.get().is_some()
    }

    /// Удерживает ли кто-нибудь блокировку канала (`Locked`).
    pub fn is_locked(&self) -> bool {
        self.lock.get().is_some_and(ChannelLock::is_locked)
    }

    pub(crate) fn accepts(
        &self,
        message: &[u8],
    ) -> bool {
        self.validator
            .as_ref()
            .map_or(true, |validator| validator(message))
    }

    pub(crate) fn lock(&self) -> BusResult<&ChannelLock> {
        self.lock.get().ok_or_else(|| BusError::NotInitialized {
            name: self.name_arc(),
        })
    }

    /// Создаёт блокировку и записывает в буфер начальное сообщение.
    /// Возвращает `true`, если блокировка создана этим вызовом.
    pub(crate) fn init_lock(&self) -> bool {
        let mut created = false;
        self.lock.get_or_init(|| {
            created = true;
            ChannelLock::new(&self.initial)
        });
        created
    }
}

impl fmt::Debug for Channel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let observers: Vec<&str> = self.observers.iter().map(|o| o.name()).collect();
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("message_size", &self.message_size())
            .field("validator", &self.has_validator())
            .field("user_data", &self.user_data.is_some())
            .field("observers", &observers)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
