use std::{ops::ControlFlow, sync::Arc};

use chanbus_error::{ensure, BusResult};
use tracing::debug;

use super::{Bus, Channel, ChannelDecl, Observer, MAX_QUEUE_CAPACITY};
use crate::host::Host;

/// Реестр объявленных каналов и наблюдателей.
///
/// Объявления только добавляются; обходятся в порядке добавления.
/// Реестр обходится один раз при запуске (сначала каналы, затем
/// наблюдатели) и после этого замораживается внутри [`Bus`].
#[derive(Debug, Default)]
pub struct Registry {
    channels: Vec<Arc<Channel>>,
    observers: Vec<Arc<Observer>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует наблюдателя. Имя должно быть уникальным, а ёмкость
    /// очереди подписчика должна лежать в `1..=MAX_QUEUE_CAPACITY`.
    pub fn add_observer(
        &mut self,
        observer: Observer,
    ) -> BusResult<Arc<Observer>> {
        let observer = Arc::new(observer);
        self.register_observer(&observer)?;
        Ok(observer)
    }

    /// Регистрирует канал. Наблюдатели из объявления, которых ещё нет в
    /// реестре, регистрируются вместе с ним.
    pub fn add_channel(
        &mut self,
        decl: ChannelDecl,
    ) -> BusResult<Arc<Channel>> {
        ensure!(
            !decl.initial.is_empty(),
            "channel '{}' declares an empty message",
            decl.name
        );
        ensure!(
            self.find_channel(&decl.name).is_none(),
            "channel '{}' is already declared",
            decl.name
        );

        // Сначала проверяем всех новых наблюдателей, чтобы неудачное
        // объявление не оставило в реестре частичных изменений.
        let mut fresh: Vec<&Arc<Observer>> = Vec::new();
        for observer in &decl.observers {
            let known = self.observers.iter().any(|o| Arc::ptr_eq(o, observer))
                || fresh.iter().any(|o| Arc::ptr_eq(o, observer));
            if !known {
                self.check_observer(observer)?;
                ensure!(
                    !fresh.iter().any(|o| o.name() == observer.name()),
                    "observer '{}' is declared twice",
                    observer.name()
                );
                fresh.push(observer);
            }
        }
        self.observers.extend(fresh.into_iter().cloned());

        let channel = Arc::new(Channel::from_decl(decl));
        self.channels.push(Arc::clone(&channel));
        Ok(channel)
    }

    fn register_observer(
        &mut self,
        observer: &Arc<Observer>,
    ) -> BusResult<()> {
        self.check_observer(observer)?;
        self.observers.push(Arc::clone(observer));
        Ok(())
    }

    fn check_observer(
        &self,
        observer: &Observer,
    ) -> BusResult<()> {
        ensure!(
            self.find_observer(observer.name()).is_none(),
            "observer '{}' is already declared",
            observer.name()
        );
        if let Some(capacity) = observer.capacity() {
            ensure!(
                capacity > 0,
                "subscriber '{}' declares a zero-capacity queue",
                observer.name()
            );
            ensure!(
                capacity <= MAX_QUEUE_CAPACITY,
                "subscriber '{}' queue capacity {} exceeds {}",
                observer.name(),
                capacity,
                MAX_QUEUE_CAPACITY
            );
        }
        Ok(())
    }

    pub fn channels(&self) -> &[Arc<Channel>] {
        &self.channels
    }

    pub fn observers(&self) -> &[Arc<Observer>] {
        &self.observers
    }

    pub fn find_channel(
        &self,
        name: &str,
    ) -> Option<&Arc<Channel>> {
        self.channels.iter().find(|c| c.name() == name)
    }

    pub fn find_observer(
        &self,
        name: &str,
    ) -> Option<&Arc<Observer>> {
        self.observers.iter().find(|o| o.name() == name)
    }

    /// Обходит каналы в порядке объявления. `visit` может прервать обход,
    /// вернув `ControlFlow::Break`. Возвращает `true`, если обойдены все
    /// каналы.
    pub fn for_each_channel<F>(
        &self,
        mut visit: F,
    ) -> bool
    where
        F: FnMut(&Arc<Channel>) -> ControlFlow<()>,
    {
        self.channels.iter().all(|c| visit(c).is_continue())
    }

    /// То же для наблюдателей.
    pub fn for_each_observer<F>(
        &self,
        mut visit: F,
    ) -> bool
    where
        F: FnMut(&Arc<Observer>) -> ControlFlow<()>,
    {
        self.observers.iter().all(|o| visit(o).is_continue())
    }

    /// Первая фаза запуска: создаёт блокировку каждого канала и записывает
    /// начальное сообщение. Возвращает количество созданных блокировок.
    pub fn init_all_channels(&self) -> usize {
        let mut created = 0;
        self.for_each_channel(|channel| {
            if channel.init_lock() {
                debug!(
                    channel = channel.name(),
                    message_size = channel.message_size(),
                    "Channel initialized"
                );
                created += 1;
            }
            ControlFlow::Continue(())
        });
        created
    }

    /// Вторая фаза запуска: создаёт очередь каждого подписчика. Слушателям
    /// примитив доставки не нужен. Возвращает количество созданных очередей.
    pub fn init_all_observers(&self) -> usize {
        let mut created = 0;
        self.for_each_observer(|observer| {
            if observer.init_queue() {
                debug!(
                    observer = observer.name(),
                    capacity = observer.capacity(),
                    "Subscriber queue initialized"
                );
                created += 1;
            }
            ControlFlow::Continue(())
        });
        created
    }

    /// Выполняет обе фазы запуска и возвращает готовую шину.
    pub fn start<H: Host>(
        self,
        host: H,
    ) -> Bus<H> {
        let bus = Bus::new(self, host);
        bus.init_all_channels();
        bus.init_all_observers();
        bus
    }
}

#[cfg(test)]
mod tests {
    use chanbus_error::BusError;

    use super::*;

    fn sample() -> Registry {
        let mut registry = Registry::new();
        let lis = registry
            .add_observer(Observer::listener("foo_lis", |_| {}))
            .unwrap();
        let sub = registry
            .add_observer(Observer::subscriber("bar_sub", 16))
            .unwrap();
        registry
            .add_channel(
                ChannelDecl::new("acc_data", vec![0u8; 12])
                    .observer(Arc::clone(&lis))
                    .observer(sub),
            )
            .unwrap();
        registry
            .add_channel(ChannelDecl::new("simple", vec![0u8; 4]).observer(lis))
            .unwrap();
        registry
    }

    /// Тест проверяет порядок обхода и его повторяемость.
    #[test]
    fn test_traversal_order_is_stable() {
        let registry = sample();
        for _ in 0..2 {
            let mut names = Vec::new();
            assert!(registry.for_each_channel(|c| {
                names.push(c.name().to_string());
                ControlFlow::Continue(())
            }));
            assert_eq!(names, vec!["acc_data", "simple"]);
        }

        let mut names = Vec::new();
        assert!(registry.for_each_observer(|o| {
            names.push(o.name().to_string());
            ControlFlow::Continue(())
        }));
        assert_eq!(names, vec!["foo_lis", "bar_sub"]);
    }

    /// Тест проверяет досрочное завершение обхода.
    #[test]
    fn test_traversal_early_termination() {
        let registry = sample();
        let mut visited = 0;
        let completed = registry.for_each_channel(|_| {
            visited += 1;
            ControlFlow::Break(())
        });
        assert!(!completed);
        assert_eq!(visited, 1);

        let mut names = Vec::new();
        let completed = registry.for_each_observer(|o| {
            names.push(o.name().to_string());
            if o.name() == "foo_lis" {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(!completed);
        assert_eq!(names, vec!["foo_lis"]);
    }

    /// Тест проверяет, что наибольшая допустимая ёмкость принимается и
    /// запуск проходит без паники.
    #[test]
    fn test_max_capacity_starts() {
        let mut registry = Registry::new();
        let sub = registry
            .add_observer(Observer::subscriber("wide", MAX_QUEUE_CAPACITY))
            .unwrap();
        let bus = registry.start(crate::host::StdHost::default());
        assert_eq!(bus.registry().observers().len(), 1);
        assert_eq!(sub.capacity(), Some(MAX_QUEUE_CAPACITY));
        assert!(sub.is_initialized());
    }

    /// Тест проверяет, что обе фазы запуска выполняются ровно один раз.
    #[test]
    fn test_two_phase_startup() {
        let registry = sample();
        assert_eq!(registry.init_all_channels(), 2);
        assert_eq!(registry.init_all_observers(), 1);
        assert_eq!(registry.init_all_channels(), 0);
        assert_eq!(registry.init_all_observers(), 0);
        assert!(registry.channels().iter().all(|c| c.is_initialized()));
        assert!(registry.observers().iter().all(|o| o.is_initialized()));
    }

    /// Тест проверяет, что наблюдатели из объявления канала регистрируются
    /// автоматически, но только один раз.
    #[test]
    fn test_channel_registers_unknown_observers() {
        let mut registry = Registry::new();
        let shared = Arc::new(Observer::subscriber("shared", 2));
        registry
            .add_channel(ChannelDecl::new("a", vec![0u8]).observer(Arc::clone(&shared)))
            .unwrap();
        registry
            .add_channel(ChannelDecl::new("b", vec![0u8]).observer(shared))
            .unwrap();
        assert_eq!(registry.observers().len(), 1);
        assert!(registry.find_observer("shared").is_some());
    }

    /// Тест проверяет отказ при повторяющихся именах и некорректных
    /// объявлениях.
    #[test]
    fn test_rejects_invalid_declarations() {
        let mut registry = sample();

        let dup_chan = registry.add_channel(ChannelDecl::new("simple", vec![0u8; 4]));
        assert!(matches!(dup_chan, Err(BusError::InvalidArgument { .. })));

        let dup_obs = registry.add_observer(Observer::subscriber("bar_sub", 1));
        assert!(matches!(dup_obs, Err(BusError::InvalidArgument { .. })));

        let empty = registry.add_channel(ChannelDecl::new("empty", Vec::new()));
        assert!(matches!(empty, Err(BusError::InvalidArgument { .. })));

        let zero = registry.add_observer(Observer::subscriber("zero", 0));
        assert!(matches!(zero, Err(BusError::InvalidArgument { .. })));

        let huge = registry.add_observer(Observer::subscriber("huge", usize::MAX));
        assert!(matches!(huge, Err(BusError::InvalidArgument { .. })));
        let huge = Arc::new(Observer::subscriber("huge", MAX_QUEUE_CAPACITY + 1));
        let res = registry.add_channel(ChannelDecl::new("d", vec![0u8]).observer(huge));
        assert!(matches!(res, Err(BusError::InvalidArgument { .. })));
        assert!(registry.find_observer("huge").is_none());

        // Другой объект с уже занятым именем через объявление канала.
        let impostor = Arc::new(Observer::listener("foo_lis", |_| {}));
        let res = registry.add_channel(ChannelDecl::new("c", vec![0u8]).observer(impostor));
        assert!(matches!(res, Err(BusError::InvalidArgument { .. })));
        assert!(registry.find_channel("c").is_none());
    }
}
