use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use chanbus_error::{ensure, BusError, BusResult, ErrorExt, LogLevel};
use tracing::trace;

use super::{Channel, Deadline, Notification, Observer, ObserverKind, Registry, Timeout};
use crate::host::{ChannelLock, Host, LockGuard, StdHost};

/// Событие `tracing` на уровне, который статус-код ошибки назначает ей.
macro_rules! log_at {
    ($err:expr, $($arg:tt)+) => {
        match $err.log_level() {
            LogLevel::Trace => ::tracing::trace!($($arg)+),
            LogLevel::Debug => ::tracing::debug!($($arg)+),
            LogLevel::Info => ::tracing::info!($($arg)+),
            LogLevel::Warn => ::tracing::warn!($($arg)+),
            LogLevel::Error => ::tracing::error!($($arg)+),
        }
    };
}

/// Шина: замороженный реестр плюс хост, на примитивах которого она
/// работает.
///
/// Все точки входа отклоняют вызов из контекста прерывания и некорректные
/// аргументы до захвата какой-либо блокировки. Каждый шаг ожидания
/// ограничен таймаутом вызывающего кода.
pub struct Bus<H: Host = StdHost> {
    registry: Registry,
    host: H,
}

impl<H: Host> Bus<H> {
    /// Создаёт шину без запуска: до вызова `init_all_channels` и
    /// `init_all_observers` операции над каналами вернут `NotInitialized`.
    /// Обычно используется [`Registry::start`].
    pub fn new(
        registry: Registry,
        host: H,
    ) -> Self {
        Self { registry, host }
    }

    pub fn init_all_channels(&self) -> usize {
        self.registry.init_all_channels()
    }

    pub fn init_all_observers(&self) -> usize {
        self.registry.init_all_observers()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn channel(
        &self,
        name: &str,
    ) -> Option<&Arc<Channel>> {
        self.registry.find_channel(name)
    }

    pub fn observer(
        &self,
        name: &str,
    ) -> Option<&Arc<Observer>> {
        self.registry.find_observer(name)
    }

    /// Публикует сообщение: проверка валидатором, копирование в буфер канала
    /// и уведомление наблюдателей.
    ///
    /// Валидатор вызывается до захвата блокировки; отклонённое сообщение не
    /// оставляет побочных эффектов. Ошибка доставки отдельному подписчику не
    /// прерывает публикацию: буфер уже обновлён, остальные наблюдатели
    /// уведомляются, а вызывающему возвращается последняя из таких ошибок.
    pub fn publish(
        &self,
        channel: &Arc<Channel>,
        message: &[u8],
        timeout: Timeout,
    ) -> BusResult<()> {
        let deadline = Deadline::after(&self.host, timeout);

        self.check_context()?;
        check_size(channel, message.len())?;

        if !channel.accepts(message) {
            let err = BusError::MessageRejected {
                channel: channel.name_arc(),
            };
            log_at!(err, channel = channel.name(), "Message rejected by validator");
            return Err(err);
        }

        let mut guard = self.acquire(channel, channel.lock()?, timeout)?;
        guard.copy_from_slice(message);
        trace!(channel = channel.name(), "Message published");

        self.notify_observers(channel, &guard, deadline)
    }

    /// Копирует текущее сообщение канала в `out`.
    pub fn read(
        &self,
        channel: &Channel,
        out: &mut [u8],
        timeout: Timeout,
    ) -> BusResult<()> {
        self.check_context()?;
        check_size(channel, out.len())?;

        let guard = self.acquire(channel, channel.lock()?, timeout)?;
        out.copy_from_slice(&guard);
        trace!(channel = channel.name(), "Message read");
        Ok(())
    }

    /// Повторно уведомляет наблюдателей канала, не изменяя буфер.
    pub fn notify(
        &self,
        channel: &Arc<Channel>,
        timeout: Timeout,
    ) -> BusResult<()> {
        let deadline = Deadline::after(&self.host, timeout);

        self.check_context()?;

        let guard = self.acquire(channel, channel.lock()?, timeout)?;
        self.notify_observers(channel, &guard, deadline)
    }

    /// Захватывает канал для прямой работы с буфером.
    ///
    /// Блокировка освобождается при `Drop` возвращённой [`ChannelClaim`] или
    /// явно через [`Bus::finish`]. Повторный `claim` того же канала в том же
    /// потоке до освобождения приведёт к взаимоблокировке (или к
    /// `LockTimeout`, если таймаут конечен).
    pub fn claim<'a>(
        &'a self,
        channel: &'a Arc<Channel>,
        timeout: Timeout,
    ) -> BusResult<ChannelClaim<'a, H>> {
        self.check_context()?;

        let guard = self.acquire(channel, channel.lock()?, timeout)?;
        trace!(channel = channel.name(), "Channel claimed");
        Ok(ChannelClaim {
            bus: self,
            channel,
            guard,
        })
    }

    /// Освобождает канал, захваченный через [`Bus::claim`].
    pub fn finish(
        &self,
        claim: ChannelClaim<'_, H>,
    ) {
        claim.finish();
    }

    /// Ждёт следующего уведомления подписчика и возвращает канал, который
    /// его отправил.
    ///
    /// Для слушателя всегда возвращает `NotASubscriber`, каким бы ни был
    /// таймаут.
    pub fn subscriber_wait(
        &self,
        observer: &Observer,
        timeout: Timeout,
    ) -> BusResult<Arc<Channel>> {
        self.check_context()?;

        let queue = match observer.kind() {
            ObserverKind::Listener(_) => {
                return Err(BusError::NotASubscriber {
                    observer: observer.name_arc(),
                });
            }
            ObserverKind::Subscriber { .. } => {
                observer.queue().ok_or_else(|| BusError::NotInitialized {
                    name: observer.name_arc(),
                })?
            }
        };

        queue
            .pop(timeout.as_duration(self.host.tick_period()))
            .ok_or_else(|| BusError::WaitTimeout {
                observer: observer.name_arc(),
            })
    }

    fn check_context(&self) -> BusResult<()> {
        ensure!(!self.host.in_interrupt(), BusError::CalledFromInterrupt);
        Ok(())
    }

    fn acquire<'l>(
        &self,
        channel: &Channel,
        lock: &'l ChannelLock,
        timeout: Timeout,
    ) -> BusResult<LockGuard<'l>> {
        lock.acquire(timeout.as_duration(self.host.tick_period()))
            .ok_or_else(|| {
                let err = BusError::LockTimeout {
                    channel: channel.name_arc(),
                };
                log_at!(err, channel = channel.name(), ?timeout, "Channel lock timed out");
                err
            })
    }

    /// Последовательность уведомления. Вызывается при удерживаемой
    /// блокировке канала.
    ///
    /// Сначала синхронно вызываются все включённые слушатели, затем каждому
    /// включённому подписчику кладётся ссылка на канал с остатком бюджета от
    /// исходного срока. Неудачная доставка логируется и не прерывает цикл;
    /// возвращается последняя ошибка.
    fn notify_observers(
        &self,
        channel: &Arc<Channel>,
        message: &[u8],
        deadline: Deadline,
    ) -> BusResult<()> {
        let notification = Notification::new(channel, message);
        for observer in channel.observers().iter().filter(|o| o.is_enabled()) {
            if let ObserverKind::Listener(callback) = observer.kind() {
                callback(&notification);
            }
        }

        let mut last_error = None;
        for observer in channel.observers().iter().filter(|o| o.is_enabled()) {
            if observer.is_listener() {
                continue;
            }

            let delivered = match observer.queue() {
                Some(queue) => {
                    let wait = deadline
                        .remaining(&self.host)
                        .as_duration(self.host.tick_period());
                    queue
                        .push(Arc::clone(channel), wait)
                        .map_err(|_| BusError::DeliveryTimeout {
                            observer: observer.name_arc(),
                            channel: channel.name_arc(),
                        })
                }
                None => Err(BusError::NotInitialized {
                    name: observer.name_arc(),
                }),
            };

            if let Err(err) = delivered {
                log_at!(
                    err,
                    observer = observer.name(),
                    channel = channel.name(),
                    error = %err,
                    "Observer could not be notified"
                );
                last_error = Some(err);
            }
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<H: Host + fmt::Debug> fmt::Debug for Bus<H> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Bus")
            .field("registry", &self.registry)
            .field("host", &self.host)
            .finish()
    }
}

fn check_size(
    channel: &Channel,
    len: usize,
) -> BusResult<()> {
    ensure!(
        len == channel.message_size(),
        "buffer of {} bytes for channel '{}' with {}-byte messages",
        len,
        channel.name(),
        channel.message_size()
    );
    Ok(())
}

/// Захват канала: прямой доступ к буферу, пока блокировка удерживается.
///
/// Блокировка освобождается при `Drop`; [`ChannelClaim::finish`] делает то
/// же явно, [`ChannelClaim::notify`] перед освобождением уведомляет
/// наблюдателей.
pub struct ChannelClaim<'a, H: Host = StdHost> {
    bus: &'a Bus<H>,
    channel: &'a Arc<Channel>,
    guard: LockGuard<'a>,
}

impl<'a, H: Host> ChannelClaim<'a, H> {
    pub fn channel(&self) -> &'a Arc<Channel> {
        self.channel
    }

    /// Перезаписывает буфер целиком.
    pub fn write(
        &mut self,
        message: &[u8],
    ) -> BusResult<()> {
        check_size(self.channel, message.len())?;
        self.guard.copy_from_slice(message);
        Ok(())
    }

    /// Освобождает канал.
    pub fn finish(self) {
        trace!(channel = self.channel.name(), "Channel finished");
    }

    /// Уведомляет наблюдателей о текущем содержимом буфера и освобождает
    /// канал. Блокировка повторно не захватывается.
    pub fn notify(
        self,
        timeout: Timeout,
    ) -> BusResult<()> {
        let deadline = Deadline::after(&self.bus.host, timeout);

        self.bus.check_context()?;
        self.bus
            .notify_observers(self.channel, &self.guard, deadline)
    }
}

impl<H: Host> Deref for ChannelClaim<'_, H> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard
    }
}

impl<H: Host> DerefMut for ChannelClaim<'_, H> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.guard
    }
}

impl<H: Host> fmt::Debug for ChannelClaim<'_, H> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ChannelClaim")
            .field("channel", &self.channel.name())
            .field("message", &&self.guard[..])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Mutex,
        },
        time::Duration,
    };

    use super::*;
    use crate::pubsub::ChannelDecl;

    /// Хост, которому можно сообщить, что код выполняется в прерывании.
    #[derive(Debug, Default)]
    struct IsrHost {
        inner: StdHost,
        in_isr: AtomicBool,
    }

    impl Host for IsrHost {
        fn now(&self) -> crate::host::Tick {
            self.inner.now()
        }

        fn tick_period(&self) -> Duration {
            self.inner.tick_period()
        }

        fn in_interrupt(&self) -> bool {
            self.in_isr.load(Ordering::SeqCst)
        }
    }

    fn simple_bus() -> (Bus<IsrHost>, Arc<Channel>, Arc<Observer>) {
        let mut registry = Registry::new();
        let sub = registry
            .add_observer(Observer::subscriber("bar_sub", 2))
            .unwrap();
        let chan = registry
            .add_channel(ChannelDecl::new("simple", vec![0u8; 4]).observer(Arc::clone(&sub)))
            .unwrap();
        (registry.start(IsrHost::default()), chan, sub)
    }

    /// Тест проверяет, что опубликованное сообщение читается обратно, а
    /// подписчик получает канал.
    #[test]
    fn test_publish_then_read() {
        let (bus, chan, sub) = simple_bus();
        bus.publish(&chan, &[1, 2, 3, 4], Timeout::ticks(10)).unwrap();

        let mut out = [0u8; 4];
        bus.read(&chan, &mut out, Timeout::NoWait).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);

        let from = bus.subscriber_wait(&sub, Timeout::NoWait).unwrap();
        assert!(Arc::ptr_eq(&from, &chan));
    }

    /// Тест проверяет, что буфер неверного размера отклоняется до захвата
    /// блокировки.
    #[test]
    fn test_size_mismatch_is_invalid_argument() {
        let (bus, chan, sub) = simple_bus();
        let res = bus.publish(&chan, &[1, 2, 3], Timeout::NoWait);
        assert!(matches!(res, Err(BusError::InvalidArgument { .. })));

        let mut out = [0u8; 8];
        let res = bus.read(&chan, &mut out, Timeout::NoWait);
        assert!(matches!(res, Err(BusError::InvalidArgument { .. })));
        assert_eq!(sub.pending(), 0);
    }

    /// Тест проверяет, что в контексте прерывания отклоняется каждая
    /// операция.
    #[test]
    fn test_interrupt_context_is_rejected() {
        let (bus, chan, sub) = simple_bus();
        bus.host().in_isr.store(true, Ordering::SeqCst);

        let mut out = [0u8; 4];
        assert_eq!(
            bus.publish(&chan, &[1; 4], Timeout::NoWait),
            Err(BusError::CalledFromInterrupt)
        );
        assert_eq!(
            bus.read(&chan, &mut out, Timeout::NoWait),
            Err(BusError::CalledFromInterrupt)
        );
        assert_eq!(
            bus.notify(&chan, Timeout::NoWait),
            Err(BusError::CalledFromInterrupt)
        );
        assert!(matches!(
            bus.claim(&chan, Timeout::NoWait),
            Err(BusError::CalledFromInterrupt)
        ));
        assert!(matches!(
            bus.subscriber_wait(&sub, Timeout::NoWait),
            Err(BusError::CalledFromInterrupt)
        ));

        bus.host().in_isr.store(false, Ordering::SeqCst);
        bus.read(&chan, &mut out, Timeout::NoWait).unwrap();
        assert_eq!(out, [0; 4]);
    }

    /// Тест проверяет, что удерживаемая блокировка даёт `LockTimeout`.
    #[test]
    fn test_lock_timeout_while_claimed() {
        let (bus, chan, _sub) = simple_bus();
        let claim = bus.claim(&chan, Timeout::NoWait).unwrap();
        assert!(chan.is_locked());

        let mut out = [0u8; 4];
        assert!(matches!(
            bus.read(&chan, &mut out, Timeout::ticks(2)),
            Err(BusError::LockTimeout { .. })
        ));
        bus.finish(claim);
        assert!(!chan.is_locked());
    }

    /// Тест проверяет запись через захват и уведомление без повторного
    /// захвата блокировки.
    #[test]
    fn test_claim_write_and_notify() {
        let (bus, chan, sub) = simple_bus();
        let mut claim = bus.claim(&chan, Timeout::NoWait).unwrap();
        claim.write(&[9, 9, 9, 9]).unwrap();
        claim[0] = 1;
        assert!(claim.write(&[0; 2]).is_err());
        assert_eq!(claim.channel().name(), "simple");
        claim.notify(Timeout::NoWait).unwrap();

        assert_eq!(sub.pending(), 1);
        let mut out = [0u8; 4];
        bus.read(&chan, &mut out, Timeout::NoWait).unwrap();
        assert_eq!(out, [1, 9, 9, 9]);
    }

    /// Тест проверяет порядок: слушатели раньше подписчиков, выключенные
    /// наблюдатели пропускаются.
    #[test]
    fn test_listeners_run_before_subscribers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        let sub = registry
            .add_observer(Observer::subscriber("sub", 4))
            .unwrap();
        let order_lis = {
            let seen = Arc::clone(&seen);
            let sub = Arc::clone(&sub);
            registry
                .add_observer(Observer::listener("order_lis", move |n| {
                    // Подписчик ещё не получил уведомление.
                    seen.lock()
                        .unwrap()
                        .push((n.message().to_vec(), sub.pending()));
                }))
                .unwrap()
        };
        let muted = registry
            .add_observer(Observer::listener("muted", |_| panic!("muted listener called")))
            .unwrap();
        muted.set_enabled(false);

        let chan = registry
            .add_channel(
                ChannelDecl::new("c", vec![0u8; 2])
                    .observer(Arc::clone(&sub))
                    .observer(order_lis)
                    .observer(muted),
            )
            .unwrap();
        let bus = registry.start(StdHost::default());

        bus.publish(&chan, &[7, 8], Timeout::NoWait).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(vec![7, 8], 0)]);
        assert_eq!(sub.pending(), 1);
    }

    /// Тест проверяет, что `subscriber_wait` для слушателя всегда
    /// возвращает `NotASubscriber`.
    #[test]
    fn test_wait_on_listener() {
        let mut registry = Registry::new();
        let lis = registry
            .add_observer(Observer::listener("lis", |_| {}))
            .unwrap();
        let bus = registry.start(StdHost::default());
        for timeout in [Timeout::NoWait, Timeout::ticks(5), Timeout::Forever] {
            assert!(matches!(
                bus.subscriber_wait(&lis, timeout),
                Err(BusError::NotASubscriber { .. })
            ));
        }
    }

    /// Тест проверяет, что незапущенная шина сообщает `NotInitialized`.
    #[test]
    fn test_not_started_bus() {
        let mut registry = Registry::new();
        let sub = registry
            .add_observer(Observer::subscriber("sub", 1))
            .unwrap();
        let chan = registry
            .add_channel(ChannelDecl::new("c", vec![0u8; 1]))
            .unwrap();
        let bus = Bus::new(registry, StdHost::default());

        assert!(matches!(
            bus.publish(&chan, &[1], Timeout::NoWait),
            Err(BusError::NotInitialized { .. })
        ));
        assert!(matches!(
            bus.subscriber_wait(&sub, Timeout::NoWait),
            Err(BusError::NotInitialized { .. })
        ));

        assert_eq!(bus.init_all_channels(), 1);
        assert_eq!(bus.init_all_observers(), 1);
        bus.publish(&chan, &[1], Timeout::NoWait).unwrap();
    }

    /// Тест проверяет поиск каналов и наблюдателей по имени.
    #[test]
    fn test_lookup_by_name() {
        let (bus, chan, sub) = simple_bus();
        assert!(Arc::ptr_eq(bus.channel("simple").unwrap(), &chan));
        assert!(Arc::ptr_eq(bus.observer("bar_sub").unwrap(), &sub));
        assert!(bus.channel("missing").is_none());
    }

    /// Буфер, в который пишет подписчик `tracing` в тестах.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Тест проверяет, что уровень события об ошибке берётся из её
    /// статус-кода: отказ валидатора идёт в `DEBUG`, потерянная доставка в
    /// `WARN`.
    #[test]
    fn test_failure_events_use_status_level() {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer({
                let buffer = buffer.clone();
                move || buffer.clone()
            })
            .finish();

        let mut registry = Registry::new();
        let sub = registry
            .add_observer(Observer::subscriber("full_sub", 1))
            .unwrap();
        let chan = registry
            .add_channel(
                ChannelDecl::new("c", vec![0u8; 1])
                    .validator(|m| m[0] != 0xFF)
                    .observer(Arc::clone(&sub)),
            )
            .unwrap();
        let bus = registry.start(StdHost::default());

        tracing::subscriber::with_default(subscriber, || {
            bus.publish(&chan, &[1], Timeout::NoWait).unwrap();
            assert!(bus.publish(&chan, &[2], Timeout::NoWait).is_err());
            assert!(bus.publish(&chan, &[0xFF], Timeout::NoWait).is_err());
        });

        let out = String::from_utf8_lossy(&buffer.0.lock().unwrap()).to_string();
        let line_with = |needle: &str| {
            out.lines()
                .find(|l| l.contains(needle))
                .map(str::to_string)
                .unwrap_or_default()
        };
        assert!(line_with("Observer could not be notified").contains("WARN"));
        assert!(line_with("Message rejected by validator").contains("DEBUG"));
    }
}
