/// Объявление канала.
///
/// ```ignore
/// let decl = channel!(
///     "acc_data",
///     vec![0u8; 12],
///     observers = [foo_lis, bar_sub],
///     validator = |bytes| bytes.len() == 12,
/// );
/// ```
///
/// Наблюдатели передаются как `Arc<Observer>` и клонируются, поэтому один и
/// тот же наблюдатель можно указать в нескольких каналах.
#[macro_export]
macro_rules! channel {
    (
        $name:expr, $initial:expr
        $(, observers = [$($observer:expr),* $(,)?])?
        $(, validator = $validator:expr)?
        $(, user_data = $data:expr)?
        $(,)?
    ) => {{
        let decl = $crate::pubsub::ChannelDecl::new($name, $initial);
        $(let decl = decl.observers([$(::std::sync::Arc::clone(&$observer)),*]);)?
        $(let decl = decl.validator($validator);)?
        $(let decl = decl.user_data($data);)?
        decl
    }};
}

/// Слушатель: `listener!("foo_lis", |n| { ... })`.
#[macro_export]
macro_rules! listener {
    ($name:expr, $callback:expr $(, enabled = $enabled:expr)? $(,)?) => {{
        let observer = $crate::pubsub::Observer::listener($name, $callback);
        $(let observer = observer.with_enabled($enabled);)?
        ::std::sync::Arc::new(observer)
    }};
}

/// Подписчик: `subscriber!("bar_sub")` с очередью
/// [`DEFAULT_QUEUE_CAPACITY`](crate::pubsub::DEFAULT_QUEUE_CAPACITY) или
/// `subscriber!("bar_sub", 4)`.
#[macro_export]
macro_rules! subscriber {
    ($name:expr $(,)?) => {
        $crate::subscriber!($name, $crate::pubsub::DEFAULT_QUEUE_CAPACITY)
    };
    ($name:expr, $capacity:expr $(, enabled = $enabled:expr)? $(,)?) => {{
        let observer = $crate::pubsub::Observer::subscriber($name, $capacity);
        $(let observer = observer.with_enabled($enabled);)?
        ::std::sync::Arc::new(observer)
    }};
}
