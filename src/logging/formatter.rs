use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::Layer as LayerTrait,
    registry::LookupSpan,
};

use crate::logging::config::{LogFormat, LoggingConfig};

/// Слой `fmt` в формате из конфигурации поверх произвольного writer.
///
/// Возвращается boxed trait-объект, чтобы стереть конкретный тип формата
/// (json/pretty/compact).
pub fn build_formatter_from_config<S, W>(
    config: &LoggingConfig,
    writer: W,
    with_ansi: bool,
) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(with_ansi)
        .with_target(config.with_target)
        .with_thread_names(config.with_thread_ids)
        .with_thread_ids(config.with_thread_ids);

    match config.format {
        LogFormat::Json => Box::new(layer.json().with_current_span(true)),
        LogFormat::Pretty => Box::new(layer.pretty().with_span_events(FmtSpan::CLOSE)),
        LogFormat::Compact => Box::new(layer.compact()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;

    /// Тест проверяет, что слой строится и принимает события в каждом
    /// формате.
    #[rstest]
    #[case(LogFormat::Compact)]
    #[case(LogFormat::Pretty)]
    #[case(LogFormat::Json)]
    fn test_formatter_for_each_format(#[case] format: LogFormat) {
        let cfg = LoggingConfig {
            format,
            ..Default::default()
        };
        let layer = build_formatter_from_config::<Registry, _>(&cfg, std::io::sink, false);
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(channel = "acc_data", "formatter smoke test");
        });
    }
}
