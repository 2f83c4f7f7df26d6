use std::{path::PathBuf, sync::Arc, thread, time::Duration};

use anyhow::Context;
use chanbus::{
    channel, init_logging, listener, logging::LogFormat, pubsub::decode, subscriber, Registry,
    Settings, Timeout,
};
use clap::Parser;
use tracing::info;

use crate::messages::AccMsg;

mod messages {
    #![allow(unsafe_code)]

    use chanbus::bytemuck::{Pod, Zeroable};

    /// Отсчёт акселерометра.
    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
    pub struct AccMsg {
        pub x: i32,
        pub y: i32,
        pub z: i32,
    }
}

/// Демонстрация шины: канал акселерометра со слушателем и подписчиком и
/// простой целочисленный канал.
#[derive(Debug, Parser)]
#[command(name = "chanbus", version, about)]
struct Cli {
    /// Количество публикуемых отсчётов.
    #[arg(short, long, default_value_t = 2)]
    count: u32,

    /// Пауза между публикациями, мс.
    #[arg(short, long, default_value_t = 1000)]
    interval_ms: u64,

    /// Файл конфигурации (по умолчанию `chanbus.toml`, если есть).
    #[arg(long, env = "CHANBUS_CONFIG")]
    config: Option<PathBuf>,

    /// Формат логов поверх настроек.
    #[arg(long)]
    log_format: Option<LogFormat>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("failed to load settings")?;
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    let logging = init_logging(&settings.logging).context("failed to initialize logging")?;

    let foo_lis = listener!("foo_lis", |n| {
        if let Some(acc) = decode::<AccMsg>(n.message()) {
            info!(
                channel = n.channel().name(),
                "From listener -> Acc x={}, y={}, z={}", acc.x, acc.y, acc.z
            );
        } else if let Some(value) = decode::<i32>(n.message()) {
            info!(channel = n.channel().name(), "From listener -> value={}", value);
        }
    });
    let bar_sub = subscriber!("bar_sub", settings.default_queue_capacity);

    let mut registry = Registry::new();
    let acc_data = registry.add_channel(
        channel!(
            "acc_data_chan",
            chanbus::bytemuck::bytes_of(&AccMsg::default()),
            observers = [foo_lis, bar_sub],
        ),
    )?;
    let simple = registry.add_channel(channel!(
        "simple_chan",
        chanbus::bytemuck::bytes_of(&0i32),
        observers = [foo_lis],
    ))?;

    let bus = Arc::new(registry.start(settings.host()));
    let timeout = settings.default_timeout();

    let worker = {
        let bus = Arc::clone(&bus);
        let acc_data = Arc::clone(&acc_data);
        let bar_sub = Arc::clone(&bar_sub);
        let expected = cli.count;
        thread::Builder::new()
            .name("subscriber".to_string())
            .spawn(move || -> chanbus::BusResult<()> {
                info!("Subscriber task running");
                for _ in 0..expected {
                    let chan = bus.subscriber_wait(&bar_sub, Timeout::Forever)?;
                    if Arc::ptr_eq(&chan, &acc_data) {
                        let acc: AccMsg = bus.read_msg(&chan, Timeout::ticks(5))?;
                        info!("From subscriber -> Acc x={}, y={}, z={}", acc.x, acc.y, acc.z);
                    }
                }
                Ok(())
            })
            .context("failed to spawn subscriber thread")?
    };

    for i in 1..=cli.count {
        thread::sleep(Duration::from_millis(cli.interval_ms));
        let v = i32::try_from(i).unwrap_or(i32::MAX);
        bus.publish_msg(&acc_data, &AccMsg { x: v, y: v, z: v }, timeout)?;
        bus.publish_msg(&simple, &v, timeout)?;
    }

    worker
        .join()
        .map_err(|_| anyhow::anyhow!("subscriber thread panicked"))??;

    logging.shutdown();
    Ok(())
}
