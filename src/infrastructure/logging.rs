//! 日志系统配置模块
//! 支持结构化日志、日志级别配置和日志按天轮转

use std::path::Path;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

/// 初始化日志系统
///
/// 启用文件日志时返回 WorkerGuard，调用方须持有到进程退出，否则缓冲日志会丢失
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG 优先于配置
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let json = config.format == "json";

    if !config.enable_file_logging {
        // 仅控制台日志
        let registry = Registry::default().with(filter);
        if json {
            registry
                .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
                .try_init()?;
        } else {
            registry
                .with(fmt::layer().with_timer(ChronoUtc::rfc_3339()).with_ansi(true))
                .try_init()?;
        }
        return Ok(None);
    }

    // 文件日志 + 控制台日志
    let log_dir = log_dir(config);
    std::fs::create_dir_all(log_dir)?;
    let (writer, guard) = non_blocking(rolling::daily(log_dir, "walletdesk.log"));

    let registry = Registry::default().with(filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false),
            )
            .with(fmt::layer().with_timer(ChronoUtc::rfc_3339()).with_ansi(true))
            .try_init()?;
    }

    Ok(Some(guard))
}

fn log_dir(config: &LoggingConfig) -> &Path {
    config
        .log_file_path
        .as_deref()
        .map(Path::new)
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("./logs"))
}
