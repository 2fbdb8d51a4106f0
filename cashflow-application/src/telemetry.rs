//! 日志初始化
//!
use crate::{config::LogConfig, error::AppError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 安装全局 tracing 订阅者。
///
/// `RUST_LOG` 优先于配置中的级别；重复调用返回 `Telemetry` 错误而不会 panic。
pub fn init(config: &LogConfig) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| AppError::Telemetry(format!("invalid log level {:?}: {e}", config.level)))?,
    };

    let res = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
    };

    res.map_err(|e| AppError::Telemetry(e.to_string()))
}
