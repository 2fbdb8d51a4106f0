//! 账本配置
//!
//! 从以 `CASHFLOW_` 为前缀的环境变量加载，层级以 `__` 分隔，例如：
//! - `CASHFLOW_STORAGE__KIND=sqlite`
//! - `CASHFLOW_STORAGE__URL=sqlite://cashflow.db?mode=rwc`
//! - `CASHFLOW_LOG__LEVEL=debug`、`CASHFLOW_LOG__JSON=true`
//! - `CASHFLOW_PUBLISHER__FEED_CAPACITY=1024`
//! - `CASHFLOW_OPERATION_TIMEOUT_MS=5000`
//!
//! 未设置任何变量时得到一个纯内存账本。
//!
use crate::error::AppError;
use cashflow_domain::eventing::DEFAULT_FEED_CAPACITY;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const ENV_PREFIX: &str = "CASHFLOW";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub log: LogConfig,
    pub publisher: PublisherConfig,
    /// 每次命令/查询的超时；未设置时不限时
    pub operation_timeout_ms: Option<u64>,
}

/// 事件日志与投影的存储后端
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    Sqlite {
        #[serde(default = "default_sqlite_url")]
        url: String,
    },
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// EnvFilter 指令，例如 `info` 或 `cashflow_domain=debug,info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 输出 JSON 格式（否则为 pretty）
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PublisherConfig {
    /// 实时事件流的缓冲容量
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            feed_capacity: default_feed_capacity(),
        }
    }
}

fn default_sqlite_url() -> String {
    "sqlite://cashflow.db?mode=rwc".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_feed_capacity() -> usize {
    DEFAULT_FEED_CAPACITY
}

impl AppConfig {
    /// 从进程环境变量加载
    pub fn load() -> Result<Self, AppError> {
        Self::from_environment(Self::environment())
    }

    /// 从给定的变量表加载（不读取进程环境）
    pub fn from_env_map(vars: HashMap<String, String>) -> Result<Self, AppError> {
        Self::from_environment(Self::environment().source(Some(vars)))
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn from_environment(env: config::Environment) -> Result<Self, AppError> {
        let config = config::Config::builder().add_source(env).build()?;
        let cfg: AppConfig = config.try_deserialize()?;
        Ok(cfg)
    }
}
