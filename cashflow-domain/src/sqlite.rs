//! SQLite 基础设施（feature = "infra-sqlx"）
//!
//! 事件日志与投影共享同一个连接池；时间戳统一以定宽 UTC 文本存储，
//! 使字典序与时间序一致，范围过滤可以直接在 SQL 中完成。
//!
use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";
const TIMESTAMP_READ_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// 打开连接池。
///
/// 内存库的每个连接都是独立数据库，因此固定为单连接且永不回收。
pub async fn connect(url: &str) -> DomainResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let in_memory = url.contains(":memory:") || url.contains("mode=memory");

    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 4 })
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    tracing::debug!(url, in_memory, "sqlite pool opened");
    Ok(pool)
}

pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_WRITE_FORMAT).to_string()
}

pub(crate) fn decode_timestamp(text: &str) -> DomainResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_READ_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|err| DomainError::serialization(format!("invalid stored timestamp {text}: {err}")))
}
