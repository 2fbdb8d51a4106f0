//! 领域层统一错误定义
//!
//! 覆盖写路径（校验、日志追加、聚合重建）与读路径（投影同步）的最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 命令输入 ---
    #[error("validation error: {reason}")]
    Validation { reason: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },

    // --- 事件日志 ---
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    // --- 聚合重建 ---
    #[error("out of order event: aggregate={aggregate_id}, event_type={event_type}, reason={reason}")]
    OutOfOrderEvent {
        aggregate_id: String,
        event_type: String,
        reason: String,
    },

    // --- 投影 ---
    #[error("projection divergence: event_type={event_type}, id={id}, reason={reason}")]
    ProjectionDivergence {
        event_type: String,
        id: String,
        reason: String,
    },
    #[error("unknown event kind: {0}")]
    UnknownEventKind(String),

    // --- 事件发布 ---
    #[error("event feed error: {reason}")]
    EventFeed { reason: String },

    // --- 取消/超时 ---
    #[error("operation cancelled: {operation}")]
    Cancelled { operation: &'static str },
    #[error("deadline exceeded: {operation}")]
    DeadlineExceeded { operation: &'static str },
}

impl DomainError {
    pub fn validation(reason: impl Into<String>) -> Self {
        DomainError::Validation {
            reason: reason.into(),
        }
    }

    pub fn serialization(reason: impl Into<String>) -> Self {
        DomainError::Serialization {
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        DomainError::StorageUnavailable {
            reason: reason.into(),
        }
    }

    pub fn event_feed(reason: impl Into<String>) -> Self {
        DomainError::EventFeed {
            reason: reason.into(),
        }
    }

    /// 读模型与写模型已分叉（更新/删除的目标投影行不存在）
    pub fn update_of_missing_projection(event_type: &str, id: &str) -> Self {
        DomainError::ProjectionDivergence {
            event_type: event_type.to_string(),
            id: id.to_string(),
            reason: "projection row does not exist".to_string(),
        }
    }

    /// 是否为取消或超时导致的失败
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            DomainError::Cancelled { .. } | DomainError::DeadlineExceeded { .. }
        )
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// ---- Cross-crate conversions for infrastructure convenience ----

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl From<chrono::ParseError> for DomainError {
    fn from(err: chrono::ParseError) -> Self {
        DomainError::Validation {
            reason: err.to_string(),
        }
    }
}

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::StorageUnavailable {
            reason: err.to_string(),
        }
    }
}
