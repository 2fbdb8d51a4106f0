use cashflow_domain::error::DomainError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("validation: {0}")]
    Validation(String),

    #[error("aggregate not found: {0}")]
    AggregateNotFound(String),

    #[error("aggregate already exists: {0}")]
    AggregateAlreadyExists(String),

    #[error("handler not found: {0}")]
    HandlerNotFound(&'static str),

    #[error("handler already registered: command={command}")]
    AlreadyRegisteredCommand { command: &'static str },

    #[error("handler already registered: query={query}")]
    AlreadyRegisteredQuery { query: &'static str },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("config: {0}")]
    Config(String),

    #[error("telemetry: {0}")]
    Telemetry(String),
}

impl AppError {
    /// 命令输入校验失败（含领域层校验）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::Domain(DomainError::Validation { .. })
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::AggregateNotFound(_) | AppError::Domain(DomainError::NotFound { .. })
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::AggregateAlreadyExists(_))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
