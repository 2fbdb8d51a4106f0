//! 调用上下文（CallContext）
//!
//! 每个触达存储的操作都接收一个 `CallContext`，由调用方决定取消信号与截止时间。
//! 存储实现通过 `check` 在提交前确认上下文仍然有效，或通过 `run` 将整个异步操作
//! 与取消/超时竞争，被中断的操作不会留下部分写入。
//!
use crate::error::{DomainError, DomainResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定外部取消令牌（例如请求级或进程级关闭信号）
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 同步检查：已取消或已超时则返回错误
    pub fn check(&self, operation: &'static str) -> DomainResult<()> {
        if self.token.is_cancelled() {
            return Err(DomainError::Cancelled { operation });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(DomainError::DeadlineExceeded { operation });
            }
        }
        Ok(())
    }

    /// 在取消/超时约束下执行异步操作。
    ///
    /// 中断时 `fut` 会被直接丢弃，依赖 drop 回滚的实现（如数据库事务）因此不会部分提交。
    pub async fn run<F, T>(&self, operation: &'static str, fut: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        self.check(operation)?;

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(DomainError::Cancelled { operation }),
            _ = expired => Err(DomainError::DeadlineExceeded { operation }),
            result = fut => result,
        }
    }
}
