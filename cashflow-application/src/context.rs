use cashflow_domain::context::CallContext;
use std::time::Duration;

/// 应用层上下文（Application Context）
///
/// 承载一次应用层调用（命令/查询）所需的横切信息，例如：
/// - 请求 ID（`request_id`）：附加到该次调用的 tracing span 上；
/// - 调用上下文（`call`）：取消信号与截止时间，向下传递给每个存储操作。
///
/// 典型用法：
/// ```rust
/// use cashflow_application::context::AppContext;
/// use std::time::Duration;
///
/// let ctx = AppContext::new()
///     .with_request_id("req-123")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(ctx.request_id(), Some("req-123"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    /// 请求 ID（可选）
    pub request_id: Option<String>,
    /// 取消与超时
    pub call: CallContext,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_call(mut self, call: CallContext) -> Self {
        self.call = call;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call = self.call.with_timeout(timeout);
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}
