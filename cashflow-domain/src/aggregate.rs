//! 聚合（Aggregate）抽象
//!
//! 约束一个聚合的核心行为：
//! - 变更方法产生事件，先 `apply` 到自身状态，再记入未提交事件；
//! - `apply` 是重建与变更共用的唯一状态迁移入口；
//! - 未提交事件仅在日志确认写入后由仓储清空。
//!
use crate::domain_event::{AggregateType, DomainEvent};

/// 聚合根接口
pub trait Aggregate: Send + Sync + 'static {
    const TYPE: AggregateType;

    /// 重建时的初始空状态
    fn empty(id: &str) -> Self;

    fn id(&self) -> &str;

    /// 应用事件，更新聚合状态
    fn apply(&mut self, event: &DomainEvent);

    /// 自加载或创建以来产生、尚未写入日志的事件
    fn uncommitted_events(&self) -> &[DomainEvent];

    fn clear_uncommitted_events(&mut self);
}
