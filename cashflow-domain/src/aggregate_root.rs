//! 聚合根编排器（AggregateRoot）
//!
//! 封装“加载聚合 → 保存未提交事件 → 发布已提交事件”的标准流程，
//! 以仓储与发布者为依赖，便于在应用层直接调用。
//!
use crate::{
    aggregate::Aggregate, context::CallContext, domain_event::DomainEvent, error::DomainResult,
    eventing::EventPublisher, persist::AggregateRepository,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// 面向应用层的聚合根编排器。
///
/// - `A`：聚合类型（实现 `Aggregate`）
/// - `R`：聚合仓储（实现 `AggregateRepository<A>`）
pub struct AggregateRoot<A, R>
where
    A: Aggregate,
    R: AggregateRepository<A>,
{
    repo: R,
    publisher: Arc<dyn EventPublisher>,
    _marker: PhantomData<fn() -> A>,
}

impl<A, R> AggregateRoot<A, R>
where
    A: Aggregate,
    R: AggregateRepository<A>,
{
    /// 创建编排器实例
    pub fn new(repo: R, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repo,
            publisher,
            _marker: PhantomData,
        }
    }

    pub async fn load(&self, ctx: &CallContext, aggregate_id: &str) -> DomainResult<Option<A>> {
        self.repo.get_by_id(ctx, aggregate_id).await
    }

    /// 提交聚合：
    /// 1. 追加未提交事件（失败直接返回，不发布）；
    /// 2. 发布已提交事件，发布失败仅记录日志。
    pub async fn commit(&self, ctx: &CallContext, aggregate: &mut A) -> DomainResult<Vec<DomainEvent>> {
        let events = self.repo.save(ctx, aggregate).await?;
        if events.is_empty() {
            return Ok(events);
        }

        if let Err(err) = self.publisher.publish(ctx, &events).await {
            tracing::warn!(
                aggregate_id = aggregate.id(),
                aggregate_type = %A::TYPE,
                error = %err,
                "publish after commit failed"
            );
        }

        Ok(events)
    }
}
