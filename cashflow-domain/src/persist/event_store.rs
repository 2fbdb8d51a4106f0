use crate::{
    context::CallContext,
    domain_event::{AggregateType, DomainEvent},
    error::DomainResult,
    persist::StoredEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// 追加写入的事件日志
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 将事件整批追加到聚合流；空批次直接成功，失败时不留下任何写入
    async fn append(
        &self,
        ctx: &CallContext,
        aggregate_id: &str,
        aggregate_type: AggregateType,
        events: &[DomainEvent],
    ) -> DomainResult<()>;

    /// 按追加顺序返回聚合流；未知聚合返回空集合
    async fn load(&self, ctx: &CallContext, aggregate_id: &str) -> DomainResult<Vec<StoredEvent>>;

    /// 跨流读取，按发生时间过滤（两端均为闭区间，缺省端不限）
    async fn query_all(
        &self,
        ctx: &CallContext,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> DomainResult<Vec<StoredEvent>>;
}

#[async_trait]
impl<T> EventStore for Arc<T>
where
    T: EventStore + ?Sized,
{
    async fn append(
        &self,
        ctx: &CallContext,
        aggregate_id: &str,
        aggregate_type: AggregateType,
        events: &[DomainEvent],
    ) -> DomainResult<()> {
        (**self).append(ctx, aggregate_id, aggregate_type, events).await
    }

    async fn load(&self, ctx: &CallContext, aggregate_id: &str) -> DomainResult<Vec<StoredEvent>> {
        (**self).load(ctx, aggregate_id).await
    }

    async fn query_all(
        &self,
        ctx: &CallContext,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> DomainResult<Vec<StoredEvent>> {
        (**self).query_all(ctx, start, end).await
    }
}

pub(crate) fn within(
    occurred_at: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    start.is_none_or(|s| occurred_at >= s) && end.is_none_or(|e| occurred_at <= e)
}
