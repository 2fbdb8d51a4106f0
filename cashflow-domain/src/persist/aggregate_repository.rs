//! 聚合仓储（事件溯源）
//!
//! 通过回放聚合流重建状态，并在保存时追加未提交事件。
//! 回放规则：
//! - 属于其他聚合类型的事件被跳过；
//! - 创建事件初始化聚合（若尚未初始化）并应用；
//! - 更新事件早于任何创建事件时报告 `OutOfOrderEvent`；
//! - 删除事件不改变写模型字段。
//!
use crate::{
    aggregate::Aggregate,
    context::CallContext,
    domain_event::{DomainEvent, Lifecycle},
    error::{DomainError, DomainResult},
    persist::{EventStore, StoredEvent},
};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

#[async_trait]
pub trait AggregateRepository<A>: Send + Sync
where
    A: Aggregate,
{
    /// 流不存在时返回 `None`
    async fn get_by_id(&self, ctx: &CallContext, aggregate_id: &str) -> DomainResult<Option<A>>;

    /// 追加未提交事件并返回已提交的事件；写入失败时保留未提交事件以便重试
    async fn save(&self, ctx: &CallContext, aggregate: &mut A) -> DomainResult<Vec<DomainEvent>>;
}

#[async_trait]
impl<A, T> AggregateRepository<A> for Arc<T>
where
    A: Aggregate,
    T: AggregateRepository<A> + ?Sized,
{
    async fn get_by_id(&self, ctx: &CallContext, aggregate_id: &str) -> DomainResult<Option<A>> {
        (**self).get_by_id(ctx, aggregate_id).await
    }

    async fn save(&self, ctx: &CallContext, aggregate: &mut A) -> DomainResult<Vec<DomainEvent>> {
        (**self).save(ctx, aggregate).await
    }
}

/// 基于事件日志的通用聚合仓储实现
pub struct EventSourcedRepository<A> {
    event_store: Arc<dyn EventStore>,
    _marker: PhantomData<fn() -> A>,
}

impl<A> Clone for EventSourcedRepository<A> {
    fn clone(&self) -> Self {
        Self {
            event_store: self.event_store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A> EventSourcedRepository<A>
where
    A: Aggregate,
{
    pub fn new(event_store: Arc<dyn EventStore>) -> Self {
        Self {
            event_store,
            _marker: PhantomData,
        }
    }

    /// 将聚合流折叠为当前状态
    pub fn replay(aggregate_id: &str, events: &[StoredEvent]) -> DomainResult<Option<A>> {
        let mut aggregate: Option<A> = None;

        for stored in events {
            let kind = match stored.kind() {
                Ok(kind) => kind,
                Err(DomainError::UnknownEventKind(tag)) => {
                    tracing::warn!(aggregate_id, event_type = %tag, "skipping unknown event kind");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if kind.aggregate_type() != A::TYPE {
                tracing::debug!(
                    aggregate_id,
                    event_type = %kind,
                    expected = %A::TYPE,
                    "skipping event of another aggregate type"
                );
                continue;
            }

            let event = stored.to_event()?;
            match kind.lifecycle() {
                Lifecycle::Created => {
                    aggregate
                        .get_or_insert_with(|| A::empty(aggregate_id))
                        .apply(&event);
                }
                Lifecycle::Updated => match aggregate.as_mut() {
                    Some(current) => current.apply(&event),
                    None => {
                        return Err(DomainError::OutOfOrderEvent {
                            aggregate_id: aggregate_id.to_string(),
                            event_type: kind.to_string(),
                            reason: "update before create".to_string(),
                        });
                    }
                },
                Lifecycle::Deleted => {}
            }
        }

        Ok(aggregate)
    }
}

#[async_trait]
impl<A> AggregateRepository<A> for EventSourcedRepository<A>
where
    A: Aggregate,
{
    async fn get_by_id(&self, ctx: &CallContext, aggregate_id: &str) -> DomainResult<Option<A>> {
        let events = self.event_store.load(ctx, aggregate_id).await?;
        Self::replay(aggregate_id, &events)
    }

    async fn save(&self, ctx: &CallContext, aggregate: &mut A) -> DomainResult<Vec<DomainEvent>> {
        let events = aggregate.uncommitted_events().to_vec();
        if events.is_empty() {
            return Ok(events);
        }

        self.event_store
            .append(ctx, aggregate.id(), A::TYPE, &events)
            .await?;
        aggregate.clear_uncommitted_events();

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::domain_event::{AggregateType, MovementDetails, MovementRecorded};
    use crate::movement::{Expense, Income};
    use crate::persist::InMemoryEventStore;
    use chrono::{TimeZone, Utc};

    fn details(amount: f64) -> MovementDetails {
        MovementDetails {
            category_id: "cat-1".into(),
            amount,
            description: None,
            date: Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(),
        }
    }

    fn repo<A: Aggregate>(store: &Arc<InMemoryEventStore>) -> EventSourcedRepository<A> {
        EventSourcedRepository::new(store.clone())
    }

    #[tokio::test]
    async fn replay_matches_in_memory_state() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryEventStore::new());
        let repo = repo::<Expense>(&store);
        let ctx = CallContext::new();

        let mut expense = Expense::record("exp-1", details(50_000.0))?;
        for amount in [60_000.0, 70_000.0, 75_000.0] {
            expense.update(details(amount))?;
        }
        let committed = repo.save(&ctx, &mut expense).await?;
        assert_eq!(committed.len(), 4);
        assert!(expense.uncommitted_events().is_empty());

        let replayed = repo.get_by_id(&ctx, "exp-1").await?.expect("stream exists");
        assert_eq!(replayed, expense);
        assert_eq!(replayed.amount(), 75_000.0);
        Ok(())
    }

    #[tokio::test]
    async fn missing_stream_yields_none_and_empty_save_is_noop() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryEventStore::new());
        let repo = repo::<Category>(&store);
        let ctx = CallContext::new();

        assert!(repo.get_by_id(&ctx, "nope").await?.is_none());

        let mut category = Category::create("cat-1", "Food")?;
        repo.save(&ctx, &mut category).await?;
        assert!(repo.save(&ctx, &mut category).await?.is_empty());
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn update_before_create_is_out_of_order() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryEventStore::new());
        let ctx = CallContext::new();
        store
            .append(
                &ctx,
                "exp-1",
                AggregateType::Expense,
                &[DomainEvent::ExpenseUpdated(MovementRecorded {
                    movement_id: "exp-1".into(),
                    details: details(1.0),
                    occurred_at: Utc::now(),
                })],
            )
            .await?;

        let err = repo::<Expense>(&store)
            .get_by_id(&ctx, "exp-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OutOfOrderEvent { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn deleted_aggregate_is_still_reconstructed() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryEventStore::new());
        let repo = repo::<Income>(&store);
        let ctx = CallContext::new();

        let mut income = Income::record("inc-1", details(10.0))?;
        income.delete();
        repo.save(&ctx, &mut income).await?;

        let replayed = repo.get_by_id(&ctx, "inc-1").await?.expect("kept for audit");
        assert_eq!(replayed.amount(), 10.0);
        Ok(())
    }

    #[tokio::test]
    async fn foreign_events_are_skipped() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryEventStore::new());
        let ctx = CallContext::new();
        let mut expense = Expense::record("shared", details(5.0))?;
        repo::<Expense>(&store).save(&ctx, &mut expense).await?;

        // 以收入仓储读取支出流：没有可识别的事件
        assert!(repo::<Income>(&store).get_by_id(&ctx, "shared").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn failed_append_keeps_uncommitted_events() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryEventStore::new());
        let repo = repo::<Expense>(&store);
        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();
        let cancelled = CallContext::new().with_token(token);

        let mut expense = Expense::record("exp-1", details(1.0))?;
        assert!(repo.save(&cancelled, &mut expense).await.is_err());
        assert_eq!(expense.uncommitted_events().len(), 1);

        repo.save(&CallContext::new(), &mut expense).await?;
        assert!(expense.uncommitted_events().is_empty());
        Ok(())
    }
}
