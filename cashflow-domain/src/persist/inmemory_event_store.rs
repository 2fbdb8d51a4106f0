//! 内存事件日志
//!
//! 单把写锁保护全部流：批次先在锁外完成编码，持锁后同步写入，
//! 因此任何失败（编码、取消、超时）都发生在第一次写入之前。
//!
use super::event_store::within;
use crate::{
    context::CallContext,
    domain_event::{AggregateType, DomainEvent},
    error::DomainResult,
    persist::{EventStore, StoredEvent, serialize_events},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    streams: HashMap<String, Vec<StoredEvent>>,
    all: Vec<StoredEvent>,
}

#[derive(Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Inner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 日志中的事件总数
    pub async fn len(&self) -> usize {
        self.inner.read().await.all.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        ctx: &CallContext,
        aggregate_id: &str,
        aggregate_type: AggregateType,
        events: &[DomainEvent],
    ) -> DomainResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let records = serialize_events(aggregate_id, aggregate_type, events)?;

        let mut inner = ctx
            .run("event_store.append", async { Ok(self.inner.write().await) })
            .await?;
        ctx.check("event_store.append")?;

        let Inner { streams, all } = &mut *inner;
        let stream = streams.entry(aggregate_id.to_string()).or_default();
        for record in records {
            let record = record.with_event_id(format!("{}-{}", aggregate_id, stream.len() + 1));
            all.push(record.clone());
            stream.push(record);
        }

        tracing::debug!(
            aggregate_id,
            aggregate_type = %aggregate_type,
            count = events.len(),
            "events appended"
        );
        Ok(())
    }

    async fn load(&self, ctx: &CallContext, aggregate_id: &str) -> DomainResult<Vec<StoredEvent>> {
        let inner = ctx
            .run("event_store.load", async { Ok(self.inner.read().await) })
            .await?;

        Ok(inner.streams.get(aggregate_id).cloned().unwrap_or_default())
    }

    async fn query_all(
        &self,
        ctx: &CallContext,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> DomainResult<Vec<StoredEvent>> {
        let inner = ctx
            .run("event_store.query_all", async { Ok(self.inner.read().await) })
            .await?;

        Ok(inner
            .all
            .iter()
            .filter(|event| within(event.occurred_at(), start, end))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event::{MovementDetails, MovementRecorded, MovementRemoved, PayloadValue};
    use crate::error::DomainError;
    use chrono::TimeZone;
    use tokio_util::sync::CancellationToken;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, day, 12, 0, 0).unwrap()
    }

    fn recorded(id: &str, amount: f64, day: u32) -> MovementRecorded {
        MovementRecorded {
            movement_id: id.into(),
            details: MovementDetails {
                category_id: "cat-1".into(),
                amount,
                description: None,
                date: at(day),
            },
            occurred_at: at(day),
        }
    }

    #[tokio::test]
    async fn append_then_load_preserves_order_and_dual_keys() -> anyhow::Result<()> {
        let store = InMemoryEventStore::new();
        let ctx = CallContext::new();
        let events = vec![
            DomainEvent::ExpenseCreated(recorded("exp-1", 10.0, 1)),
            DomainEvent::ExpenseUpdated(recorded("exp-1", 20.0, 2)),
            DomainEvent::ExpenseDeleted(MovementRemoved {
                movement_id: "exp-1".into(),
                occurred_at: at(3),
            }),
        ];

        store
            .append(&ctx, "exp-1", AggregateType::Expense, &events)
            .await?;
        let loaded = store.load(&ctx, "exp-1").await?;

        let kinds: Vec<&str> = loaded.iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, ["ExpenseCreated", "ExpenseUpdated", "ExpenseDeleted"]);
        assert_eq!(loaded[1].event_id(), Some("exp-1-2"));
        assert_eq!(
            loaded[1].payload().raw("Amount"),
            Some(&PayloadValue::Float(20.0))
        );
        assert_eq!(
            loaded[1].payload().raw("amount"),
            Some(&PayloadValue::Float(20.0))
        );
        assert_eq!(crate::persist::deserialize_events(&loaded)?, events);
        Ok(())
    }

    #[tokio::test]
    async fn empty_append_and_unknown_stream() -> anyhow::Result<()> {
        let store = InMemoryEventStore::new();
        let ctx = CallContext::new();

        store.append(&ctx, "exp-1", AggregateType::Expense, &[]).await?;
        assert!(store.is_empty().await);
        assert!(store.load(&ctx, "exp-1").await?.is_empty());
        assert!(store.query_all(&ctx, None, None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn query_all_applies_inclusive_bounds() -> anyhow::Result<()> {
        let store = InMemoryEventStore::new();
        let ctx = CallContext::new();
        for day in 1..=5 {
            let id = format!("exp-{day}");
            store
                .append(
                    &ctx,
                    &id,
                    AggregateType::Expense,
                    &[DomainEvent::ExpenseCreated(recorded(&id, 1.0, day))],
                )
                .await?;
        }

        let days = |events: Vec<StoredEvent>| -> Vec<String> {
            events.iter().map(|e| e.aggregate_id().to_string()).collect()
        };

        assert_eq!(
            days(store.query_all(&ctx, Some(at(2)), Some(at(4))).await?),
            ["exp-2", "exp-3", "exp-4"]
        );
        assert_eq!(
            days(store.query_all(&ctx, Some(at(4)), None).await?),
            ["exp-4", "exp-5"]
        );
        assert_eq!(
            days(store.query_all(&ctx, None, Some(at(1))).await?),
            ["exp-1"]
        );
        assert_eq!(store.query_all(&ctx, None, None).await?.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn failed_batch_leaves_log_untouched() -> anyhow::Result<()> {
        let store = InMemoryEventStore::new();
        let ctx = CallContext::new();
        let batch = [
            DomainEvent::ExpenseCreated(recorded("exp-1", 10.0, 1)),
            DomainEvent::ExpenseUpdated(recorded("exp-1", f64::INFINITY, 2)),
        ];

        let err = store
            .append(&ctx, "exp-1", AggregateType::Expense, &batch)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Serialization { .. }));
        assert!(store.is_empty().await);

        let token = CancellationToken::new();
        token.cancel();
        let cancelled = CallContext::new().with_token(token);
        let err = store
            .append(&cancelled, "exp-1", AggregateType::Expense, &batch[..1])
            .await
            .unwrap_err();
        assert!(err.is_interrupted());
        assert!(store.load(&ctx, "exp-1").await?.is_empty());
        Ok(())
    }
}
