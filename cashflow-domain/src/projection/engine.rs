//! 投影引擎（ProjectionEngine）
//!
//! 按事件类型标签将日志记录同步到读模型：
//! - 创建事件为整体 upsert，可重复处理；
//! - 更新/删除事件修改既有行，目标行缺失视为读写分叉并报告；
//! - 无法识别的事件类型记录日志后跳过。
//!
use crate::{
    context::CallContext,
    domain_event::{CategoryCreated, DomainEvent, MovementRecorded, MovementRemoved, MovementType},
    error::{DomainError, DomainResult},
    persist::{EventStore, StoredEvent},
    projection::{
        CategoryProjection, MovementChanges, MovementProjection, ProjectionStore, UNCATEGORIZED,
    },
};
use serde::Serialize;
use std::sync::Arc;

/// 重建结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ProjectionEngine {
    store: Arc<dyn ProjectionStore>,
}

impl ProjectionEngine {
    pub fn new(store: Arc<dyn ProjectionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ProjectionStore> {
        &self.store
    }

    pub async fn process_event(&self, ctx: &CallContext, event: &StoredEvent) -> DomainResult<()> {
        let event = match event.to_event() {
            Ok(event) => event,
            Err(DomainError::UnknownEventKind(tag)) => {
                tracing::warn!(
                    event_type = %tag,
                    aggregate_id = event.aggregate_id(),
                    "skipping unknown event kind"
                );
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        match &event {
            DomainEvent::CategoryCreated(e) => self.on_category_created(ctx, e).await,
            DomainEvent::ExpenseCreated(e) => {
                self.on_movement_created(ctx, MovementType::Expense, e).await
            }
            DomainEvent::IncomeCreated(e) => {
                self.on_movement_created(ctx, MovementType::Income, e).await
            }
            DomainEvent::ExpenseUpdated(e) | DomainEvent::IncomeUpdated(e) => {
                self.on_movement_updated(ctx, &event, e).await
            }
            DomainEvent::ExpenseDeleted(e) | DomainEvent::IncomeDeleted(e) => {
                self.on_movement_deleted(ctx, &event, e).await
            }
        }
    }

    async fn on_category_created(&self, ctx: &CallContext, e: &CategoryCreated) -> DomainResult<()> {
        if e.category_id.is_empty() || e.name.is_empty() {
            return Err(DomainError::validation(
                "CategoryCreated requires category id and name",
            ));
        }

        self.store
            .upsert_category(
                ctx,
                CategoryProjection {
                    id: e.category_id.clone(),
                    name: e.name.clone(),
                    created_at: e.occurred_at,
                    updated_at: e.occurred_at,
                    deleted: false,
                },
            )
            .await?;

        tracing::info!(category_id = %e.category_id, "category projected");
        Ok(())
    }

    async fn on_movement_created(
        &self,
        ctx: &CallContext,
        movement_type: MovementType,
        e: &MovementRecorded,
    ) -> DomainResult<()> {
        if e.movement_id.is_empty() {
            return Err(DomainError::validation(format!(
                "{movement_type} created event requires a movement id"
            )));
        }

        let category_name = self.resolve_category_name(ctx, &e.details.category_id).await?;
        self.store
            .upsert_movement(
                ctx,
                MovementProjection {
                    id: e.movement_id.clone(),
                    movement_type,
                    category_id: e.details.category_id.clone(),
                    category_name,
                    amount: e.details.amount,
                    description: e.details.description.clone(),
                    date: e.details.date,
                    created_at: e.occurred_at,
                    updated_at: e.occurred_at,
                    deleted: false,
                },
            )
            .await?;

        tracing::info!(movement_id = %e.movement_id, %movement_type, "movement projected");
        Ok(())
    }

    async fn on_movement_updated(
        &self,
        ctx: &CallContext,
        event: &DomainEvent,
        e: &MovementRecorded,
    ) -> DomainResult<()> {
        let changes = MovementChanges {
            category_id: e.details.category_id.clone(),
            category_name: self.resolve_category_name(ctx, &e.details.category_id).await?,
            amount: e.details.amount,
            description: e.details.description.clone(),
            date: e.details.date,
            updated_at: e.occurred_at,
        };

        if !self.store.update_movement(ctx, &e.movement_id, &changes).await? {
            return Err(DomainError::update_of_missing_projection(
                event.kind().as_str(),
                &e.movement_id,
            ));
        }

        tracing::info!(movement_id = %e.movement_id, "movement projection updated");
        Ok(())
    }

    async fn on_movement_deleted(
        &self,
        ctx: &CallContext,
        event: &DomainEvent,
        e: &MovementRemoved,
    ) -> DomainResult<()> {
        if !self
            .store
            .mark_movement_deleted(ctx, &e.movement_id, e.occurred_at)
            .await?
        {
            return Err(DomainError::update_of_missing_projection(
                event.kind().as_str(),
                &e.movement_id,
            ));
        }

        tracing::info!(movement_id = %e.movement_id, "movement projection soft-deleted");
        Ok(())
    }

    async fn resolve_category_name(
        &self,
        ctx: &CallContext,
        category_id: &str,
    ) -> DomainResult<String> {
        if category_id.is_empty() {
            return Ok(UNCATEGORIZED.to_string());
        }

        Ok(self
            .store
            .find_category(ctx, category_id)
            .await?
            .map(|category| category.name)
            .unwrap_or_else(|| UNCATEGORIZED.to_string()))
    }

    /// 由完整日志重建投影；单个事件失败不会中止重建，取消/超时除外
    pub async fn rebuild(
        &self,
        ctx: &CallContext,
        event_store: &dyn EventStore,
        clear: bool,
    ) -> DomainResult<RebuildReport> {
        if clear {
            self.store.clear(ctx).await?;
            tracing::info!("projections cleared");
        }

        let events = event_store.query_all(ctx, None, None).await?;
        let mut report = RebuildReport {
            total: events.len(),
            ..RebuildReport::default()
        };

        for event in &events {
            match self.process_event(ctx, event).await {
                Ok(()) => report.processed += 1,
                Err(err) if err.is_interrupted() => return Err(err),
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        event_id = event.event_id().unwrap_or_default(),
                        event_type = event.event_type(),
                        error = %err,
                        "failed to project event during rebuild"
                    );
                }
            }
        }

        tracing::info!(
            total = report.total,
            processed = report.processed,
            failed = report.failed,
            "projection rebuild finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event::{AggregateType, MovementDetails, Payload};
    use crate::persist::InMemoryEventStore;
    use crate::projection::{InMemoryProjectionStore, MovementListQuery};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, day, 10, 0, 0).unwrap()
    }

    fn stored(aggregate_type: AggregateType, event: DomainEvent) -> StoredEvent {
        StoredEvent::from_event(event.aggregate_id(), aggregate_type, &event).unwrap()
    }

    fn category(id: &str, name: &str, day: u32) -> StoredEvent {
        stored(
            AggregateType::Category,
            DomainEvent::CategoryCreated(CategoryCreated {
                category_id: id.into(),
                name: name.into(),
                occurred_at: at(day),
            }),
        )
    }

    fn recorded(id: &str, category_id: &str, amount: f64, day: u32) -> MovementRecorded {
        MovementRecorded {
            movement_id: id.into(),
            details: MovementDetails {
                category_id: category_id.into(),
                amount,
                description: None,
                date: at(day),
            },
            occurred_at: at(day),
        }
    }

    fn engine() -> (ProjectionEngine, Arc<InMemoryProjectionStore>) {
        let store = Arc::new(InMemoryProjectionStore::new());
        (ProjectionEngine::new(store.clone()), store)
    }

    #[tokio::test]
    async fn created_events_are_idempotent() -> anyhow::Result<()> {
        let (engine, store) = engine();
        let ctx = CallContext::new();
        let created = stored(
            AggregateType::Expense,
            DomainEvent::ExpenseCreated(recorded("exp-1", "cat-1", 50_000.0, 1)),
        );

        engine.process_event(&ctx, &category("cat-1", "Food", 1)).await?;
        engine.process_event(&ctx, &created).await?;
        let once = store.get_movement(&ctx, "exp-1").await?;

        engine.process_event(&ctx, &category("cat-1", "Food", 1)).await?;
        engine.process_event(&ctx, &created).await?;
        let twice = store.get_movement(&ctx, "exp-1").await?;

        assert_eq!(once, twice);
        assert_eq!(store.list_categories(&ctx).await?.len(), 1);
        assert_eq!(twice.map(|m| m.category_name).as_deref(), Some("Food"));
        Ok(())
    }

    #[tokio::test]
    async fn update_and_delete_require_existing_row() -> anyhow::Result<()> {
        let (engine, _store) = engine();
        let ctx = CallContext::new();

        let update = stored(
            AggregateType::Expense,
            DomainEvent::ExpenseUpdated(recorded("ghost", "", 1.0, 2)),
        );
        let delete = stored(
            AggregateType::Income,
            DomainEvent::IncomeDeleted(MovementRemoved {
                movement_id: "ghost".into(),
                occurred_at: at(2),
            }),
        );

        for event in [update, delete] {
            let err = engine.process_event(&ctx, &event).await.unwrap_err();
            assert!(matches!(err, DomainError::ProjectionDivergence { .. }));
        }
        Ok(())
    }

    #[tokio::test]
    async fn update_keeps_created_at_and_deleted_flag() -> anyhow::Result<()> {
        let (engine, store) = engine();
        let ctx = CallContext::new();

        engine
            .process_event(
                &ctx,
                &stored(
                    AggregateType::Income,
                    DomainEvent::IncomeCreated(recorded("inc-1", "missing", 10.0, 1)),
                ),
            )
            .await?;
        engine.process_event(&ctx, &category("cat-2", "Salary", 2)).await?;
        engine
            .process_event(
                &ctx,
                &stored(
                    AggregateType::Income,
                    DomainEvent::IncomeUpdated(recorded("inc-1", "cat-2", 20.0, 3)),
                ),
            )
            .await?;

        let row = store.get_movement(&ctx, "inc-1").await?.expect("row");
        assert_eq!(row.amount, 20.0);
        assert_eq!(row.category_name, "Salary");
        assert_eq!(row.created_at, at(1));
        assert_eq!(row.updated_at, at(3));
        assert!(!row.deleted);
        Ok(())
    }

    #[tokio::test]
    async fn soft_deleted_rows_are_hidden() -> anyhow::Result<()> {
        let (engine, store) = engine();
        let ctx = CallContext::new();

        for (id, day) in [("exp-1", 1), ("exp-2", 2)] {
            engine
                .process_event(
                    &ctx,
                    &stored(
                        AggregateType::Expense,
                        DomainEvent::ExpenseCreated(recorded(id, "", 5.0, day)),
                    ),
                )
                .await?;
        }
        engine
            .process_event(
                &ctx,
                &stored(
                    AggregateType::Expense,
                    DomainEvent::ExpenseDeleted(MovementRemoved {
                        movement_id: "exp-1".into(),
                        occurred_at: at(4),
                    }),
                ),
            )
            .await?;

        let (rows, total) = store
            .list_movements(&ctx, &MovementListQuery::default())
            .await?;
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, "exp-2");
        assert_eq!(rows[0].category_name, UNCATEGORIZED);
        assert!(store.get_movement(&ctx, "exp-1").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_kind_is_skipped_and_invalid_created_rejected() -> anyhow::Result<()> {
        let (engine, store) = engine();
        let ctx = CallContext::new();

        let unknown = StoredEvent::builder()
            .aggregate_id("b-1".to_string())
            .aggregate_type("Budget".to_string())
            .event_type("BudgetCreated".to_string())
            .payload(Payload::new())
            .occurred_at(at(1))
            .build();
        engine.process_event(&ctx, &unknown).await?;

        let err = engine
            .process_event(&ctx, &category("cat-1", "", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(store.list_categories(&ctx).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn rebuild_replays_log_and_counts_failures() -> anyhow::Result<()> {
        let log = InMemoryEventStore::new();
        let ctx = CallContext::new();
        let (engine, store) = engine();

        let category_event = DomainEvent::CategoryCreated(CategoryCreated {
            category_id: "cat-1".into(),
            name: "Food".into(),
            occurred_at: at(1),
        });
        log.append(&ctx, "cat-1", AggregateType::Category, &[category_event])
            .await?;
        log.append(
            &ctx,
            "exp-1",
            AggregateType::Expense,
            &[
                DomainEvent::ExpenseCreated(recorded("exp-1", "cat-1", 50_000.0, 1)),
                DomainEvent::ExpenseUpdated(recorded("exp-1", "cat-1", 75_000.0, 2)),
            ],
        )
        .await?;
        // 更新一个从未创建的收支：重建时计为失败
        log.append(
            &ctx,
            "exp-9",
            AggregateType::Expense,
            &[DomainEvent::ExpenseUpdated(recorded("exp-9", "", 1.0, 3))],
        )
        .await?;

        let report = engine.rebuild(&ctx, &log, true).await?;
        assert_eq!(
            report,
            RebuildReport {
                total: 4,
                processed: 3,
                failed: 1
            }
        );

        let row = store.get_movement(&ctx, "exp-1").await?.expect("row");
        assert_eq!(row.amount, 75_000.0);
        Ok(())
    }
}
