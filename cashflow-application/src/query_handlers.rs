//! 账本查询处理器
//!
//! - `ProjectionQueryHandler`：直接读取投影存储，速度快，依赖事件已同步到投影；
//! - `ReplayQueryHandler`：每次查询都将完整日志重放到临时内存投影后再作答，结果精确。
//!
//! 两者响应同一组查询类型，可分别注册到不同的查询总线。
//!
use crate::{
    context::AppContext,
    dto::{BalanceDto, CategoryDto, CategoryExpenseDto, MovementDto, PaginatedMovementsDto},
    error::AppError,
    queries::{
        GetBalance, GetCategories, GetCategoryById, GetExpensesByCategory, GetMovementById,
        GetMovements, GetPaginatedMovements,
    },
    query::Query,
    query_handler::QueryHandler,
};
use async_trait::async_trait;
use cashflow_domain::{
    domain_event::MovementType,
    persist::EventStore,
    projection::{
        InMemoryProjectionStore, MovementListQuery, MovementProjection, ProjectionEngine,
        ProjectionStore, UNCATEGORIZED,
    },
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// 分页元数据在未限制条数时使用的每页大小
pub const DEFAULT_PER_PAGE: usize = 10;

const PERIOD_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct ProjectionQueryHandler {
    store: Arc<dyn ProjectionStore>,
}

impl ProjectionQueryHandler {
    pub fn new(store: Arc<dyn ProjectionStore>) -> Self {
        Self { store }
    }

    async fn movements(
        &self,
        ctx: &AppContext,
        query: &MovementListQuery,
    ) -> Result<(Vec<MovementProjection>, usize), AppError> {
        Ok(self.store.list_movements(&ctx.call, query).await?)
    }

    async fn all_movements(
        &self,
        ctx: &AppContext,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<MovementProjection>, AppError> {
        let query = MovementListQuery {
            start,
            end,
            ..MovementListQuery::default()
        };
        let (movements, _total) = self.movements(ctx, &query).await?;
        Ok(movements)
    }
}

#[async_trait]
impl QueryHandler<GetMovements> for ProjectionQueryHandler {
    async fn handle(&self, ctx: &AppContext, q: GetMovements) -> Result<Vec<MovementDto>, AppError> {
        let movements = self.all_movements(ctx, q.start, q.end).await?;
        Ok(movements.into_iter().map(MovementDto::from).collect())
    }
}

#[async_trait]
impl QueryHandler<GetPaginatedMovements> for ProjectionQueryHandler {
    async fn handle(
        &self,
        ctx: &AppContext,
        q: GetPaginatedMovements,
    ) -> Result<PaginatedMovementsDto, AppError> {
        let query = MovementListQuery::builder()
            .maybe_start(q.start)
            .maybe_end(q.end)
            .limit(q.limit)
            .offset(q.offset)
            .build();
        let (movements, total) = self.movements(ctx, &query).await?;

        let per_page = if q.limit > 0 { q.limit } else { DEFAULT_PER_PAGE };

        Ok(PaginatedMovementsDto {
            movements: movements.into_iter().map(MovementDto::from).collect(),
            total,
            page: q.offset / per_page + 1,
            per_page,
            has_next: q.offset + per_page < total,
            has_prev: q.offset > 0,
        })
    }
}

#[async_trait]
impl QueryHandler<GetBalance> for ProjectionQueryHandler {
    async fn handle(&self, ctx: &AppContext, q: GetBalance) -> Result<BalanceDto, AppError> {
        if q.end < q.start {
            return Err(AppError::Validation(format!(
                "balance period ends before it starts: {} > {}",
                q.start, q.end
            )));
        }

        let movements = self.all_movements(ctx, Some(q.start), Some(q.end)).await?;

        let (mut total_income, mut total_expense) = (0.0, 0.0);
        for m in &movements {
            match m.movement_type {
                MovementType::Income => total_income += m.amount,
                MovementType::Expense => total_expense += m.amount,
            }
        }

        Ok(BalanceDto {
            total_income,
            total_expense,
            net_balance: total_income - total_expense,
            period: format!(
                "{} - {}",
                q.start.format(PERIOD_DATE_FORMAT),
                q.end.format(PERIOD_DATE_FORMAT)
            ),
        })
    }
}

#[async_trait]
impl QueryHandler<GetExpensesByCategory> for ProjectionQueryHandler {
    async fn handle(
        &self,
        ctx: &AppContext,
        q: GetExpensesByCategory,
    ) -> Result<Vec<CategoryExpenseDto>, AppError> {
        let movements = self.all_movements(ctx, q.start, q.end).await?;

        let mut groups: HashMap<String, CategoryExpenseDto> = HashMap::new();
        for m in movements
            .into_iter()
            .filter(|m| m.movement_type == MovementType::Expense)
        {
            let (category_id, category_name) = if m.category_id.is_empty() {
                (UNCATEGORIZED.to_string(), UNCATEGORIZED.to_string())
            } else {
                (m.category_id, m.category_name)
            };

            let entry = groups
                .entry(category_id.clone())
                .or_insert_with(|| CategoryExpenseDto {
                    category_id,
                    category_name,
                    total: 0.0,
                    count: 0,
                });
            entry.total += m.amount;
            entry.count += 1;
        }

        let mut out: Vec<_> = groups.into_values().collect();
        out.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.category_name.cmp(&b.category_name))
        });
        Ok(out)
    }
}

#[async_trait]
impl QueryHandler<GetCategories> for ProjectionQueryHandler {
    async fn handle(&self, ctx: &AppContext, _q: GetCategories) -> Result<Vec<CategoryDto>, AppError> {
        let categories = self.store.list_categories(&ctx.call).await?;
        Ok(categories.into_iter().map(CategoryDto::from).collect())
    }
}

#[async_trait]
impl QueryHandler<GetMovementById> for ProjectionQueryHandler {
    async fn handle(
        &self,
        ctx: &AppContext,
        q: GetMovementById,
    ) -> Result<Option<MovementDto>, AppError> {
        let movement = self.store.get_movement(&ctx.call, &q.id).await?;
        Ok(movement.map(MovementDto::from))
    }
}

#[async_trait]
impl QueryHandler<GetCategoryById> for ProjectionQueryHandler {
    async fn handle(
        &self,
        ctx: &AppContext,
        q: GetCategoryById,
    ) -> Result<Option<CategoryDto>, AppError> {
        let category = self.store.get_category(&ctx.call, &q.id).await?;
        Ok(category.map(CategoryDto::from))
    }
}

/// 基于日志重放的查询处理器
#[derive(Clone)]
pub struct ReplayQueryHandler {
    log: Arc<dyn EventStore>,
}

impl ReplayQueryHandler {
    pub fn new(log: Arc<dyn EventStore>) -> Self {
        Self { log }
    }

    /// 将完整日志重放进一份临时内存投影
    async fn scratch(&self, ctx: &AppContext) -> Result<ProjectionQueryHandler, AppError> {
        let engine = ProjectionEngine::new(Arc::new(InMemoryProjectionStore::new()));
        let report = engine.rebuild(&ctx.call, self.log.as_ref(), false).await?;
        if report.failed > 0 {
            tracing::warn!(
                total = report.total,
                failed = report.failed,
                "replay skipped events that could not be projected"
            );
        }
        Ok(ProjectionQueryHandler::new(engine.store().clone()))
    }
}

#[async_trait]
impl<Q> QueryHandler<Q> for ReplayQueryHandler
where
    Q: Query,
    ProjectionQueryHandler: QueryHandler<Q>,
{
    async fn handle(&self, ctx: &AppContext, q: Q) -> Result<Q::Dto, AppError> {
        let handler = self.scratch(ctx).await?;
        QueryHandler::<Q>::handle(&handler, ctx, q).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashflow_domain::projection::{CategoryProjection, MovementProjection};
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, d, 0, 0, 0).unwrap()
    }

    fn movement(id: &str, ty: MovementType, category: &str, amount: f64, d: u32) -> MovementProjection {
        MovementProjection {
            id: id.to_string(),
            movement_type: ty,
            category_id: category.to_string(),
            category_name: if category.is_empty() {
                UNCATEGORIZED.to_string()
            } else {
                category.to_uppercase()
            },
            amount,
            description: None,
            date: day(d),
            created_at: day(d),
            updated_at: day(d),
            deleted: false,
        }
    }

    async fn seeded() -> anyhow::Result<ProjectionQueryHandler> {
        let store = Arc::new(InMemoryProjectionStore::new());
        let ctx = AppContext::default();
        store
            .upsert_category(
                &ctx.call,
                CategoryProjection {
                    id: "food".into(),
                    name: "FOOD".into(),
                    created_at: day(1),
                    updated_at: day(1),
                    deleted: false,
                },
            )
            .await?;
        for m in [
            movement("e1", MovementType::Expense, "food", 100.0, 1),
            movement("e2", MovementType::Expense, "rent", 900.0, 2),
            movement("e3", MovementType::Expense, "food", 50.0, 3),
            movement("e4", MovementType::Expense, "", 10.0, 4),
            movement("i1", MovementType::Income, "salary", 3000.0, 5),
        ] {
            store.upsert_movement(&ctx.call, m).await?;
        }
        Ok(ProjectionQueryHandler::new(store))
    }

    #[tokio::test]
    async fn balance_sums_by_type_within_period() -> anyhow::Result<()> {
        let handler = seeded().await?;
        let ctx = AppContext::default();

        let balance = handler
            .handle(&ctx, GetBalance { start: day(1), end: day(4) })
            .await?;
        assert_eq!(balance.total_expense, 1060.0);
        assert_eq!(balance.total_income, 0.0);
        assert_eq!(balance.net_balance, -1060.0);
        assert_eq!(balance.period, "2025-07-01 - 2025-07-04");

        let err = handler
            .handle(&ctx, GetBalance { start: day(4), end: day(1) })
            .await
            .unwrap_err();
        assert!(err.is_validation());
        Ok(())
    }

    #[tokio::test]
    async fn expenses_grouped_by_category_sorted_by_total() -> anyhow::Result<()> {
        let handler = seeded().await?;
        let groups = handler
            .handle(&AppContext::default(), GetExpensesByCategory::default())
            .await?;

        let summary: Vec<_> = groups
            .iter()
            .map(|g| (g.category_id.as_str(), g.total, g.count))
            .collect();
        assert_eq!(
            summary,
            vec![("rent", 900.0, 1), ("food", 150.0, 2), (UNCATEGORIZED, 10.0, 1)]
        );
        assert_eq!(groups[2].category_name, UNCATEGORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn pagination_metadata() -> anyhow::Result<()> {
        let handler = seeded().await?;
        let ctx = AppContext::default();

        let page = handler
            .handle(
                &ctx,
                GetPaginatedMovements {
                    limit: 2,
                    offset: 2,
                    ..Default::default()
                },
            )
            .await?;
        let ids: Vec<_> = page.movements.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["e3", "e2"]);
        assert_eq!((page.total, page.page, page.per_page), (5, 2, 2));
        assert!(page.has_next && page.has_prev);

        let all = handler
            .handle(&ctx, GetPaginatedMovements::default())
            .await?;
        assert_eq!(all.movements.len(), 5);
        assert_eq!((all.page, all.per_page), (1, DEFAULT_PER_PAGE));
        assert!(!all.has_next && !all.has_prev);
        Ok(())
    }

    #[tokio::test]
    async fn point_lookups_and_category_listing() -> anyhow::Result<()> {
        let handler = seeded().await?;
        let ctx = AppContext::default();

        let found = handler
            .handle(&ctx, GetMovementById { id: "i1".into() })
            .await?;
        assert_eq!(found.map(|m| m.amount), Some(3000.0));
        assert!(
            handler
                .handle(&ctx, GetCategoryById { id: "missing".into() })
                .await?
                .is_none()
        );

        let categories = handler.handle(&ctx, GetCategories).await?;
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "FOOD");
        Ok(())
    }
}
