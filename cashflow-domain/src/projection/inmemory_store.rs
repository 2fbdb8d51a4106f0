//! 内存投影存储
//!
//! 以 `DashMap` 保存两类文档，单文档操作在分片锁内原子完成。
//!
use crate::{
    context::CallContext,
    error::DomainResult,
    projection::{
        CategoryProjection, MovementChanges, MovementListQuery, MovementProjection,
        ProjectionStore,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Default)]
pub struct InMemoryProjectionStore {
    movements: DashMap<String, MovementProjection>,
    categories: DashMap<String, CategoryProjection>,
}

impl InMemoryProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectionStore for InMemoryProjectionStore {
    async fn upsert_category(
        &self,
        ctx: &CallContext,
        category: CategoryProjection,
    ) -> DomainResult<()> {
        ctx.check("projection.upsert_category")?;
        self.categories.insert(category.id.clone(), category);
        Ok(())
    }

    async fn find_category(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<CategoryProjection>> {
        ctx.check("projection.find_category")?;
        Ok(self.categories.get(id).map(|c| c.value().clone()))
    }

    async fn upsert_movement(
        &self,
        ctx: &CallContext,
        movement: MovementProjection,
    ) -> DomainResult<()> {
        ctx.check("projection.upsert_movement")?;
        self.movements.insert(movement.id.clone(), movement);
        Ok(())
    }

    async fn update_movement(
        &self,
        ctx: &CallContext,
        id: &str,
        changes: &MovementChanges,
    ) -> DomainResult<bool> {
        ctx.check("projection.update_movement")?;
        Ok(match self.movements.get_mut(id) {
            Some(mut row) => {
                row.apply_changes(changes);
                true
            }
            None => false,
        })
    }

    async fn mark_movement_deleted(
        &self,
        ctx: &CallContext,
        id: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        ctx.check("projection.mark_movement_deleted")?;
        Ok(match self.movements.get_mut(id) {
            Some(mut row) => {
                row.deleted = true;
                row.updated_at = at;
                true
            }
            None => false,
        })
    }

    async fn list_movements(
        &self,
        ctx: &CallContext,
        query: &MovementListQuery,
    ) -> DomainResult<(Vec<MovementProjection>, usize)> {
        ctx.check("projection.list_movements")?;

        let mut rows: Vec<MovementProjection> = self
            .movements
            .iter()
            .filter(|row| query.matches(row.value()))
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by(MovementProjection::listing_order);

        let total = rows.len();
        let page = rows.into_iter().skip(query.offset);
        let page = if query.limit == 0 {
            page.collect()
        } else {
            page.take(query.limit).collect()
        };

        Ok((page, total))
    }

    async fn list_categories(&self, ctx: &CallContext) -> DomainResult<Vec<CategoryProjection>> {
        ctx.check("projection.list_categories")?;

        let mut rows: Vec<CategoryProjection> = self
            .categories
            .iter()
            .filter(|row| !row.deleted)
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn get_movement(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<MovementProjection>> {
        ctx.check("projection.get_movement")?;
        Ok(self
            .movements
            .get(id)
            .filter(|row| !row.deleted)
            .map(|row| row.value().clone()))
    }

    async fn get_category(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<CategoryProjection>> {
        ctx.check("projection.get_category")?;
        Ok(self
            .categories
            .get(id)
            .filter(|row| !row.deleted)
            .map(|row| row.value().clone()))
    }

    async fn clear(&self, ctx: &CallContext) -> DomainResult<()> {
        ctx.check("projection.clear")?;
        self.movements.clear();
        self.categories.clear();
        Ok(())
    }
}
