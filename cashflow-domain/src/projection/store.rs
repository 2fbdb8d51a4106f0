use crate::{
    context::CallContext,
    error::DomainResult,
    projection::{CategoryProjection, MovementChanges, MovementListQuery, MovementProjection},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// 读模型存储：每个操作只触及单个文档
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// 按 ID 整体替换
    async fn upsert_category(&self, ctx: &CallContext, category: CategoryProjection)
    -> DomainResult<()>;

    /// 名称解析用，包含已删除行
    async fn find_category(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<CategoryProjection>>;

    async fn upsert_movement(&self, ctx: &CallContext, movement: MovementProjection)
    -> DomainResult<()>;

    /// 返回是否命中既有行
    async fn update_movement(
        &self,
        ctx: &CallContext,
        id: &str,
        changes: &MovementChanges,
    ) -> DomainResult<bool>;

    /// 软删除，返回是否命中既有行
    async fn mark_movement_deleted(
        &self,
        ctx: &CallContext,
        id: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// 返回当前页与过滤后的总数（均不含已删除行）
    async fn list_movements(
        &self,
        ctx: &CallContext,
        query: &MovementListQuery,
    ) -> DomainResult<(Vec<MovementProjection>, usize)>;

    /// 未删除的分类，按名称升序
    async fn list_categories(&self, ctx: &CallContext) -> DomainResult<Vec<CategoryProjection>>;

    async fn get_movement(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<MovementProjection>>;

    async fn get_category(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<CategoryProjection>>;

    /// 清空全部投影（用于重建）
    async fn clear(&self, ctx: &CallContext) -> DomainResult<()>;
}

#[async_trait]
impl<T> ProjectionStore for Arc<T>
where
    T: ProjectionStore + ?Sized,
{
    async fn upsert_category(
        &self,
        ctx: &CallContext,
        category: CategoryProjection,
    ) -> DomainResult<()> {
        (**self).upsert_category(ctx, category).await
    }

    async fn find_category(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<CategoryProjection>> {
        (**self).find_category(ctx, id).await
    }

    async fn upsert_movement(
        &self,
        ctx: &CallContext,
        movement: MovementProjection,
    ) -> DomainResult<()> {
        (**self).upsert_movement(ctx, movement).await
    }

    async fn update_movement(
        &self,
        ctx: &CallContext,
        id: &str,
        changes: &MovementChanges,
    ) -> DomainResult<bool> {
        (**self).update_movement(ctx, id, changes).await
    }

    async fn mark_movement_deleted(
        &self,
        ctx: &CallContext,
        id: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        (**self).mark_movement_deleted(ctx, id, at).await
    }

    async fn list_movements(
        &self,
        ctx: &CallContext,
        query: &MovementListQuery,
    ) -> DomainResult<(Vec<MovementProjection>, usize)> {
        (**self).list_movements(ctx, query).await
    }

    async fn list_categories(&self, ctx: &CallContext) -> DomainResult<Vec<CategoryProjection>> {
        (**self).list_categories(ctx).await
    }

    async fn get_movement(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<MovementProjection>> {
        (**self).get_movement(ctx, id).await
    }

    async fn get_category(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<CategoryProjection>> {
        (**self).get_category(ctx, id).await
    }

    async fn clear(&self, ctx: &CallContext) -> DomainResult<()> {
        (**self).clear(ctx).await
    }
}
