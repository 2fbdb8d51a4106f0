//! 账本命令处理器
//!
//! 统一流程：加载或构造聚合 → 调用聚合方法产生事件 → 追加到日志 → 发布。
//! 更新/删除不存在的记录时返回 `AggregateNotFound`，不追加也不发布；
//! 创建时指定的 ID 若已有事件流（任何聚合类型）则返回 `AggregateAlreadyExists`。
//!
use crate::{
    command::Command,
    command_handler::CommandHandler,
    commands::{CreateCategory, CreateMovement, DeleteMovement, UpdateMovement},
    context::AppContext,
    error::AppError,
};
use async_trait::async_trait;
use cashflow_domain::{
    aggregate_root::AggregateRoot,
    category::Category,
    eventing::EventPublisher,
    movement::{Movement, MovementKind},
    persist::{EventSourcedRepository, EventStore},
};
use std::sync::Arc;

/// 未指定 ID 时生成 UUID；指定的 ID 必须尚无任何事件
async fn claim_id(
    event_store: &dyn EventStore,
    ctx: &AppContext,
    requested: Option<String>,
) -> Result<String, AppError> {
    let Some(id) = requested.filter(|id| !id.trim().is_empty()) else {
        return Ok(uuid::Uuid::new_v4().to_string());
    };

    let existing = event_store.load(&ctx.call, &id).await?;
    if let Some(first) = existing.first() {
        return Err(AppError::AggregateAlreadyExists(format!(
            "{} {id}",
            first.aggregate_type()
        )));
    }
    Ok(id)
}

pub struct CategoryCommandHandler {
    event_store: Arc<dyn EventStore>,
    root: AggregateRoot<Category, EventSourcedRepository<Category>>,
}

impl CategoryCommandHandler {
    pub fn new(event_store: Arc<dyn EventStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            root: AggregateRoot::new(EventSourcedRepository::new(event_store.clone()), publisher),
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<CreateCategory> for CategoryCommandHandler {
    async fn handle(&self, ctx: &AppContext, cmd: CreateCategory) -> Result<String, AppError> {
        let id = claim_id(self.event_store.as_ref(), ctx, cmd.id).await?;
        let mut category = Category::create(id.clone(), cmd.name)?;

        self.root.commit(&ctx.call, &mut category).await?;
        tracing::info!(category_id = %id, "category created");

        Ok(id)
    }
}

/// 支出/收入命令处理器，`K` 决定聚合类型
pub struct MovementCommandHandler<K: MovementKind> {
    event_store: Arc<dyn EventStore>,
    root: AggregateRoot<Movement<K>, EventSourcedRepository<Movement<K>>>,
}

impl<K: MovementKind> MovementCommandHandler<K> {
    pub fn new(event_store: Arc<dyn EventStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            root: AggregateRoot::new(EventSourcedRepository::new(event_store.clone()), publisher),
            event_store,
        }
    }

    async fn load_existing(&self, ctx: &AppContext, id: &str) -> Result<Movement<K>, AppError> {
        self.root
            .load(&ctx.call, id)
            .await?
            .ok_or_else(|| AppError::AggregateNotFound(format!("{} {id}", K::TYPE)))
    }
}

#[async_trait]
impl<K> CommandHandler<CreateMovement<K>> for MovementCommandHandler<K>
where
    K: MovementKind,
    CreateMovement<K>: Command<Output = String>,
{
    async fn handle(&self, ctx: &AppContext, cmd: CreateMovement<K>) -> Result<String, AppError> {
        cmd.input.validate()?;

        let id = claim_id(self.event_store.as_ref(), ctx, cmd.id).await?;
        let mut movement = Movement::<K>::record(id.clone(), cmd.input.into_details())?;

        self.root.commit(&ctx.call, &mut movement).await?;
        tracing::info!(movement_id = %id, movement_type = %K::LABEL.as_str(), "movement recorded");

        Ok(id)
    }
}

#[async_trait]
impl<K> CommandHandler<UpdateMovement<K>> for MovementCommandHandler<K>
where
    K: MovementKind,
    UpdateMovement<K>: Command<Output = ()>,
{
    async fn handle(&self, ctx: &AppContext, cmd: UpdateMovement<K>) -> Result<(), AppError> {
        cmd.input.validate()?;

        let mut movement = self.load_existing(ctx, &cmd.id).await?;
        movement.update(cmd.input.into_details())?;

        self.root.commit(&ctx.call, &mut movement).await?;
        tracing::info!(movement_id = %cmd.id, movement_type = %K::LABEL.as_str(), "movement updated");

        Ok(())
    }
}

#[async_trait]
impl<K> CommandHandler<DeleteMovement<K>> for MovementCommandHandler<K>
where
    K: MovementKind,
    DeleteMovement<K>: Command<Output = ()>,
{
    async fn handle(&self, ctx: &AppContext, cmd: DeleteMovement<K>) -> Result<(), AppError> {
        let mut movement = self.load_existing(ctx, &cmd.id).await?;
        movement.delete();

        self.root.commit(&ctx.call, &mut movement).await?;
        tracing::info!(movement_id = %cmd.id, movement_type = %K::LABEL.as_str(), "movement deleted");

        Ok(())
    }
}
