//! 组合根（Ledger）
//!
//! 按配置装配存储、投影引擎、发布者、命令处理器与两条查询总线：
//! - `query`：读取投影存储；
//! - `replay_query`：每次从完整日志重放作答。
//!
use crate::{
    command::Command,
    command_bus::CommandBus,
    command_handlers::{CategoryCommandHandler, MovementCommandHandler},
    commands::{
        CreateCategory, CreateExpense, CreateIncome, DeleteExpense, DeleteIncome, UpdateExpense,
        UpdateIncome,
    },
    config::{AppConfig, StorageConfig},
    context::AppContext,
    error::AppError,
    inmemory_command_bus::InMemoryCommandBus,
    inmemory_query_bus::InMemoryQueryBus,
    queries::{
        GetBalance, GetCategories, GetCategoryById, GetExpensesByCategory, GetMovementById,
        GetMovements, GetPaginatedMovements,
    },
    query::Query,
    query_bus::QueryBus,
    query_handler::QueryHandler,
    query_handlers::{ProjectionQueryHandler, ReplayQueryHandler},
};
use cashflow_domain::{
    domain_event::AggregateType,
    error::DomainResult,
    eventing::{EventSubscriber, InProcessEventPublisher, ProjectionSubscriber},
    movement::{ExpenseKind, IncomeKind},
    persist::{EventStore, InMemoryEventStore, StoredEvent},
    projection::{InMemoryProjectionStore, ProjectionEngine, ProjectionStore, RebuildReport},
};
use futures_util::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;

pub struct Ledger {
    event_store: Arc<dyn EventStore>,
    projections: Arc<dyn ProjectionStore>,
    engine: ProjectionEngine,
    publisher: Arc<InProcessEventPublisher>,
    commands: InMemoryCommandBus,
    queries: InMemoryQueryBus,
    replay_queries: InMemoryQueryBus,
    operation_timeout: Option<Duration>,
}

impl Ledger {
    /// 按配置选择存储后端并装配
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let (event_store, projections): (Arc<dyn EventStore>, Arc<dyn ProjectionStore>) =
            match &config.storage {
                StorageConfig::Memory => (
                    Arc::new(InMemoryEventStore::new()),
                    Arc::new(InMemoryProjectionStore::new()),
                ),
                StorageConfig::Sqlite { url } => sqlite_stores(url).await?,
            };

        tracing::info!(storage = ?config.storage, "ledger storage ready");

        let mut ledger = Self::with_stores(event_store, projections, config.publisher.feed_capacity)?;
        ledger.operation_timeout = config.operation_timeout();
        Ok(ledger)
    }

    /// 纯内存账本（测试与演示）
    pub fn in_memory() -> Result<Self, AppError> {
        Self::with_stores(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryProjectionStore::new()),
            cashflow_domain::eventing::DEFAULT_FEED_CAPACITY,
        )
    }

    pub fn with_stores(
        event_store: Arc<dyn EventStore>,
        projections: Arc<dyn ProjectionStore>,
        feed_capacity: usize,
    ) -> Result<Self, AppError> {
        let engine = ProjectionEngine::new(projections.clone());
        let subscribers: Vec<Arc<dyn EventSubscriber>> =
            vec![Arc::new(ProjectionSubscriber::new(engine.clone()))];
        let publisher = Arc::new(
            InProcessEventPublisher::builder()
                .subscribers(subscribers)
                .feed_capacity(feed_capacity)
                .build(),
        );

        let commands = InMemoryCommandBus::new();
        let categories = Arc::new(CategoryCommandHandler::new(
            event_store.clone(),
            publisher.clone(),
        ));
        let expenses = Arc::new(MovementCommandHandler::<ExpenseKind>::new(
            event_store.clone(),
            publisher.clone(),
        ));
        let incomes = Arc::new(MovementCommandHandler::<IncomeKind>::new(
            event_store.clone(),
            publisher.clone(),
        ));
        commands.register::<CreateCategory, _>(categories)?;
        commands.register::<CreateExpense, _>(expenses.clone())?;
        commands.register::<UpdateExpense, _>(expenses.clone())?;
        commands.register::<DeleteExpense, _>(expenses)?;
        commands.register::<CreateIncome, _>(incomes.clone())?;
        commands.register::<UpdateIncome, _>(incomes.clone())?;
        commands.register::<DeleteIncome, _>(incomes)?;

        let queries = InMemoryQueryBus::new();
        register_queries(&queries, Arc::new(ProjectionQueryHandler::new(projections.clone())))?;

        let replay_queries = InMemoryQueryBus::new();
        register_queries(
            &replay_queries,
            Arc::new(ReplayQueryHandler::new(event_store.clone())),
        )?;

        Ok(Self {
            event_store,
            projections,
            engine,
            publisher,
            commands,
            queries,
            replay_queries,
            operation_timeout: None,
        })
    }

    /// 新的调用上下文，带上配置的超时
    pub fn context(&self) -> AppContext {
        let ctx = AppContext::new().with_request_id(uuid::Uuid::new_v4().to_string());
        match self.operation_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    pub async fn dispatch<C: Command>(&self, ctx: &AppContext, cmd: C) -> Result<C::Output, AppError> {
        self.commands.dispatch(ctx, cmd).await
    }

    /// 从投影读取
    pub async fn query<Q: Query>(&self, ctx: &AppContext, q: Q) -> Result<Q::Dto, AppError> {
        self.queries.dispatch(ctx, q).await
    }

    /// 从完整日志重放后读取
    pub async fn replay_query<Q: Query>(&self, ctx: &AppContext, q: Q) -> Result<Q::Dto, AppError> {
        self.replay_queries.dispatch(ctx, q).await
    }

    /// 清空并由日志重建投影
    pub async fn rebuild_projections(&self, ctx: &AppContext) -> Result<RebuildReport, AppError> {
        Ok(self
            .engine
            .rebuild(&ctx.call, self.event_store.as_ref(), true)
            .await?)
    }

    /// 已发布事件的实时流
    pub fn subscribe(&self) -> BoxStream<'static, DomainResult<StoredEvent>> {
        self.publisher.subscribe()
    }

    /// 某个聚合的完整事件流（审计）
    pub async fn history(
        &self,
        ctx: &AppContext,
        aggregate_type: AggregateType,
        aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, AppError> {
        let events = self.event_store.load(&ctx.call, aggregate_id).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.aggregate_type() == aggregate_type.as_str())
            .collect())
    }

    pub fn event_store(&self) -> &Arc<dyn EventStore> {
        &self.event_store
    }

    pub fn projections(&self) -> &Arc<dyn ProjectionStore> {
        &self.projections
    }
}

fn register_queries<H>(bus: &InMemoryQueryBus, handler: Arc<H>) -> Result<(), AppError>
where
    H: QueryHandler<GetMovements>
        + QueryHandler<GetPaginatedMovements>
        + QueryHandler<GetBalance>
        + QueryHandler<GetExpensesByCategory>
        + QueryHandler<GetCategories>
        + QueryHandler<GetMovementById>
        + QueryHandler<GetCategoryById>
        + 'static,
{
    bus.register::<GetMovements, _>(handler.clone())?;
    bus.register::<GetPaginatedMovements, _>(handler.clone())?;
    bus.register::<GetBalance, _>(handler.clone())?;
    bus.register::<GetExpensesByCategory, _>(handler.clone())?;
    bus.register::<GetCategories, _>(handler.clone())?;
    bus.register::<GetMovementById, _>(handler.clone())?;
    bus.register::<GetCategoryById, _>(handler)?;
    Ok(())
}

#[cfg(feature = "infra-sqlx")]
async fn sqlite_stores(
    url: &str,
) -> Result<(Arc<dyn EventStore>, Arc<dyn ProjectionStore>), AppError> {
    use cashflow_domain::persist::SqliteEventStore;
    use cashflow_domain::projection::SqliteProjectionStore;

    let pool = cashflow_domain::sqlite::connect(url).await?;
    let event_store = SqliteEventStore::new(pool.clone()).await?;
    let projections = SqliteProjectionStore::new(pool).await?;
    Ok((Arc::new(event_store), Arc::new(projections)))
}

#[cfg(not(feature = "infra-sqlx"))]
async fn sqlite_stores(
    url: &str,
) -> Result<(Arc<dyn EventStore>, Arc<dyn ProjectionStore>), AppError> {
    Err(AppError::Config(format!(
        "sqlite storage {url:?} requires the `infra-sqlx` feature"
    )))
}
