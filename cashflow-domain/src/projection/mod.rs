//! 读模型（projection）
//!
//! 由事件日志派生、可随时重建的反规范化视图：
//! - `MovementProjection`/`CategoryProjection` 及列表查询条件；
//! - `ProjectionStore` 协议及内存/SQLite 实现；
//! - `ProjectionEngine`：事件到读模型的同步与全量重建。
//!
mod engine;
mod inmemory_store;
mod model;
#[cfg(feature = "infra-sqlx")]
mod sqlite_store;
mod store;

pub use engine::{ProjectionEngine, RebuildReport};
pub use inmemory_store::InMemoryProjectionStore;
pub use model::{
    CategoryProjection, MovementChanges, MovementListQuery, MovementProjection, UNCATEGORIZED,
};
#[cfg(feature = "infra-sqlx")]
pub use sqlite_store::SqliteProjectionStore;
pub use store::ProjectionStore;
