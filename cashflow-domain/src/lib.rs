//! 收支账本领域层（cashflow-domain）
//!
//! 以事件溯源 + CQRS 实现收支记录的核心：
//! - 领域事件（`domain_event`）与松散载荷文档的双命名约定编解码；
//! - 聚合（`aggregate`）：分类（`category`）与收支（`movement`）；
//! - 事件日志与回放仓储（`persist`），提供内存与 SQLite 实现；
//! - 事件发布与订阅（`eventing`）；
//! - 可重建的读模型（`projection`）。
//!
//! 所有触达存储的操作都接收调用上下文（`context::CallContext`），
//! 由调用方控制取消与超时。
//!
//! 典型用法：
//! 1. 通过聚合的构造/变更方法产生未提交事件；
//! 2. 使用 `AggregateRoot` 保存事件并发布；
//! 3. 由 `ProjectionSubscriber` 将事件同步到投影，供查询读取。
//!
pub mod aggregate;
pub mod aggregate_root;
pub mod category;
pub mod context;
pub mod domain_event;
pub mod error;
pub mod eventing;
pub mod movement;
pub mod persist;
pub mod projection;
#[cfg(feature = "infra-sqlx")]
pub mod sqlite;
