//! 持久化与事件溯源（persist）
//!
//! - 事件日志协议（`EventStore`）及其内存/SQLite 实现；
//! - 日志记录形态（`StoredEvent`）与批量编解码；
//! - 基于回放的聚合仓储（`EventSourcedRepository`）。
//!
mod aggregate_repository;
mod event_store;
mod inmemory_event_store;
#[cfg(feature = "infra-sqlx")]
mod sqlite_event_store;
mod stored_event;

pub use aggregate_repository::{AggregateRepository, EventSourcedRepository};
pub use event_store::EventStore;
pub use inmemory_event_store::InMemoryEventStore;
#[cfg(feature = "infra-sqlx")]
pub use sqlite_event_store::SqliteEventStore;
pub use stored_event::{StoredEvent, deserialize_events, serialize_events};
