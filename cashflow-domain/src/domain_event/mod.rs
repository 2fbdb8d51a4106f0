//! 领域事件（Domain Event）
//!
//! 事件是唯一的事实来源：
//! - `DomainEvent`：封闭的事件枚举与强类型载荷；
//! - `EventKind`/`AggregateType`/`MovementType`：写入日志与投影的类型标签；
//! - `Payload`：跨越序列化边界的松散文档，带双命名约定兼容。

mod event;
mod kind;
mod payload;

pub use event::{CategoryCreated, DomainEvent, MovementDetails, MovementRecorded, MovementRemoved};
pub use kind::{AggregateType, EventKind, Lifecycle, MovementType};
pub use payload::{Payload, PayloadField, PayloadValue, fields, parse_timestamp};
