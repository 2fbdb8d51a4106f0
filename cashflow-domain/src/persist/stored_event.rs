//! 事件持久化模型（StoredEvent）
//!
//! 定义事件在日志中的标准形态，以及与 `DomainEvent` 之间的批量转换。
//!
use crate::{
    domain_event::{AggregateType, DomainEvent, EventKind, Payload},
    error::DomainResult,
};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct StoredEvent {
    /// 日志分配的唯一标识；尚未写入日志（仅发布）的事件为 `None`
    event_id: Option<String>,
    /// 所属聚合 ID
    aggregate_id: String,
    /// 聚合类型标签（Category/Expense/Income）
    aggregate_type: String,
    /// 事件类型标签
    event_type: String,
    /// 松散类型的载荷文档
    payload: Payload,
    /// 事件发生时间（取自事件本身，而非写入时间）
    occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// 将领域事件编码为日志记录，标识由存储层随后分配
    pub fn from_event(
        aggregate_id: &str,
        aggregate_type: AggregateType,
        event: &DomainEvent,
    ) -> DomainResult<Self> {
        Ok(StoredEvent {
            event_id: None,
            aggregate_id: aggregate_id.to_string(),
            aggregate_type: aggregate_type.as_str().to_string(),
            event_type: event.kind().as_str().to_string(),
            payload: event.to_payload()?,
            occurred_at: event.occurred_at(),
        })
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// 解析事件类型标签；未知标签返回 `UnknownEventKind`
    pub fn kind(&self) -> DomainResult<EventKind> {
        self.event_type.parse()
    }

    pub fn to_event(&self) -> DomainResult<DomainEvent> {
        DomainEvent::from_payload(
            self.kind()?,
            &self.aggregate_id,
            &self.payload,
            self.occurred_at,
        )
    }
}

/// 批量编码，任一事件失败则整批失败
pub fn serialize_events(
    aggregate_id: &str,
    aggregate_type: AggregateType,
    events: &[DomainEvent],
) -> DomainResult<Vec<StoredEvent>> {
    events
        .iter()
        .map(|event| StoredEvent::from_event(aggregate_id, aggregate_type, event))
        .collect()
}

pub fn deserialize_events(events: &[StoredEvent]) -> DomainResult<Vec<DomainEvent>> {
    events.iter().map(StoredEvent::to_event).collect()
}
