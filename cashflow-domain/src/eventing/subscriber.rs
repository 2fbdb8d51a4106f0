//! 事件订阅者（EventSubscriber）
//!
//! 定义消费某类/多类/全部事件的处理逻辑与元信息（名称、订阅类型），
//! 以及按事件类型匹配订阅者的注册表。
//!
use crate::{
    context::CallContext, domain_event::EventKind, error::DomainResult, persist::StoredEvent,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub enum HandledEventType {
    One(EventKind),
    Many(Vec<EventKind>),
    All,
}

/// 事件订阅者：处理已提交的事件
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// 订阅者名称（用于日志）
    fn subscriber_name(&self) -> &str;
    /// 返回该订阅者关心的事件类型
    fn handled_event_type(&self) -> HandledEventType;
    /// 处理事件
    async fn handle(&self, ctx: &CallContext, event: &StoredEvent) -> DomainResult<()>;
}

#[derive(Clone, Default)]
pub(crate) struct SubscriberRegistry {
    by_kind: HashMap<EventKind, Vec<Arc<dyn EventSubscriber>>>,
    all: Vec<Arc<dyn EventSubscriber>>,
    count: usize,
}

impl SubscriberRegistry {
    pub(crate) fn new(subscribers: Vec<Arc<dyn EventSubscriber>>) -> Self {
        let mut registry = Self::default();

        registry.count = subscribers.len();
        for s in subscribers {
            match s.handled_event_type() {
                HandledEventType::All => registry.all.push(s),
                HandledEventType::One(kind) => {
                    registry.by_kind.entry(kind).or_default().push(s);
                }
                HandledEventType::Many(kinds) => {
                    for kind in kinds {
                        registry.by_kind.entry(kind).or_default().push(s.clone());
                    }
                }
            }
        }

        registry
    }

    pub(crate) fn matching(&self, kind: EventKind) -> Vec<Arc<dyn EventSubscriber>> {
        let mut merged: Vec<Arc<dyn EventSubscriber>> = Vec::new();
        if let Some(list) = self.by_kind.get(&kind) {
            merged.extend(list.iter().cloned());
        }
        merged.extend(self.all.iter().cloned());
        merged
    }

    /// 注册的订阅者数量（`Many` 订阅者只计一次）
    pub(crate) fn len(&self) -> usize {
        self.count
    }
}
