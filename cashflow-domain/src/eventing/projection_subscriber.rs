use super::{EventSubscriber, HandledEventType};
use crate::{
    context::CallContext, error::DomainResult, persist::StoredEvent,
    projection::ProjectionEngine,
};
use async_trait::async_trait;

/// 将已发布事件转交投影引擎
#[derive(Clone)]
pub struct ProjectionSubscriber {
    engine: ProjectionEngine,
}

impl ProjectionSubscriber {
    pub fn new(engine: ProjectionEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EventSubscriber for ProjectionSubscriber {
    fn subscriber_name(&self) -> &str {
        "projection"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::All
    }

    async fn handle(&self, ctx: &CallContext, event: &StoredEvent) -> DomainResult<()> {
        self.engine.process_event(ctx, event).await
    }
}
