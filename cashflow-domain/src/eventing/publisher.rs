//! 事件发布（EventPublisher）
//!
//! 写路径提交成功后调用 `publish`：
//! - 按给定顺序逐个投递事件，同一事件的多个订阅者并发执行；
//! - 订阅者失败只记录日志，不向调用方传播（写路径已提交，不可回滚）；
//! - 同时广播到实时事件流，无订阅者时发送被忽略。
//!
use super::subscriber::{EventSubscriber, SubscriberRegistry};
use crate::{
    context::CallContext,
    domain_event::DomainEvent,
    error::{DomainError, DomainResult},
    persist::StoredEvent,
};
use async_trait::async_trait;
use bon::bon;
use futures_core::stream::BoxStream;
use futures_util::{StreamExt, stream};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, ctx: &CallContext, events: &[DomainEvent]) -> DomainResult<()>;
}

#[async_trait]
impl<T> EventPublisher for Arc<T>
where
    T: EventPublisher + ?Sized,
{
    async fn publish(&self, ctx: &CallContext, events: &[DomainEvent]) -> DomainResult<()> {
        (**self).publish(ctx, events).await
    }
}

/// 进程内发布者
pub struct InProcessEventPublisher {
    registry: SubscriberRegistry,
    feed: broadcast::Sender<StoredEvent>,
}

#[bon]
impl InProcessEventPublisher {
    #[builder]
    pub fn new(
        #[builder(default)] subscribers: Vec<Arc<dyn EventSubscriber>>,
        #[builder(default = DEFAULT_FEED_CAPACITY)] feed_capacity: usize,
    ) -> Self {
        let (feed, _rx) = broadcast::channel(feed_capacity.max(1));
        Self {
            registry: SubscriberRegistry::new(subscribers),
            feed,
        }
    }
}

impl InProcessEventPublisher {
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// 返回一个 'static 生命周期的实时事件流；落后过多时产生 `EventFeed` 错误项
    pub fn subscribe(&self) -> BoxStream<'static, DomainResult<StoredEvent>> {
        let rx = self.feed.subscribe();
        let stream =
            BroadcastStream::new(rx).map(|r| r.map_err(|e| DomainError::event_feed(e.to_string())));
        Box::pin(stream)
    }

    async fn deliver(&self, ctx: &CallContext, event: &StoredEvent) {
        let Ok(kind) = event.kind() else {
            return;
        };

        stream::iter(self.registry.matching(kind))
            .for_each_concurrent(None, |subscriber| async move {
                match subscriber.handle(ctx, event).await {
                    Ok(()) => {}
                    Err(err @ DomainError::ProjectionDivergence { .. }) => {
                        tracing::error!(
                            subscriber = subscriber.subscriber_name(),
                            event_type = event.event_type(),
                            aggregate_id = event.aggregate_id(),
                            error = %err,
                            "read model diverged from event log"
                        );
                    }
                    Err(err) => {
                        tracing::warn!(
                            subscriber = subscriber.subscriber_name(),
                            event_type = event.event_type(),
                            aggregate_id = event.aggregate_id(),
                            error = %err,
                            "subscriber failed"
                        );
                    }
                }
            })
            .await;
    }
}

#[async_trait]
impl EventPublisher for InProcessEventPublisher {
    async fn publish(&self, ctx: &CallContext, events: &[DomainEvent]) -> DomainResult<()> {
        for event in events {
            let stored =
                match StoredEvent::from_event(event.aggregate_id(), event.kind().aggregate_type(), event) {
                    Ok(stored) => stored,
                    Err(err) => {
                        tracing::warn!(event_type = %event.kind(), error = %err, "event not published");
                        continue;
                    }
                };

            self.deliver(ctx, &stored).await;
            // 无订阅者时 send 返回错误，这里视为非致命并忽略
            let _ = self.feed.send(stored);
        }

        tracing::debug!(count = events.len(), "events published");
        Ok(())
    }
}
