//! 事件子系统（eventing）
//!
//! 提供已提交事件的发布与订阅：
//! - `EventSubscriber`：对事件进行消费处理，按类型注册；
//! - `EventPublisher`：写路径提交后的发布协议；
//! - `InProcessEventPublisher`：进程内实现，附带实时事件流；
//! - `ProjectionSubscriber`：驱动投影引擎的订阅者。
//!
pub mod projection_subscriber;
pub mod publisher;
pub mod subscriber;

pub use projection_subscriber::ProjectionSubscriber;
pub use publisher::{DEFAULT_FEED_CAPACITY, EventPublisher, InProcessEventPublisher};
pub use subscriber::{EventSubscriber, HandledEventType};
