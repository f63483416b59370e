//! 事件分发子系统（eventing）
//!
//! 提供进程内发布/订阅与处理的基础抽象与运行时：
//! - `EventHandler`：对事件进行消费处理；
//! - `EventBus` / `InMemoryEventBus`：同步扇出，FailFast（默认）或 BestEffort；
//! - `EventSubscriber`：有界队列 + 后台循环的异步扇出，满队列时丢弃；
//! - `RetryableHandler`：为任意处理器叠加指数退避重试，可被取消；
//! - `DispatchContext`：贯穿分发与重试的取消/截止信号。
//!
//! 总线与订阅者各自持有独立的处理器注册表，生命周期随实例而定，
//! 不存在进程级单例。
//!
mod bus;
mod bus_inmemory;
mod context;
mod handler;
mod registry;
mod retry;
mod subscriber;

pub use bus::EventBus;
pub use bus_inmemory::{DeliveryPolicy, EventBusConfig, InMemoryEventBus};
pub use context::DispatchContext;
pub use handler::EventHandler;
pub use registry::HandlerRegistry;
pub use retry::{RetryClassifier, RetryPolicy, RetryableHandler};
pub use subscriber::{EventSubscriber, SubscriberConfig};
