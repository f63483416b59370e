//! 内存版事件总线（InMemoryEventBus）
//!
//! 进程内同步扇出实现，满足 `EventBus` 协议：
//! - `publish`：在读锁下取处理器快照，释放锁后按注册顺序依次调用；
//! - 投递策略按实例选择：`FailFast`（默认，返回第一个处理器错误）
//!   或 `BestEffort`（调用全部处理器，失败仅记录日志）；
//! - `close`：进入终止状态，丢弃全部注册，不可恢复。
//!
//! 需要保证送达的生产者应使用本总线，而不是非阻塞的 `EventSubscriber`。

use super::{DispatchContext, EventBus, EventHandler, HandlerRegistry};
use crate::domain_event::Event;
use crate::error::{EventingError, EventingResult as Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 单次发布遇到处理器失败时的策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// 返回第一个处理器错误，后续处理器不再调用
    #[default]
    FailFast,
    /// 调用全部处理器，忽略单个失败，发布总是成功
    BestEffort,
}

/// 事件总线配置
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct EventBusConfig {
    #[serde(default)]
    pub delivery: DeliveryPolicy,
}

enum BusState {
    Open(HandlerRegistry),
    Closed,
}

pub struct InMemoryEventBus {
    state: RwLock<BusState>,
    config: EventBusConfig,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::with_config(EventBusConfig::default())
    }
}

impl InMemoryEventBus {
    /// 创建默认（FailFast）总线
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建 BestEffort 总线
    pub fn best_effort() -> Self {
        Self::with_config(EventBusConfig {
            delivery: DeliveryPolicy::BestEffort,
        })
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            state: RwLock::new(BusState::Open(HandlerRegistry::new())),
            config,
        }
    }

    pub fn delivery(&self) -> DeliveryPolicy {
        self.config.delivery
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.read(), BusState::Closed)
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        match &*self.state.read() {
            BusState::Open(registry) => registry.handler_count(event_type),
            BusState::Closed => 0,
        }
    }

    fn snapshot(&self, event_type: &str) -> Result<Vec<Arc<dyn EventHandler>>> {
        match &*self.state.read() {
            BusState::Open(registry) => Ok(registry.matching(event_type)),
            BusState::Closed => Err(EventingError::bus_closed(event_type)),
        }
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    fn register(&self, event_type: &str, handler: Arc<dyn EventHandler>) -> Result<()> {
        let mut state = self.state.write();
        let BusState::Open(registry) = &mut *state else {
            return Err(EventingError::bus_closed(event_type));
        };
        let name = handler.handler_name().to_string();
        if registry.register(event_type, handler) {
            debug!(event_type, handler = %name, "handler registered");
        }
        Ok(())
    }

    fn unregister(&self, event_type: &str, handler_name: &str) -> Result<()> {
        let mut state = self.state.write();
        let BusState::Open(registry) = &mut *state else {
            return Err(EventingError::bus_closed(event_type));
        };
        if registry.unregister(event_type, handler_name) {
            debug!(event_type, handler = handler_name, "handler unregistered");
        }
        Ok(())
    }

    async fn publish(&self, ctx: &DispatchContext, event: &Event) -> Result<()> {
        let handlers = self.snapshot(event.event_type())?;
        if handlers.is_empty() {
            debug!(event_type = event.event_type(), "no handler registered");
            return Ok(());
        }

        let mut failed = 0usize;
        for handler in &handlers {
            if let Err(err) = handler.handle(ctx, event).await {
                warn!(
                    event_type = event.event_type(),
                    event_id = event.id(),
                    handler = handler.handler_name(),
                    error = %err,
                    "event handler failed"
                );
                match self.config.delivery {
                    DeliveryPolicy::FailFast => return Err(err),
                    DeliveryPolicy::BestEffort => failed += 1,
                }
            }
        }

        debug!(
            event_type = event.event_type(),
            handlers = handlers.len(),
            failed,
            "event published"
        );
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state.write();
        if matches!(*state, BusState::Open(_)) {
            *state = BusState::Closed;
            info!("event bus closed");
        }
    }
}
