//! 事件总线（EventBus）协议
//!
//! 定义按事件类型注册处理器、同步扇出发布与关闭的统一抽象，
//! 服务层可依赖 `Arc<dyn EventBus>` 而不关心具体投递策略。
//!
use super::{DispatchContext, EventHandler};
use crate::domain_event::Event;
use crate::error::EventingResult as Result;
use async_trait::async_trait;
use std::sync::Arc;

/// 事件总线：负责登记处理器并将事件分发给对应类型的全部处理器
#[async_trait]
pub trait EventBus: Send + Sync {
    fn register(&self, event_type: &str, handler: Arc<dyn EventHandler>) -> Result<()>;

    fn unregister(&self, event_type: &str, handler_name: &str) -> Result<()>;

    async fn publish(&self, ctx: &DispatchContext, event: &Event) -> Result<()>;

    /// 按顺序逐个发布，遇到第一个错误即返回
    async fn publish_batch(&self, ctx: &DispatchContext, events: &[Event]) -> Result<()> {
        for event in events {
            self.publish(ctx, event).await?;
        }
        Ok(())
    }

    /// 关闭总线；之后的注册、注销与发布都返回 `BusClosed`
    fn close(&self);
}
