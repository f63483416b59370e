//! 事件处理器（EventHandler）
//!
//! 定义消费事件的单一能力：稳定的处理器名称（作为订阅键）与 `handle`。
//!
use super::DispatchContext;
use crate::domain_event::Event;
use crate::error::EventingResult as Result;
use async_trait::async_trait;
use std::sync::Arc;

/// 事件处理器：处理某一类或多类事件
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// 处理器名称（订阅键，用于去重、注销与审计）
    fn handler_name(&self) -> &str;

    /// 处理事件
    async fn handle(&self, ctx: &DispatchContext, event: &Event) -> Result<()>;
}

#[async_trait]
impl<T> EventHandler for Arc<T>
where
    T: EventHandler + ?Sized,
{
    fn handler_name(&self) -> &str {
        (**self).handler_name()
    }

    async fn handle(&self, ctx: &DispatchContext, event: &Event) -> Result<()> {
        (**self).handle(ctx, event).await
    }
}
