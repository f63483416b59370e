use crate::domain_event::Event;
use crate::error::EventingResult as Result;
use crate::event_upgrader::EventUpgrader;
use async_trait::async_trait;

/// 事件存储：由基础设施层实现，按聚合追加与读取事件
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 追加属于同一聚合的事件
    async fn save(&self, events: &[Event], aggregate_id: &str) -> Result<()>;

    /// 按写入顺序读取聚合的全部事件
    async fn load(&self, aggregate_id: &str) -> Result<Vec<Event>>;
}

#[async_trait]
pub trait EventStoreExt: EventStore {
    /// 读取并将每个事件升级到最新版本
    async fn load_upgraded(
        &self,
        aggregate_id: &str,
        upgrader: &EventUpgrader,
    ) -> Result<Vec<Event>> {
        let events = self.load(aggregate_id).await?;
        upgrader.upgrade_all(events)
    }
}

impl<T> EventStoreExt for T where T: EventStore + ?Sized {}
