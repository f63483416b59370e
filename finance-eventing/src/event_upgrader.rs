//! 事件上抬（Event Upgrading）
//!
//! 当事件载荷结构演进时，按 (事件类型, 起始版本) 注册单步转换函数，
//! `EventUpgrader` 在读取路径上反复查找并应用，直到当前版本不再有转换为止。
//! 每一步都必须严格提升版本号，否则视为链路配置错误并返回 `UpgradeNoProgress`，
//! 从而杜绝自环导致的死循环。
//!
use crate::domain_event::Event;
use crate::error::{EventingError, EventingResult as Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 单步升级函数：`Event(vN) -> Event(vN+k)`，要求为纯函数
pub type UpgradeFn = Arc<dyn Fn(Event) -> Result<Event> + Send + Sync>;

/// 事件升级器：维护升级函数目录并将旧事件规范化到最新版本
#[derive(Default)]
pub struct EventUpgrader {
    upgrades: RwLock<HashMap<(String, usize), UpgradeFn>>,
}

impl EventUpgrader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册升级链中的一步
    pub fn register_upgrade<F>(
        &self,
        event_type: impl Into<String>,
        from_version: usize,
        upgrade: F,
    ) -> Result<()>
    where
        F: Fn(Event) -> Result<Event> + Send + Sync + 'static,
    {
        let key = (event_type.into(), from_version);
        let mut upgrades = self.upgrades.write();
        if upgrades.contains_key(&key) {
            return Err(EventingError::UpgradeAlreadyRegistered {
                event_type: key.0,
                from_version,
            });
        }
        debug!(event_type = %key.0, from_version, "upgrade registered");
        upgrades.insert(key, Arc::new(upgrade));

        Ok(())
    }

    pub fn has_upgrade(&self, event_type: &str, version: usize) -> bool {
        self.upgrades
            .read()
            .contains_key(&(event_type.to_string(), version))
    }

    /// 将事件升级到最新版本；若不存在任何升级路径则原样返回
    pub fn upgrade_event(&self, mut event: Event) -> Result<Event> {
        while let Some(upgrade) = self.lookup(event.event_type(), event.version()) {
            let event_type = event.event_type().to_string();
            let from_version = event.version();

            let next = upgrade(event).map_err(|err| EventingError::UpgradeFailed {
                event_type: event_type.clone(),
                from_version,
                reason: err.to_string(),
            })?;

            if next.version() <= from_version {
                return Err(EventingError::UpgradeNoProgress {
                    event_type,
                    from_version,
                    to_version: next.version(),
                });
            }

            debug!(
                event_type = %event_type,
                from_version,
                to_version = next.version(),
                "event upgraded"
            );
            event = next;
        }

        Ok(event)
    }

    /// 批量升级，保持输入顺序
    pub fn upgrade_all(&self, events: Vec<Event>) -> Result<Vec<Event>> {
        events
            .into_iter()
            .map(|event| self.upgrade_event(event))
            .collect()
    }

    pub fn clear(&self) {
        self.upgrades.write().clear();
    }

    // 读锁只在查找期间持有，升级函数在锁外执行
    fn lookup(&self, event_type: &str, version: usize) -> Option<UpgradeFn> {
        self.upgrades
            .read()
            .get(&(event_type.to_string(), version))
            .cloned()
    }
}
