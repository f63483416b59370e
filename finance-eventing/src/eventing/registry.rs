use super::EventHandler;
use std::collections::HashMap;
use std::sync::Arc;

/// 按事件类型登记处理器，保持注册顺序
///
/// 本身不加锁，由总线/订阅者包在各自的读写锁里使用。
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    by_type: HashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 幂等注册：同一类型下同名处理器只保留首次注册的那一个
    pub fn register(&mut self, event_type: &str, handler: Arc<dyn EventHandler>) -> bool {
        let list = self.by_type.entry(event_type.to_string()).or_default();
        if list
            .iter()
            .any(|h| h.handler_name() == handler.handler_name())
        {
            return false;
        }
        list.push(handler);
        true
    }

    /// 幂等注销：未注册的类型或处理器直接忽略
    pub fn unregister(&mut self, event_type: &str, handler_name: &str) -> bool {
        let Some(list) = self.by_type.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| h.handler_name() != handler_name);
        let removed = list.len() != before;
        if list.is_empty() {
            self.by_type.remove(event_type);
        }
        removed
    }

    /// 当前快照：返回的列表与后续注册/注销互不影响
    pub fn matching(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        self.by_type.get(event_type).cloned().unwrap_or_default()
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.by_type.get(event_type).map_or(0, Vec::len)
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.by_type.clear();
    }
}
