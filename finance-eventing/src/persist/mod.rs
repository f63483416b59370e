//! 事件存储协议（persist）
//!
//! 仅定义外部事件存储需满足的保存/加载接口，以及读取后统一上抬的扩展方法；
//! 具体存储后端与编码格式由上层提供并注入。
//!
mod event_store;

pub use event_store::{EventStore, EventStoreExt};
