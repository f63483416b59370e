//! 领域事件（Event）与元数据
//!
//! `Event` 是生产者构造的不可变事实记录；载荷保持开放（JSON），
//! 是否符合 Schema 由 `schema` 模块显式校验，分发路径不做隐式检查。

mod event;
mod metadata;

pub use event::Event;
pub use metadata::Metadata;
