//! 事件 Schema 目录与载荷校验
//!
//! 按 (事件类型, 版本) 登记字段声明；校验需显式调用，事件总线不会隐式执行。

mod event_schema;
mod registry;

pub use event_schema::{EventSchema, FieldSchema, FieldType};
pub use registry::SchemaRegistry;
