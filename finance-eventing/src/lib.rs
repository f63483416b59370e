//! 个人理财后端的事件通知核心（finance-eventing）
//!
//! 资产、组合、交易与成就等服务通过本 crate 在进程内交换领域事件：
//! - 事件模型（`domain_event`）：不可变的 `Event` 与元数据；
//! - Schema 目录（`schema`）：按类型与版本登记字段，显式校验载荷；
//! - 事件上抬（`event_upgrader`）：逐版本转换旧事件到最新形态；
//! - 事件分发（`eventing`）：同步总线、解耦订阅者与重试装饰器；
//! - 事件存储协议（`persist`）：由外部实现的保存/加载接口。
//!
//! 本 crate 不提供持久化格式、跨进程传输或恰好一次语义。
//!
//! 典型用法：
//! 1. 启动时注册 Schema 与升级函数，并向总线/订阅者注册处理器；
//! 2. 生产者构造 `Event`，按需校验、升级后发布；
//! 3. 对可能瞬时失败的处理器用 `RetryableHandler` 包装后再注册；
//! 4. 关闭时调用 `close`/`stop` 并清理注册表。
//!
pub mod domain_event;
pub mod error;
pub mod event_upgrader;
#[cfg(feature = "eventing")]
pub mod eventing;
pub mod persist;
pub mod schema;

pub use domain_event::{Event, Metadata};
pub use error::{EventingError, EventingResult};
