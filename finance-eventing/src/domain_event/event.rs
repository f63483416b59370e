use super::metadata::Metadata;
use crate::error::{EventingError, EventingResult};
use bon::bon;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 领域事件：记录某个聚合上已发生的事实，构造后不可变
///
/// 反序列化（例如从事件存储读回）与构造器执行相同的校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredEvent")]
pub struct Event {
    /// 事件唯一标识符
    id: String,
    /// 事件类型，作为订阅与 Schema 的路由键
    event_type: String,
    /// 所属聚合 ID
    aggregate_id: String,
    /// 所属聚合类型
    aggregate_type: String,
    /// 载荷版本，由生产者指定，用于校验与上抬
    version: usize,
    /// 事件发生时间
    occurred_at: DateTime<Utc>,
    /// 附加元数据（关联 ID、操作者等）
    metadata: Metadata,
    /// 事件负载
    payload: Value,
}

#[bon]
impl Event {
    #[builder]
    pub fn new(
        #[builder(into)] id: Option<String>,
        #[builder(into)] event_type: String,
        #[builder(into)] aggregate_id: String,
        #[builder(into)] aggregate_type: String,
        #[builder(default = 1)] version: usize,
        #[builder(default = Utc::now())] occurred_at: DateTime<Utc>,
        #[builder(default)] metadata: Metadata,
        payload: Value,
    ) -> EventingResult<Self> {
        check_header(&event_type, version)?;

        Ok(Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            event_type,
            aggregate_id,
            aggregate_type,
            version,
            occurred_at,
            metadata,
            payload,
        })
    }
}

fn check_header(event_type: &str, version: usize) -> EventingResult<()> {
    if event_type.trim().is_empty() {
        return Err(EventingError::invalid_event("event type must not be empty"));
    }
    if version == 0 {
        return Err(EventingError::invalid_event(format!(
            "version of `{event_type}` must be positive"
        )));
    }
    Ok(())
}

/// 存储侧的原始形态，转换为 `Event` 前需通过校验
#[derive(Deserialize)]
struct StoredEvent {
    id: String,
    event_type: String,
    aggregate_id: String,
    aggregate_type: String,
    version: usize,
    occurred_at: DateTime<Utc>,
    #[serde(default)]
    metadata: Metadata,
    payload: Value,
}

impl TryFrom<StoredEvent> for Event {
    type Error = EventingError;

    fn try_from(raw: StoredEvent) -> EventingResult<Self> {
        if raw.id.is_empty() {
            return Err(EventingError::invalid_event(format!(
                "stored `{}` event has an empty id",
                raw.event_type
            )));
        }
        check_header(&raw.event_type, raw.version)?;

        Ok(Self {
            id: raw.id,
            event_type: raw.event_type,
            aggregate_id: raw.aggregate_id,
            aggregate_type: raw.aggregate_type,
            version: raw.version,
            occurred_at: raw.occurred_at,
            metadata: raw.metadata,
            payload: raw.payload,
        })
    }
}

impl Event {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 将载荷反序列化为具体类型
    pub fn payload_as<T: DeserializeOwned>(&self) -> EventingResult<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    /// 生成同类型的新版本事件，保留标识、聚合引用、发生时间与元数据
    pub fn upgraded(&self, version: usize, payload: Value) -> Event {
        self.upgraded_as(self.event_type.clone(), version, payload)
    }

    /// 生成新版本事件，并允许在升级时更名事件类型
    pub fn upgraded_as(&self, event_type: impl Into<String>, version: usize, payload: Value) -> Event {
        Event {
            id: self.id.clone(),
            event_type: event_type.into(),
            aggregate_id: self.aggregate_id.clone(),
            aggregate_type: self.aggregate_type.clone(),
            version,
            occurred_at: self.occurred_at,
            metadata: self.metadata.clone(),
            payload,
        }
    }
}
