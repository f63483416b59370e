use super::EventSchema;
use crate::domain_event::Event;
use crate::error::{EventingError, EventingResult as Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Schema 注册表：按 (事件类型, 版本) 登记字段形状，并对事件载荷做必填校验
///
/// 校验策略是宽松的：只检查必填字段是否存在，可选字段与未声明字段一律放行。
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, BTreeMap<usize, EventSchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 Schema；同一 (类型, 版本) 重复注册返回 `SchemaAlreadyExists`
    pub fn register_schema(&self, event_type: impl Into<String>, schema: EventSchema) -> Result<()> {
        let event_type = event_type.into();
        let version = schema.version();

        let mut schemas = self.schemas.write();
        let versions = schemas.entry(event_type.clone()).or_default();
        if versions.contains_key(&version) {
            return Err(EventingError::SchemaAlreadyExists {
                event_type,
                version,
            });
        }
        versions.insert(version, schema);
        debug!(event_type = %event_type, version, "schema registered");

        Ok(())
    }

    pub fn get_schema(&self, event_type: &str, version: usize) -> Result<EventSchema> {
        self.schemas
            .read()
            .get(event_type)
            .and_then(|versions| versions.get(&version))
            .cloned()
            .ok_or_else(|| EventingError::SchemaNotFound {
                event_type: event_type.to_string(),
                version,
            })
    }

    /// 校验事件载荷是否满足其声明版本的 Schema
    pub fn validate_event(&self, event: &Event) -> Result<()> {
        let schema = self.get_schema(event.event_type(), event.version())?;

        let Some(fields) = event.payload().as_object() else {
            return Err(EventingError::InvalidPayload {
                event_type: event.event_type().to_string(),
                version: event.version(),
                reason: "payload is not an object".to_string(),
            });
        };

        if let Some(missing) = schema.required_fields().find(|name| !fields.contains_key(*name)) {
            return Err(EventingError::MissingField {
                event_type: event.event_type().to_string(),
                version: event.version(),
                field: missing.to_string(),
            });
        }

        Ok(())
    }

    /// 已注册的版本，升序
    pub fn versions(&self, event_type: &str) -> Vec<usize> {
        self.schemas
            .read()
            .get(event_type)
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn latest_version(&self, event_type: &str) -> Option<usize> {
        self.schemas
            .read()
            .get(event_type)
            .and_then(|versions| versions.keys().next_back().copied())
    }

    pub fn clear(&self) {
        self.schemas.write().clear();
    }
}
