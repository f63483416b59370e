use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 字段声明类型（仅用于描述，校验时不检查）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// 某事件类型在某版本下的字段形状
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSchema {
    version: usize,
    fields: BTreeMap<String, FieldSchema>,
}

impl EventSchema {
    pub fn new(version: usize) -> Self {
        Self {
            version,
            fields: BTreeMap::new(),
        }
    }

    pub fn required(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        self.field(name, field_type, true, description)
    }

    pub fn optional(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        self.field(name, field_type, false, description)
    }

    fn field(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldSchema {
                field_type,
                required,
                description: description.into(),
            },
        );
        self
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldSchema> {
        &self.fields
    }

    /// 必填字段名，按名称排序
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, f)| f.required)
            .map(|(name, _)| name.as_str())
    }
}
