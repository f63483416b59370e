use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 事件元数据：键值对，允许为空但不会缺失
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    pub const CORRELATION_ID: &'static str = "correlation_id";
    pub const CAUSATION_ID: &'static str = "causation_id";
    pub const ACTOR_ID: &'static str = "actor_id";

    pub fn new() -> Self {
        Self::default()
    }

    /// 链式写入，便于在构造事件时使用
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.get(Self::CORRELATION_ID)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_as_flat_map() {
        let md = Metadata::new()
            .with(Metadata::CORRELATION_ID, "req-1")
            .with(Metadata::ACTOR_ID, "user-7");
        assert_eq!(
            serde_json::to_value(&md).unwrap(),
            json!({"actor_id": "user-7", "correlation_id": "req-1"})
        );
        assert_eq!(md.correlation_id(), Some("req-1"));
    }

    #[test]
    fn insert_overwrites_and_returns_previous() {
        let mut md: Metadata = [("source", "import")].into_iter().collect();
        assert_eq!(md.insert("source", "api"), Some("import".to_string()));
        assert_eq!(md.get("source"), Some("api"));
        assert_eq!(md.len(), 1);
        assert!(Metadata::new().is_empty());
    }
}
