use std::collections::BTreeMap;

use opentelemetry::KeyValue;
use serde::Serialize;

/// Scalar value of a log property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Structured context attached to a log record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object form, as carried on the `properties` event field.
    pub(crate) fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Tags on a metric data point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub(crate) fn to_key_values(&self) -> Vec<KeyValue> {
        self.0
            .iter()
            .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
            .collect()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Labels
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Labels
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

    #[test]
    fn properties_serialize_as_flat_json_object() {
        let props = Properties::new()
            .with("version", "1.0.0")
            .with("issues_count", 5)
            .with("success_rate", 0.667)
            .with("cached", false);

        let json: serde_json::Value = serde_json::from_str(&props.to_json()).unwrap();

        assert_eq!(json["version"], "1.0.0");
        assert_eq!(json["issues_count"], 5);
        assert_eq!(json["success_rate"], 0.667);
        assert_eq!(json["cached"], false);
    }

    #[test]
    fn properties_from_iterator() {
        let props: Properties = [("user_id", "user123"), ("auth_method", "oauth2")]
            .into_iter()
            .collect();

        assert_eq!(props.len(), 2);
        assert_eq!(props.get("user_id"), Some(&PropertyValue::from("user123")));
    }

    #[test]
    fn non_finite_float_serializes_as_null() {
        let props = Properties::new().with("ratio", f64::NAN);

        assert_eq!(props.to_json(), r#"{"ratio":null}"#);
    }

    #[test]
    fn labels_convert_to_key_values() {
        let labels = Labels::from([("operation", "authentication")]);

        assert_eq!(
            labels.to_key_values(),
            vec![KeyValue::new("operation", "authentication")]
        );
    }

    #[test]
    fn empty_labels_have_no_key_values() {
        assert!(Labels::new().to_key_values().is_empty());
    }
}
