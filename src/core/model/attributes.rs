//! Attribute bags and styles
//!
//! Both are opaque to the store: they are cloned in and out of records
//! and never interpreted by queries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Int(i64),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    Nested(AttributeSet),
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Double(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl From<AttributeSet> for AttributeValue {
    fn from(v: AttributeSet) -> Self {
        AttributeValue::Nested(v)
    }
}

/// Ordered key/value bag attached to a feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSet {
    values: BTreeMap<String, AttributeValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with<K: Into<String>, V: Into<AttributeValue>>(mut self, key: K, value: V) -> Self {
        self.set(key, value);
        self
    }

    pub fn set<K: Into<String>, V: Into<AttributeValue>>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy every entry of `other` into this set, replacing existing keys
    pub fn merge(&mut self, other: &AttributeSet) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }
}

/// How an attribute update combines with the stored attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttributeUpdate {
    /// Stored attributes are discarded
    #[default]
    Replace,
    /// Supplied keys overwrite stored ones; other stored keys survive
    AddOrReplace,
}

/// Rendering style. Opaque to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Style {
    Stroke { color: u32, width: f32 },
    Fill { color: u32 },
    Icon { uri: String, scale: f32, color: u32 },
    Label { text: String, color: u32 },
    Composite(Vec<Style>),
}

/// How the renderer interprets feature altitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AltitudeMode {
    #[default]
    ClampToGround,
    Relative,
    Absolute,
}
