//! Airtable wire types
//!
//! Records, pages and table metadata as returned by the REST API, plus the
//! tagged [`FieldValue`] used to reason about heterogeneous field shapes.

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A single field value.
///
/// The remote service attaches no declared type to cell values, so the
/// variant is chosen from the JSON shape of the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Fractional(f64),
    Boolean(bool),
    StringList(Vec<String>),
    /// Attachments, linked-record objects, arrays of non-strings, ...
    Other(Value),
    Absent,
}

impl FieldValue {
    /// Kind of this value, or `None` for [`FieldValue::Absent`].
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Text(_) => Some(FieldKind::String),
            FieldValue::Integer(_) => Some(FieldKind::Integer),
            FieldValue::Fractional(_) => Some(FieldKind::Fractional),
            FieldValue::Boolean(_) => Some(FieldKind::Boolean),
            FieldValue::StringList(_) => Some(FieldKind::ListOfString),
            FieldValue::Other(_) => Some(FieldKind::Other),
            FieldValue::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Canonical string form used for previews.
    ///
    /// Lists and opaque values render as compact JSON.
    pub fn canonical_string(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Fractional(f) => f.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::StringList(items) => {
                serde_json::to_string(items).unwrap_or_else(|_| format!("{:?}", items))
            }
            FieldValue::Other(value) => value.to_string(),
            FieldValue::Absent => String::new(),
        }
    }

    /// String contents searched by the flag predicate.
    pub fn text_values(&self) -> Vec<&str> {
        match self {
            FieldValue::Text(s) => vec![s.as_str()],
            FieldValue::StringList(items) => items.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Absent,
            Value::Bool(b) => FieldValue::Boolean(b),
            Value::String(s) => FieldValue::Text(s),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Integer(i)
                } else if n.is_u64() {
                    // Larger than i64::MAX; keep it lossless.
                    FieldValue::Other(Value::Number(n))
                } else {
                    match n.as_f64() {
                        Some(f) => FieldValue::Fractional(f),
                        None => FieldValue::Other(Value::Number(n)),
                    }
                }
            }
            Value::Array(items) if items.iter().all(Value::is_string) => FieldValue::StringList(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            other => FieldValue::Other(other),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => Value::String(s),
            FieldValue::Integer(n) => Value::from(n),
            FieldValue::Fractional(f) => Value::from(f),
            FieldValue::Boolean(b) => Value::Bool(b),
            FieldValue::StringList(items) => Value::from(items),
            FieldValue::Other(v) => v,
            FieldValue::Absent => Value::Null,
        }
    }
}

/// Inferred kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    String,
    Integer,
    Fractional,
    Boolean,
    ListOfString,
    Other,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Fractional => "fractional",
            FieldKind::Boolean => "boolean",
            FieldKind::ListOfString => "list-of-string",
            FieldKind::Other => "other",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cell values of one record, in the order the service sent them.
///
/// A repeated name keeps its first position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, FieldValue)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter().map(|(n, v)| (n, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = Fields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to cell values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Fields, A::Error> {
                let mut fields = Fields(Vec::with_capacity(access.size_hint().unwrap_or(0)));
                while let Some((name, value)) = access.next_entry::<String, FieldValue>()? {
                    fields.insert(name, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// A table record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
}

/// One page of a record listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub records: Vec<Record>,
    /// Continuation token; `None` ends the scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

/// Table entry from the base metadata endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_field_id: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

/// Declared field on a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TablesResponse {
    pub tables: Vec<TableSchema>,
}
