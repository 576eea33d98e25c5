//! The log record the engine reads from and appends to.
//!
//! The engine only needs three capabilities from a record, captured by [`Record`].
//! [`Message`] is the in-crate implementation used by the CLI and the tests; pipeline
//! integrations can implement the trait for their own containers instead.

use std::hash::BuildHasherDefault;
use std::net::IpAddr;

use indexmap::IndexMap;
use ip_classify::AddressInput;
use rustc_hash::FxHasher;
use serde_json::{Map, Number, Value};

/// Fields starting with this prefix are internal bookkeeping and never enriched.
pub const INTERNAL_FIELD_PREFIX: &str = "gl2_";

/// A record field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Address(IpAddr),
    /// Anything else (null, arrays, objects), kept verbatim.
    Other(Value),
}

impl FieldValue {
    /// View this value the way the address validator sees it.
    #[inline]
    pub fn as_address_input(&self) -> AddressInput<'_> {
        match self {
            FieldValue::String(s) => AddressInput::Text(s),
            FieldValue::Address(ip) => AddressInput::Address(*ip),
            _ => AddressInput::Other,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<IpAddr> for FieldValue {
    fn from(ip: IpAddr) -> Self {
        FieldValue::Address(ip)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => FieldValue::String(s),
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => FieldValue::Integer(i),
                (None, Some(f)) if n.is_f64() => FieldValue::Float(f),
                _ => FieldValue::Other(Value::Number(n)),
            },
            other => FieldValue::Other(other),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::String(s) => Value::String(s),
            FieldValue::Integer(i) => Value::Number(i.into()),
            FieldValue::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Address(ip) => Value::String(ip.to_string()),
            FieldValue::Other(v) => v,
        }
    }
}

/// The record operations the engine relies on.
///
/// Implementations must let `add_field` be called for names not yet present; the engine
/// never removes or rewrites fields it did not add.
pub trait Record {
    /// All field names currently in the record.
    fn field_names(&self) -> impl Iterator<Item = &str>;

    /// The value of a field, if present.
    fn field(&self, name: &str) -> Option<&FieldValue>;

    /// Add (or overwrite) a field.
    fn add_field(&mut self, name: String, value: FieldValue);
}

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Insertion-ordered record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: FxIndexMap<String, FieldValue>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for constructing records in tests.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_json(self) -> Map<String, Value> {
        self.fields
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect()
    }
}

impl From<Map<String, Value>> for Message {
    fn from(map: Map<String, Value>) -> Self {
        Message {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, FieldValue::from(v)))
                .collect(),
        }
    }
}

impl Record for Message {
    fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    fn add_field(&mut self, name: String, value: FieldValue) {
        self.fields.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_map_to_field_values() {
        let Value::Object(map) = json!({
            "ip": "8.8.8.8",
            "port": 53,
            "ratio": 0.5,
            "ok": true,
            "tags": ["a"],
            "none": null,
        }) else {
            unreachable!()
        };
        let msg = Message::from(map);
        assert_eq!(msg.field("ip"), Some(&FieldValue::String("8.8.8.8".into())));
        assert_eq!(msg.field("port"), Some(&FieldValue::Integer(53)));
        assert_eq!(msg.field("ratio"), Some(&FieldValue::Float(0.5)));
        assert_eq!(msg.field("ok"), Some(&FieldValue::Bool(true)));
        assert_eq!(msg.field("tags"), Some(&FieldValue::Other(json!(["a"]))));
        assert_eq!(msg.field("none"), Some(&FieldValue::Other(Value::Null)));
    }

    #[test]
    fn address_input_view() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(FieldValue::Address(ip).as_address_input(), AddressInput::Address(ip));
        assert_eq!(FieldValue::from("x").as_address_input(), AddressInput::Text("x"));
        assert_eq!(FieldValue::Integer(7).as_address_input(), AddressInput::Other);
    }

    #[test]
    fn into_json_keeps_insertion_order() {
        let mut msg = Message::new().with_field("b", "1").with_field("a", true);
        msg.add_field("host_ip".into(), FieldValue::Address("::1".parse().unwrap()));
        let json = msg.into_json();
        let keys: Vec<&str> = json.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a", "host_ip"]);
        assert_eq!(json["host_ip"], Value::String("::1".into()));
    }
}
