//! Typed field values.
//!
//! `Value` is the in-memory form of one field, and `Record` a decoded
//! row. The serde representation is untagged so records round-trip
//! through plain JSON objects: booleans, integers, and strings map onto
//! the three field types directly. JSON fractions have no field type and
//! fail to decode, which surfaces as a schema mismatch at the shell.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Key under which a fetched record carries its own record number.
pub const REC_NO_FIELD: &str = "_recNo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Text(_) => "text",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One decoded row keyed by field name.
pub type Record = HashMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trips_untagged() {
        let mut record = Record::new();
        record.insert("name".into(), Value::from("alice"));
        record.insert("age".into(), Value::from(34i64));
        record.insert("active".into(), Value::from(true));

        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();

        assert_eq!(back, record);
    }

    #[test]
    fn json_fraction_is_rejected() {
        assert!(serde_json::from_str::<Value>("3.25").is_err());
        assert_eq!(serde_json::from_str::<Value>("3").unwrap(), Value::Int(3));
    }
}
