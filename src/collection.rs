//! Keyed record collections.
//!
//! A collection maps each record's natural key (an application name, a
//! repository id) to the record itself. Records are opaque JSON objects and
//! are only ever compared by deep equality.
//!
//! Keys iterate in ascending order, so a collection reads back from the
//! store in exactly the order it was written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection(BTreeMap<String, Record>);

impl Collection {
    pub fn new() -> Self {
        Collection(BTreeMap::new())
    }

    /// Build a collection from raw records, keyed by `key_field`.
    ///
    /// Every record must be an object carrying a non-empty string under
    /// `key_field`. When two records share a key the later one wins.
    pub fn from_records(records: Vec<Value>, key_field: &str) -> Result<Self> {
        let mut map = BTreeMap::new();

        for (index, value) in records.into_iter().enumerate() {
            let Value::Object(record) = value else {
                return Err(Error::MalformedRecord {
                    index,
                    reason: format!("expected an object, found {}", kind(&value)),
                });
            };

            let key = match record.get(key_field) {
                Some(Value::String(k)) if !k.is_empty() => k.clone(),
                Some(Value::String(_)) => {
                    return Err(Error::MalformedRecord {
                        index,
                        reason: format!("'{key_field}' is empty"),
                    });
                }
                Some(other) => {
                    return Err(Error::MalformedRecord {
                        index,
                        reason: format!("'{key_field}' is {}, not a string", kind(other)),
                    });
                }
                None => {
                    return Err(Error::MalformedRecord {
                        index,
                        reason: format!("missing '{key_field}'"),
                    });
                }
            };

            if map.insert(key.clone(), record).is_some() {
                tracing::warn!(key = %key, index, "duplicate record key, keeping the later record");
            }
        }

        Ok(Collection(map))
    }

    pub fn insert(&mut self, key: impl Into<String>, record: Record) -> Option<Record> {
        self.0.insert(key.into(), record)
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Canonical text form used for persistence: a JSON object with keys
    /// sorted at every level.
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl FromIterator<(String, Record)> for Collection {
    fn from_iter<I: IntoIterator<Item = (String, Record)>>(iter: I) -> Self {
        Collection(iter.into_iter().collect())
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
