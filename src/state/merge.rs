use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Keys a client merge may never overwrite (the record's map key)
const PROTECTED_KEYS: &[&str] = &["id"];

/// Shallow-merge client-supplied fields into a typed record.
///
/// The record is round-tripped through a JSON object: every supplied key
/// replaces the existing value, unknown keys land in the record's flattened
/// catch-all bag. The merged object must still deserialize into `T`,
/// otherwise the whole merge is rejected and the caller keeps the original.
pub fn merge_fields<T>(record: &T, updates: &Map<String, Value>) -> Result<T, MergeError>
where
    T: Serialize + DeserializeOwned,
{
    let mut object = match serde_json::to_value(record) {
        Ok(Value::Object(object)) => object,
        Ok(_) => return Err(MergeError::NotAnObject),
        Err(e) => return Err(MergeError::Encode(e.to_string())),
    };

    for (key, value) in updates {
        if PROTECTED_KEYS.contains(&key.as_str()) {
            continue;
        }
        object.insert(key.clone(), value.clone());
    }

    serde_json::from_value(Value::Object(object)).map_err(|e| MergeError::InvalidField(e.to_string()))
}

/// Reasons a permissive merge is rejected
#[derive(Debug, Clone, PartialEq)]
pub enum MergeError {
    /// Record did not serialize to a JSON object
    NotAnObject,
    Encode(String),
    /// A supplied value does not fit the typed field it targets
    InvalidField(String),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::NotAnObject => write!(f, "record is not a JSON object"),
            MergeError::Encode(e) => write!(f, "failed to encode record: {}", e),
            MergeError::InvalidField(e) => write!(f, "merged record is invalid: {}", e),
        }
    }
}

impl std::error::Error for MergeError {}
