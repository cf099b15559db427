//! Validated record payload type.
//!
//! This module provides [`Payload`], a type that guarantees the value
//! is a record the remote store can upsert (a JSON object).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, InvalidInputError};

/// Field used as the upsert key when none is configured.
pub const DEFAULT_IDENTITY_FIELD: &str = "id";

/// A record to be written to a remote table.
///
/// This type guarantees that the value is a JSON object. Its shape beyond
/// that depends on the target table and is left to the remote store.
///
/// The identity field is not required here: a queued payload without one is
/// still durable locally, and whether it can be upserted is for the remote
/// store to decide.
///
/// # Example
///
/// ```
/// use domsync_core::Payload;
/// use serde_json::json;
///
/// let payload = Payload::new(json!({
///     "id": "p1",
///     "nickname": "Zeca"
/// })).unwrap();
///
/// assert_eq!(payload.identity_key("id").as_deref(), Some("p1"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Payload(Value);

impl Payload {
    /// Create a new `Payload` from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a JSON object.
    pub fn new(value: Value) -> Result<Self, Error> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    /// Create a new `Payload` from a map of fields.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(Value::Object(fields))
    }

    /// Get the identity field's raw value, if present.
    pub fn identity(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    /// Get the identity field as a string key.
    ///
    /// Strings are returned as-is and numbers in their decimal form.
    /// Any other JSON type has no usable key and yields `None`.
    pub fn identity_key(&self, field: &str) -> Option<String> {
        match self.identity(field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Get a reference to the inner JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume and return the inner JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Get a field from the payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn validate(value: &Value) -> Result<(), Error> {
        if !value.is_object() {
            return Err(Error::InvalidInput(InvalidInputError::Payload {
                reason: "payload must be a JSON object".to_string(),
            }));
        }
        Ok(())
    }
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Payload::new(value).map_err(serde::de::Error::custom)
    }
}
