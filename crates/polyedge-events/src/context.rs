//! Mutable payload shared by the listeners of one emission.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Data passed through every listener of an emission, in order.
///
/// Listeners communicate by mutating it; whatever the last listener leaves
/// behind is what the emitter reads back. A key set to `null` is present but
/// empty, which callers use as a veto.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventContext {
    data: Map<String, Value>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`EventContext::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// A string value; `None` when absent, `null` or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Deserialize a value into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Serialize `value` into the context.
    pub fn set_as<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> serde_json::Result<()> {
        self.data.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Whether `key` was explicitly set to `null`.
    pub fn is_null(&self, key: &str) -> bool {
        matches!(self.data.get(key), Some(Value::Null))
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

impl From<Map<String, Value>> for EventContext {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}
