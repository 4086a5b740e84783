use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SdkError;

/// Decoded list endpoint payload.
///
/// The controller answers list calls either as `{"<field>": [...]}` or as a
/// bare `[...]`; both end up here in server order.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse<T> {
    items: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: DeserializeOwned> ListResponse<T> {
    /// Decodes by payload shape: object means "look up `field`", array means
    /// "the payload is the list". Anything else is a decode error.
    pub fn from_value(value: Value, field: &str) -> Result<Self, SdkError> {
        let list = match value {
            Value::Array(items) => Value::Array(items),
            Value::Object(mut map) => {
                let key = if map.contains_key(field) {
                    Some(field.to_string())
                } else {
                    map.keys().find(|k| k.eq_ignore_ascii_case(field)).cloned()
                };
                match key.and_then(|k| map.remove(&k)) {
                    Some(Value::Null) => Value::Array(Vec::new()),
                    Some(list) => list,
                    None => {
                        return Err(SdkError::Decode(format!(
                            "list response object has no '{field}' field"
                        )));
                    }
                }
            }
            other => {
                return Err(SdkError::Decode(format!(
                    "list response must be an object or an array, got {}",
                    value_kind(&other)
                )));
            }
        };
        let items: Vec<T> = serde_json::from_value(list)
            .map_err(|err| SdkError::Decode(format!("invalid '{field}' list: {err}")))?;
        Ok(Self { items })
    }

    pub fn from_body(body: &str, field: &str) -> Result<Self, SdkError> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(value, field)
    }
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> IntoIterator for ListResponse<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ListResponse<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
