//! Debounce keys, execution ids and the metadata record carried by invocations
//!
//! A debounce key groups invocations that should be coalesced. Keys are always
//! namespaced by task type (`"<taskType>:<derivedKey>"`) so two task types can
//! share one ticket store without colliding.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Separator between the task type and the derived key
pub const NAMESPACE_SEPARATOR: char = ':';

/// Separator used when joining argument values into a key
pub const ARG_JOIN_SEPARATOR: &str = ",";

/// Number of random bytes in a generated execution id
const EXECUTION_ID_BYTES: usize = 16;

/// Closure deriving a key from task arguments
pub type KeyDeriver = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// How a producer derives the debounce key for a `schedule` call
#[derive(Clone)]
pub enum KeySpec {
    /// Use this string as the key
    Literal(String),
    /// Join the argument values at these positions with `,`
    ArgIndices(Vec<usize>),
    /// Compute the key from the arguments
    Derive(KeyDeriver),
}

impl KeySpec {
    /// Key from a literal string
    pub fn literal(key: impl Into<String>) -> Self {
        Self::Literal(key.into())
    }

    /// Key from the values of the given argument positions
    pub fn indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self::ArgIndices(indices.into_iter().collect())
    }

    /// Key computed by a closure; it must return a JSON string
    pub fn derive<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self::Derive(Arc::new(f))
    }

    /// Resolve the un-namespaced key for the given arguments
    ///
    /// Numbers and booleans selected by index are rendered with their JSON text.
    /// Null, arrays and objects are rejected, as is an empty result.
    pub fn resolve(&self, args: &[Value]) -> Result<String> {
        let key = match self {
            KeySpec::Literal(key) => key.clone(),
            KeySpec::ArgIndices(indices) => {
                if indices.is_empty() {
                    return Err(Error::InvalidKey {
                        message: "no argument indices given".to_string(),
                    });
                }

                let mut parts = Vec::with_capacity(indices.len());
                for &idx in indices {
                    let value = args.get(idx).ok_or_else(|| Error::InvalidKey {
                        message: format!(
                            "argument index {} out of range ({} arguments)",
                            idx,
                            args.len()
                        ),
                    })?;
                    parts.push(scalar_to_key_part(value).ok_or_else(|| Error::KeyNotString {
                        found: format!("{} at argument {}", json_kind(value), idx),
                    })?);
                }
                parts.join(ARG_JOIN_SEPARATOR)
            }
            KeySpec::Derive(f) => match f(args) {
                Value::String(key) => key,
                other => {
                    return Err(Error::KeyNotString {
                        found: json_kind(&other).to_string(),
                    })
                }
            },
        };

        if key.is_empty() {
            return Err(Error::InvalidKey {
                message: "key is empty".to_string(),
            });
        }

        Ok(key)
    }
}

impl fmt::Debug for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySpec::Literal(key) => f.debug_tuple("Literal").field(key).finish(),
            KeySpec::ArgIndices(indices) => f.debug_tuple("ArgIndices").field(indices).finish(),
            KeySpec::Derive(_) => f.write_str("Derive(..)"),
        }
    }
}

fn scalar_to_key_part(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check that a task type name can namespace keys
pub fn validate_task_type(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidTaskType {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        });
    }
    if name.contains(NAMESPACE_SEPARATOR) {
        return Err(Error::InvalidTaskType {
            name: name.to_string(),
            reason: format!("name must not contain '{}'", NAMESPACE_SEPARATOR),
        });
    }
    Ok(())
}

/// A namespaced debounce key (`"<taskType>:<derivedKey>"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebounceKey(String);

impl DebounceKey {
    /// Namespace a derived key under a task type
    pub fn namespaced(task_type: &str, derived: &str) -> Result<Self> {
        validate_task_type(task_type)?;
        if derived.is_empty() {
            return Err(Error::InvalidKey {
                message: "key is empty".to_string(),
            });
        }
        Ok(Self(format!("{}{}{}", task_type, NAMESPACE_SEPARATOR, derived)))
    }

    /// Parse a key in `"<taskType>:<derivedKey>"` form
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once(NAMESPACE_SEPARATOR) {
            Some((task_type, derived)) => Self::namespaced(task_type, derived),
            None => Err(Error::InvalidKey {
                message: format!("{:?} has no task type prefix", raw),
            }),
        }
    }

    /// Task type prefix of this key
    pub fn task_type(&self) -> &str {
        self.0
            .split_once(NAMESPACE_SEPARATOR)
            .map(|(task_type, _)| task_type)
            .unwrap_or(&self.0)
    }

    /// Key without its task type prefix
    pub fn derived(&self) -> &str {
        self.0
            .split_once(NAMESPACE_SEPARATOR)
            .map(|(_, derived)| derived)
            .unwrap_or("")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DebounceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one scheduled execution; the ticket value in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Mint a fresh random id (128 bits, lowercase hex)
    pub fn generate() -> Self {
        let bytes: [u8; EXECUTION_ID_BYTES] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for ExecutionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ExecutionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trailing argument attached to every debounced invocation
///
/// Wire shape: `{"key": "<taskType>:<derivedKey>", "id": "<token>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceMeta {
    pub key: String,
    pub id: String,
}

impl DebounceMeta {
    pub fn new(key: &DebounceKey, id: &ExecutionId) -> Self {
        Self {
            key: key.as_str().to_string(),
            id: id.as_str().to_string(),
        }
    }

    /// Encode as the JSON object appended to task arguments
    pub fn to_value(&self) -> Value {
        let mut record = serde_json::Map::with_capacity(2);
        record.insert("key".to_string(), Value::String(self.key.clone()));
        record.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(record)
    }

    /// Decode a metadata record
    ///
    /// Only an object with exactly the string fields `key` and `id` qualifies;
    /// anything else is an ordinary task argument.
    pub fn from_value(value: &Value) -> Option<Self> {
        let record = value.as_object()?;
        if record.len() != 2 {
            return None;
        }
        let key = record.get("key")?.as_str()?;
        let id = record.get("id")?.as_str()?;
        Some(Self {
            key: key.to_string(),
            id: id.to_string(),
        })
    }

    /// Split trailing metadata off an argument list
    ///
    /// Returns the arguments unchanged and `None` when the last argument is not
    /// a metadata record.
    pub fn split_trailing(mut args: Vec<Value>) -> (Vec<Value>, Option<Self>) {
        match args.last().and_then(Self::from_value) {
            Some(meta) => {
                args.pop();
                (args, Some(meta))
            }
            None => (args, None),
        }
    }
}
