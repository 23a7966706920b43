use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Namespace tag carried by every generated id
pub const ENTITY_ID_PREFIX: &str = "ett";

/// Opaque entity identifier, compared by value.
///
/// Generated ids look like `ett_<32 hex>`; caller-supplied ids are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniqueId {
    Number(i64),
    Text(String),
}

impl UniqueId {
    /// Resolve an identity: pass a caller-supplied id through, or generate one.
    ///
    /// An empty text id counts as absent.
    pub fn new(id: Option<UniqueId>) -> Self {
        match id {
            Some(UniqueId::Text(text)) if text.is_empty() => Self::generate(),
            Some(id) => id,
            None => Self::generate(),
        }
    }

    pub fn generate() -> Self {
        Self::generate_with_prefix(ENTITY_ID_PREFIX)
    }

    pub fn generate_with_prefix(prefix: &str) -> Self {
        UniqueId::Text(format!("{}_{}", prefix, Uuid::new_v4().simple()))
    }

    /// True when the id carries the generator's namespace tag
    pub fn is_generated(&self) -> bool {
        match self {
            UniqueId::Text(text) => text
                .strip_prefix(ENTITY_ID_PREFIX)
                .is_some_and(|rest| rest.starts_with('_')),
            UniqueId::Number(_) => false,
        }
    }

    pub fn is_equal(&self, other: Option<&UniqueId>) -> bool {
        other.is_some_and(|other| other == self)
    }

    /// Compare against an untyped value; anything that is not id-shaped is unequal.
    pub fn is_equal_value(&self, other: &Value) -> bool {
        if !Self::is_unique_id(other) {
            return false;
        }
        other.get("id").is_some_and(|id| *id == self.to_value())
    }

    /// Structural check: an object with an `id` field of string or number type.
    pub fn is_unique_id(value: &Value) -> bool {
        matches!(
            value.as_object().and_then(|object| object.get("id")),
            Some(Value::String(_)) | Some(Value::Number(_))
        )
    }

    pub fn to_value(&self) -> Value {
        match self {
            UniqueId::Number(number) => Value::from(*number),
            UniqueId::Text(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueId::Number(number) => write!(f, "{}", number),
            UniqueId::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for UniqueId {
    fn from(value: &str) -> Self {
        UniqueId::Text(value.to_string())
    }
}

impl From<String> for UniqueId {
    fn from(value: String) -> Self {
        UniqueId::Text(value)
    }
}

impl From<i64> for UniqueId {
    fn from(value: i64) -> Self {
        UniqueId::Number(value)
    }
}

impl From<Uuid> for UniqueId {
    fn from(value: Uuid) -> Self {
        UniqueId::Text(value.to_string())
    }
}
