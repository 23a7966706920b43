use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

use super::unique_id::UniqueId;

/// Entity props: an identity, optional timestamps, and the caller's fields.
///
/// The id is fixed at construction. Caller fields are reachable through
/// `Deref`, so `props.name` reads straight through to `P`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityProps<P> {
    id: UniqueId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub data: P,
}

impl<P> EntityProps<P> {
    /// Props with a freshly generated id
    pub fn new(data: P) -> Self {
        Self::with_id(None, data)
    }

    /// Props with a caller-supplied id (generated when `None` or empty)
    pub fn with_id(id: Option<UniqueId>, data: P) -> Self {
        Self {
            id: UniqueId::new(id),
            created_at: None,
            updated_at: None,
            data,
        }
    }

    pub fn id(&self) -> &UniqueId {
        &self.id
    }

    /// Replace the caller's fields, keeping identity and stamping `updated_at`
    pub fn replace(&mut self, data: P) {
        self.data = data;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    /// `[Entity@<type>]:<id>`
    pub fn hash_code(&self, type_name: &str) -> UniqueId {
        UniqueId::Text(format!("[Entity@{}]:{}", type_name, self.id))
    }

    pub(crate) fn with_identity(mut self, id: UniqueId) -> Self {
        self.id = id;
        self
    }
}

impl<P: Serialize> EntityProps<P> {
    /// Plain JSON object: `id`, ISO-8601 `createdAt`/`updatedAt` (defaulting
    /// to now) and every caller field.
    pub fn to_object(&self) -> serde_json::Result<Value> {
        let now = Utc::now();
        let stamp = |at: Option<DateTime<Utc>>| {
            Value::String(at.unwrap_or(now).to_rfc3339_opts(SecondsFormat::Millis, true))
        };

        let mut object = Map::new();
        object.insert("id".to_string(), Value::String(self.id.to_string()));
        object.insert("createdAt".to_string(), stamp(self.created_at));
        object.insert("updatedAt".to_string(), stamp(self.updated_at));

        match serde_json::to_value(&self.data)? {
            Value::Object(fields) => object.extend(fields),
            Value::Null => {}
            other => {
                object.insert("value".to_string(), other);
            }
        }

        Ok(Value::Object(object))
    }
}

impl<P> Deref for EntityProps<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.data
    }
}

impl<P> DerefMut for EntityProps<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.data
    }
}
