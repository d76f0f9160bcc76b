use super::{Result, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Body of a mutation: the new item for `create`, the fields to merge for `update`.
pub type Payload = Value;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Identity of an item. Numeric and string identifiers are both accepted
/// so that `1` and `"srv-1"` round-trip from JSON unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Str(String),
}

impl ItemId {
    /// Time-based temporary identifier for items created before the server assigns one.
    ///
    /// The sequence suffix keeps ids unique when several creates land in the same millisecond.
    pub fn temporary(prefix: &str) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        ItemId::Str(format!("{}-{}-{}", prefix, millis, seq))
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(ItemId::Int),
            Value::String(s) => Some(ItemId::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ItemId::Int(n) => Value::from(*n),
            ItemId::Str(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Int(n) => write!(f, "{}", n),
            ItemId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        ItemId::Int(value)
    }
}

impl From<i32> for ItemId {
    fn from(value: i32) -> Self {
        ItemId::Int(i64::from(value))
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        ItemId::Str(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        ItemId::Str(value)
    }
}

/// An entity in the mirrored collection.
///
/// Everything besides `id` is opaque payload. The `optimistic` flag is the
/// visible marker for state that the server has not confirmed yet; it is
/// serialized as `_optimistic` and only when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(
        rename = "_optimistic",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub optimistic: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            optimistic: false,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Builds an item from a create payload. `null` yields an item with no fields.
    pub fn from_payload(id: ItemId, payload: &Payload) -> Result<Self> {
        let mut item = Item::new(id);
        match payload {
            Value::Null => {}
            Value::Object(map) => {
                for (key, value) in map {
                    if key == "id" || key == "_optimistic" {
                        continue;
                    }
                    item.fields.insert(key.clone(), value.clone());
                }
            }
            other => {
                return Err(StoreError::InvalidPayload(format!(
                    "expected object or null, got {}",
                    json_type_name(other)
                )));
            }
        }
        Ok(item)
    }

    /// Parses an item from its JSON form (`{"id": .., ...fields}`).
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert("id".to_string(), self.id.to_value());
        if self.optimistic {
            map.insert("_optimistic".to_string(), Value::Bool(true));
        }
        Value::Object(map)
    }

    pub fn mark_optimistic(mut self) -> Self {
        self.optimistic = true;
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.optimistic = false;
        self
    }
}

/// Merges an update payload into `item`. Non-object payloads leave it unchanged;
/// an `id` key is ignored so that merging never changes identity.
pub fn merge_payload(item: &mut Item, payload: &Payload) {
    let Value::Object(map) = payload else {
        return;
    };
    for (key, value) in map {
        if key == "id" || key == "_optimistic" {
            continue;
        }
        item.fields.insert(key.clone(), value.clone());
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_id_untagged() {
        let ids: Vec<ItemId> = serde_json::from_value(json!([1, "srv-1"])).unwrap();
        assert_eq!(ids, vec![ItemId::Int(1), ItemId::from("srv-1")]);
    }

    #[test]
    fn test_temporary_ids_are_unique() {
        let a = ItemId::temporary("temp");
        let b = ItemId::temporary("temp");
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("temp-"));
    }

    #[test]
    fn test_item_json_shape() {
        let item = Item::from_json(json!({"id": 1, "name": "A"})).unwrap();
        assert_eq!(item.id, ItemId::Int(1));
        assert!(!item.optimistic);
        assert_eq!(item.field("name"), Some(&json!("A")));
        assert_eq!(serde_json::to_value(&item).unwrap(), json!({"id": 1, "name": "A"}));

        let marked = item.mark_optimistic();
        assert_eq!(
            marked.to_json(),
            json!({"id": 1, "name": "A", "_optimistic": true})
        );
    }

    #[test]
    fn test_merge_payload_keeps_identity() {
        let mut item = Item::new(1).with_field("name", "A").with_field("price", 10);
        merge_payload(&mut item, &json!({"id": 7, "name": "B"}));

        assert_eq!(item.id, ItemId::Int(1));
        assert_eq!(item.field("name"), Some(&json!("B")));
        assert_eq!(item.field("price"), Some(&json!(10)));
    }

    #[test]
    fn test_from_payload_rejects_scalars() {
        let err = Item::from_payload(ItemId::from(1), &json!(42)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPayload(_)));

        let empty = Item::from_payload(ItemId::from(1), &Value::Null).unwrap();
        assert!(empty.fields.is_empty());
    }
}
