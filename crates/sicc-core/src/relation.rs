//! Relation normalization.
//!
//! Directus may return a foreign-key field as a raw id, as the embedded related record,
//! or as a one-element list of records, depending on the `fields` shape of the query.
//! [`Relation`] models the three wire shapes and [`Relation::id`] collapses them to a
//! single scalar [`ItemId`], so nothing downstream has to care which one arrived.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Primary key of a backend row. Directus collections use integer or string keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Text(String),
}

impl ItemId {
    /// Extract an id from a scalar JSON value. Objects, lists, booleans and null yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(ItemId::Int),
            Value::String(s) => Some(ItemId::Text(s.clone())),
            _ => None,
        }
    }

    /// `0` and the empty string never identify a row.
    pub fn is_truthy(&self) -> bool {
        match self {
            ItemId::Int(n) => *n != 0,
            ItemId::Text(s) => !s.is_empty(),
        }
    }

    /// Numeric value of the id, parsing string keys such as `"3"`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ItemId::Int(n) => Some(*n),
            ItemId::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ItemId::Int(n) => Value::from(*n),
            ItemId::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Int(n) => write!(f, "{}", n),
            ItemId::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for ItemId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<i64>() {
            Ok(n) => ItemId::Int(n),
            Err(_) => ItemId::Text(s.trim().to_string()),
        })
    }
}

impl From<i64> for ItemId {
    fn from(n: i64) -> Self {
        ItemId::Int(n)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::Text(s.to_string())
    }
}

/// Normalize any wire representation of a relation to its scalar id.
///
/// A list yields the id of its first element (or the element itself when it is a scalar),
/// an object yields its `id` field, and a scalar is returned as is.
pub fn normalize_relation_id(value: &Value) -> Option<ItemId> {
    match value {
        Value::Array(items) => items.first().and_then(|first| match first {
            Value::Object(map) => map.get("id").and_then(ItemId::from_value),
            other => ItemId::from_value(other),
        }),
        Value::Object(map) => map.get("id").and_then(ItemId::from_value),
        other => ItemId::from_value(other),
    }
}

/// A foreign-key field in whichever shape the backend sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relation {
    #[default]
    Null,
    Id(ItemId),
    Many(Vec<Value>),
    Embedded(Map<String, Value>),
}

impl Relation {
    /// The normalized scalar id, if any.
    pub fn id(&self) -> Option<ItemId> {
        match self {
            Relation::Null => None,
            Relation::Id(id) => Some(id.clone()),
            Relation::Many(items) => normalize_relation_id(&Value::Array(items.clone())),
            Relation::Embedded(map) => map.get("id").and_then(ItemId::from_value),
        }
    }

    /// The normalized id, dropping falsy keys (`0`, `""`). Used for grouping.
    pub fn key(&self) -> Option<ItemId> {
        self.id().filter(ItemId::is_truthy)
    }

    /// The embedded record, when the backend expanded the relation.
    pub fn embedded(&self) -> Option<&Map<String, Value>> {
        match self {
            Relation::Embedded(map) => Some(map),
            Relation::Many(items) => items.first().and_then(Value::as_object),
            _ => None,
        }
    }
}

impl From<ItemId> for Relation {
    fn from(id: ItemId) -> Self {
        Relation::Id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_all_three_shapes_to_the_same_id() {
        assert_eq!(normalize_relation_id(&json!([{ "id": 5 }])), Some(ItemId::Int(5)));
        assert_eq!(normalize_relation_id(&json!({ "id": 5 })), Some(ItemId::Int(5)));
        assert_eq!(normalize_relation_id(&json!(5)), Some(ItemId::Int(5)));
    }

    #[test]
    fn empty_list_and_null_normalize_to_none() {
        assert_eq!(normalize_relation_id(&json!([])), None);
        assert_eq!(normalize_relation_id(&Value::Null), None);
    }

    #[test]
    fn list_of_scalars_yields_first_scalar() {
        assert_eq!(normalize_relation_id(&json!([7, 8])), Some(ItemId::Int(7)));
        assert_eq!(
            normalize_relation_id(&json!(["a1b2"])),
            Some(ItemId::Text("a1b2".to_string()))
        );
    }

    #[test]
    fn relation_deserializes_every_wire_shape() {
        let scalar: Relation = serde_json::from_value(json!(3)).unwrap();
        let object: Relation = serde_json::from_value(json!({ "id": 3, "nombre": "Planta" })).unwrap();
        let list: Relation = serde_json::from_value(json!([{ "id": 3 }])).unwrap();
        let null: Relation = serde_json::from_value(Value::Null).unwrap();

        assert_eq!(scalar, Relation::Id(ItemId::Int(3)));
        assert_eq!(scalar.id(), Some(ItemId::Int(3)));
        assert_eq!(object.id(), Some(ItemId::Int(3)));
        assert_eq!(list.id(), Some(ItemId::Int(3)));
        assert_eq!(null, Relation::Null);
        assert_eq!(null.id(), None);
        assert_eq!(
            object.embedded().and_then(|m| m.get("nombre")),
            Some(&json!("Planta"))
        );
    }

    #[test]
    fn key_drops_falsy_ids() {
        assert_eq!(Relation::Id(ItemId::Int(0)).key(), None);
        assert_eq!(Relation::Id(ItemId::Text(String::new())).key(), None);
        assert_eq!(Relation::Id(ItemId::Int(9)).key(), Some(ItemId::Int(9)));
    }

    #[test]
    fn item_id_parses_and_displays() {
        assert_eq!("42".parse::<ItemId>().unwrap(), ItemId::Int(42));
        assert_eq!(
            "c0ffee".parse::<ItemId>().unwrap(),
            ItemId::Text("c0ffee".to_string())
        );
        assert_eq!(ItemId::Int(42).to_string(), "42");
        assert_eq!(ItemId::Text("3".to_string()).as_i64(), Some(3));
    }
}
