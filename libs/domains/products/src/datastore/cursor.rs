use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use super::{DatastoreError, DatastoreResult, Entity, Value};

const CURSOR_VERSION: u8 = 1;

/// Keyset position inside a query's result order.
///
/// Points just after one entity: its id plus, for ordered queries, the
/// sort property name and the entity's value for it. Clients only ever see
/// the encoded form (base64url over versioned JSON).
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub id: i64,
    pub order: Option<String>,
    pub value: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct Wire {
    v: u8,
    id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    k: Option<Value>,
}

impl Cursor {
    /// Position after `entity` in a query ordered by `order`.
    ///
    /// Returns `None` for entities without an id.
    pub fn after(entity: &Entity, order: Option<&str>) -> Option<Self> {
        let id = entity.key.id?;
        let value = order.map(|property| entity.get(property).cloned().unwrap_or(Value::Null));
        Some(Self {
            id,
            order: order.map(str::to_string),
            value,
        })
    }

    pub fn encode(&self) -> String {
        let wire = Wire {
            v: CURSOR_VERSION,
            id: self.id,
            s: self.order.clone(),
            k: self.value.clone(),
        };
        // A struct of integers, strings and scalar values always serializes.
        let json = serde_json::to_vec(&wire).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> DatastoreResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| DatastoreError::InvalidCursor(format!("not base64url: {}", e)))?;
        let wire: Wire = serde_json::from_slice(&bytes)
            .map_err(|e| DatastoreError::InvalidCursor(format!("not a cursor document: {}", e)))?;

        if wire.v != CURSOR_VERSION {
            return Err(DatastoreError::InvalidCursor(format!(
                "unsupported cursor version {}",
                wire.v
            )));
        }

        // A null sort value decodes as absent; an ordered cursor always carries one.
        let value = match (&wire.s, wire.k) {
            (Some(_), value) => Some(value.unwrap_or(Value::Null)),
            (None, _) => None,
        };

        Ok(Self {
            id: wire.id,
            order: wire.s,
            value,
        })
    }

    /// Reject cursors produced by a query with a different sort.
    pub fn check_order(&self, order: Option<&str>) -> DatastoreResult<()> {
        if self.order.as_deref() == order {
            Ok(())
        } else {
            Err(DatastoreError::InvalidCursor(
                "cursor was issued for a different sort order".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::Key;

    #[test]
    fn test_cursor_token_is_url_safe() {
        let cursor = Cursor {
            id: 1234,
            order: Some("downcase_name".to_string()),
            value: Some(Value::from("???>>>~~~")),
        };
        let token = cursor.encode();

        assert!(!token.contains('='));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn test_cursor_after_entity() {
        let mut entity = Entity::new(Key::with_id("Product", 9));
        entity.set("downcase_name", "go");

        let unordered = Cursor::after(&entity, None).unwrap();
        assert_eq!(unordered.id, 9);
        assert_eq!(unordered.value, None);

        let ordered = Cursor::after(&entity, Some("downcase_name")).unwrap();
        assert_eq!(ordered.value, Some(Value::from("go")));

        assert!(Cursor::after(&Entity::new(Key::incomplete("Product")), None).is_none());
    }

    #[test]
    fn test_ordered_cursor_on_missing_property_keeps_null() {
        let entity = Entity::new(Key::with_id("Product", 3));
        let cursor = Cursor::after(&entity, Some("downcase_name")).unwrap();
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded.value, Some(Value::Null));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        for token in ["not a cursor!", "", "e30", "eyJ2IjoyLCJpZCI6MX0"] {
            // "e30" is `{}`, the last one is `{"v":2,"id":1}`
            assert!(
                matches!(Cursor::decode(token), Err(DatastoreError::InvalidCursor(_))),
                "{token}"
            );
        }
    }

    #[test]
    fn test_check_order() {
        let cursor = Cursor {
            id: 1,
            order: None,
            value: None,
        };
        assert!(cursor.check_order(None).is_ok());
        assert!(cursor.check_order(Some("downcase_name")).is_err());
    }
}
