//! Document store primitives.
//!
//! The catalog talks to its store through four calls (run a query, look up a
//! key, save an entity, delete a key) over a single entity shape: a key plus
//! named scalar properties. [`MongoDatastore`] backs this with one MongoDB
//! collection per kind; [`MemoryDatastore`] keeps everything in process.

mod cursor;
mod memory;
mod mongo;

pub use self::cursor::Cursor;
pub use self::memory::MemoryDatastore;
pub use self::mongo::MongoDatastore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Key for kind '{0}' has no id")]
    IncompleteKey(String),

    #[error("Malformed document in '{kind}': {message}")]
    Malformed { kind: String, message: String },

    #[error("MongoDB error: {0}")]
    Mongo(#[from] ::mongodb::error::Error),

    #[error("Datastore unavailable: {0}")]
    Unavailable(String),
}

pub type DatastoreResult<T> = Result<T, DatastoreError>;

/// A scalar property value.
///
/// Values of different types never compare as equal or ordered against each
/// other in filters; in sorts they group by type (null, numbers, strings,
/// booleans).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Double(_) => 1,
            Value::String(_) => 2,
            Value::Boolean(_) => 3,
        }
    }

    /// Ordering within a type group; `None` across groups.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// Total order used for sorting: type group first, then value.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.compare(other).unwrap_or(Ordering::Equal))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

/// Entity key: a kind plus an integer id, absent until the store assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub kind: String,
    pub id: Option<i64>,
}

impl Key {
    pub fn new(kind: impl Into<String>, id: Option<i64>) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// A key the store will complete on save.
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self::new(kind, None)
    }

    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        Self::new(kind, Some(id))
    }

    pub fn is_complete(&self) -> bool {
        self.id.is_some()
    }

    /// The id, or `IncompleteKey` for keys that were never saved.
    pub fn require_id(&self) -> DatastoreResult<i64> {
        self.id
            .ok_or_else(|| DatastoreError::IncompleteKey(self.kind.clone()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}({})", self.kind, id),
            None => write!(f, "{}(incomplete)", self.kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub key: Key,
    pub properties: BTreeMap<String, Value>,
}

impl Entity {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOp {
    /// Whether `ordering` (property value compared to the filter value) satisfies the operator.
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Lte => ordering != Ordering::Greater,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Gte => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub property: String,
    pub op: FilterOp,
    pub value: Value,
}

impl PropertyFilter {
    /// A missing property or a value of another type never matches.
    pub fn matches(&self, entity: &Entity) -> bool {
        entity
            .get(&self.property)
            .and_then(|value| value.compare(&self.value))
            .is_some_and(|ordering| self.op.accepts(ordering))
    }
}

/// A kind-scoped query: conjunctive property filters, at most one ascending
/// sort property, a limit and an optional start position.
///
/// Results are always ordered by the sort property (if any) and then by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub kind: String,
    pub filters: Vec<PropertyFilter>,
    pub order: Option<String>,
    pub limit: Option<usize>,
    pub start_cursor: Option<Cursor>,
}

impl Query {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            filters: Vec::new(),
            order: None,
            limit: None,
            start_cursor: None,
        }
    }

    pub fn filter(
        mut self,
        property: impl Into<String>,
        op: FilterOp,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(PropertyFilter {
            property: property.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_asc(mut self, property: impl Into<String>) -> Self {
        self.order = Some(property.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start(mut self, cursor: Cursor) -> Self {
        self.start_cursor = Some(cursor);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    pub entities: Vec<Entity>,
    /// Position after the last returned entity; `None` when nothing was returned.
    pub end_cursor: Option<Cursor>,
}

/// Document store consumed by the catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Run a kind-scoped query.
    async fn run_query(&self, query: Query) -> DatastoreResult<QueryResults>;

    /// Fetch one entity by complete key.
    async fn lookup(&self, key: Key) -> DatastoreResult<Option<Entity>>;

    /// Insert or replace an entity, allocating an id for incomplete keys.
    /// Returns the complete key.
    async fn save(&self, entity: Entity) -> DatastoreResult<Key>;

    /// Delete by key. Deleting a missing entity succeeds.
    async fn delete(&self, key: Key) -> DatastoreResult<()>;

    /// Readiness probe.
    async fn ping(&self) -> DatastoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str) -> Entity {
        let mut entity = Entity::new(Key::with_id("Product", 1));
        entity.set("downcase_name", name);
        entity
    }

    #[test]
    fn test_filter_range_matches_prefix() {
        let low = PropertyFilter {
            property: "downcase_name".into(),
            op: FilterOp::Gte,
            value: "ba".into(),
        };
        let high = PropertyFilter {
            property: "downcase_name".into(),
            op: FilterOp::Lt,
            value: format!("ba{}", char::MAX).into(),
        };

        for name in ["ba", "banana", "bazooka"] {
            assert!(low.matches(&entity(name)) && high.matches(&entity(name)), "{name}");
        }
        for name in ["b", "apple", "bb", "cherry"] {
            assert!(!(low.matches(&entity(name)) && high.matches(&entity(name))), "{name}");
        }
    }

    #[test]
    fn test_filter_missing_property_or_other_type_never_matches() {
        let filter = PropertyFilter {
            property: "downcase_name".into(),
            op: FilterOp::Gte,
            value: Value::Integer(0),
        };
        assert!(!filter.matches(&entity("anything")));
        assert!(!filter.matches(&Entity::new(Key::with_id("Product", 2))));
    }

    #[test]
    fn test_sort_cmp_groups_by_type() {
        assert_eq!(Value::Null.sort_cmp(&Value::Integer(-5)), Ordering::Less);
        assert_eq!(Value::Integer(3).sort_cmp(&Value::Double(2.5)), Ordering::Greater);
        assert_eq!(Value::from("z").sort_cmp(&Value::Boolean(false)), Ordering::Less);
    }

    #[test]
    fn test_key_require_id() {
        assert_eq!(Key::with_id("Product", 7).require_id().unwrap(), 7);
        assert!(matches!(
            Key::incomplete("Product").require_id(),
            Err(DatastoreError::IncompleteKey(kind)) if kind == "Product"
        ));
    }
}
