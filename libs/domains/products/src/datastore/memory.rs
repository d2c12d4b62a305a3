use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::instrument;

use super::{Cursor, Datastore, DatastoreResult, Entity, Key, Query, QueryResults, Value};

#[derive(Debug, Default)]
struct KindTable {
    last_id: i64,
    rows: BTreeMap<i64, BTreeMap<String, Value>>,
}

/// In-process datastore with the same query semantics as [`MongoDatastore`](super::MongoDatastore).
///
/// Ids are allocated per kind starting at 1. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    kinds: RwLock<HashMap<String, KindTable>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities of `kind`.
    pub async fn len(&self, kind: &str) -> usize {
        self.kinds
            .read()
            .await
            .get(kind)
            .map_or(0, |table| table.rows.len())
    }
}

static NULL: Value = Value::Null;

fn sort_value<'a>(entity: &'a Entity, property: &str) -> &'a Value {
    entity.get(property).unwrap_or(&NULL)
}

fn is_after(entity: &Entity, cursor: &Cursor, order: Option<&str>) -> bool {
    let id = entity.key.id.unwrap_or(i64::MIN);
    let by_value = match order {
        Some(property) => {
            let position = cursor.value.as_ref().unwrap_or(&NULL);
            sort_value(entity, property).sort_cmp(position)
        }
        None => Ordering::Equal,
    };
    by_value.then_with(|| id.cmp(&cursor.id)) == Ordering::Greater
}

#[async_trait]
impl Datastore for MemoryDatastore {
    #[instrument(skip(self, query), fields(kind = %query.kind, limit = ?query.limit))]
    async fn run_query(&self, query: Query) -> DatastoreResult<QueryResults> {
        let order = query.order.as_deref();
        if let Some(cursor) = &query.start_cursor {
            cursor.check_order(order)?;
        }

        let kinds = self.kinds.read().await;
        let Some(table) = kinds.get(&query.kind) else {
            return Ok(QueryResults::default());
        };

        let mut entities: Vec<Entity> = table
            .rows
            .iter()
            .map(|(id, properties)| Entity {
                key: Key::with_id(query.kind.clone(), *id),
                properties: properties.clone(),
            })
            .filter(|entity| order.is_none_or(|property| entity.get(property).is_some()))
            .filter(|entity| query.filters.iter().all(|filter| filter.matches(entity)))
            .collect();
        drop(kinds);

        // Rows come out of the BTreeMap in id order; the sort is stable.
        if let Some(property) = order {
            entities.sort_by(|a, b| sort_value(a, property).sort_cmp(sort_value(b, property)));
        }
        if let Some(cursor) = &query.start_cursor {
            entities.retain(|entity| is_after(entity, cursor, order));
        }
        if let Some(limit) = query.limit {
            entities.truncate(limit);
        }

        let end_cursor = entities.last().and_then(|entity| Cursor::after(entity, order));
        tracing::debug!(count = entities.len(), "Query returned entities");

        Ok(QueryResults {
            entities,
            end_cursor,
        })
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn lookup(&self, key: Key) -> DatastoreResult<Option<Entity>> {
        let id = key.require_id()?;
        let kinds = self.kinds.read().await;
        let properties = kinds
            .get(&key.kind)
            .and_then(|table| table.rows.get(&id))
            .cloned();

        Ok(properties.map(|properties| Entity { key, properties }))
    }

    #[instrument(skip(self, entity), fields(key = %entity.key))]
    async fn save(&self, entity: Entity) -> DatastoreResult<Key> {
        let mut kinds = self.kinds.write().await;
        let table = kinds.entry(entity.key.kind.clone()).or_default();

        let id = match entity.key.id {
            Some(id) => {
                table.last_id = table.last_id.max(id);
                id
            }
            None => {
                table.last_id += 1;
                table.last_id
            }
        };
        table.rows.insert(id, entity.properties);

        tracing::info!(kind = %entity.key.kind, id, "Entity saved");
        Ok(Key::with_id(entity.key.kind, id))
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: Key) -> DatastoreResult<()> {
        let id = key.require_id()?;
        let removed = self
            .kinds
            .write()
            .await
            .get_mut(&key.kind)
            .and_then(|table| table.rows.remove(&id))
            .is_some();

        tracing::info!(kind = %key.kind, id, removed, "Entity deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::{DatastoreError, FilterOp};

    fn named(name: &str) -> Entity {
        let mut entity = Entity::new(Key::incomplete("Product"));
        entity.set("downcase_name", name);
        entity
    }

    async fn seeded(names: &[&str]) -> MemoryDatastore {
        let store = MemoryDatastore::new();
        for name in names {
            store.save(named(name)).await.unwrap();
        }
        store
    }

    fn names(results: &QueryResults) -> Vec<&str> {
        results
            .entities
            .iter()
            .filter_map(|e| e.get("downcase_name").and_then(Value::as_str))
            .collect()
    }

    #[tokio::test]
    async fn test_save_allocates_sequential_ids() {
        let store = MemoryDatastore::new();
        let first = store.save(named("a")).await.unwrap();
        let second = store.save(named("b")).await.unwrap();

        assert_eq!(first, Key::with_id("Product", 1));
        assert_eq!(second, Key::with_id("Product", 2));
    }

    #[tokio::test]
    async fn test_save_with_id_replaces_and_never_collides() {
        let store = MemoryDatastore::new();
        store.save(named("a")).await.unwrap();

        let mut replacement = named("z");
        replacement.key = Key::with_id("Product", 10);
        store.save(replacement).await.unwrap();

        let next = store.save(named("b")).await.unwrap();
        assert_eq!(next.id, Some(11));
        assert_eq!(store.len("Product").await, 3);
    }

    #[tokio::test]
    async fn test_lookup_and_idempotent_delete() {
        let store = seeded(&["go"]).await;
        let key = Key::with_id("Product", 1);

        let found = store.lookup(key.clone()).await.unwrap().unwrap();
        assert_eq!(found.get("downcase_name"), Some(&Value::from("go")));

        store.delete(key.clone()).await.unwrap();
        store.delete(key.clone()).await.unwrap();
        assert!(store.lookup(key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_incomplete_key_is_error() {
        let store = MemoryDatastore::new();
        let result = store.lookup(Key::incomplete("Product")).await;
        assert!(matches!(result, Err(DatastoreError::IncompleteKey(_))));
    }

    #[tokio::test]
    async fn test_pages_by_id_with_cursor() {
        let store = seeded(&["e", "d", "c", "b", "a"]).await;

        let first = store
            .run_query(Query::new("Product").limit(2))
            .await
            .unwrap();
        assert_eq!(names(&first), ["e", "d"]);

        let second = store
            .run_query(
                Query::new("Product")
                    .limit(2)
                    .start(first.end_cursor.clone().unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(names(&second), ["c", "b"]);

        let third = store
            .run_query(Query::new("Product").limit(2).start(second.end_cursor.unwrap()))
            .await
            .unwrap();
        assert_eq!(names(&third), ["a"]);
    }

    #[tokio::test]
    async fn test_range_filter_and_order() {
        let store = seeded(&["bazooka", "apple", "banana", "bb", "ba", "cherry"]).await;

        let query = Query::new("Product")
            .filter("downcase_name", FilterOp::Gte, "ba")
            .filter("downcase_name", FilterOp::Lt, format!("ba{}", char::MAX))
            .order_asc("downcase_name")
            .limit(5);
        let results = store.run_query(query).await.unwrap();

        assert_eq!(names(&results), ["ba", "banana", "bazooka"]);
    }

    #[tokio::test]
    async fn test_ordered_cursor_resumes_after_duplicates() {
        let store = seeded(&["b", "a", "b", "c"]).await;

        let query = Query::new("Product").order_asc("downcase_name").limit(2);
        let first = store.run_query(query.clone()).await.unwrap();
        assert_eq!(names(&first), ["a", "b"]);

        let second = store
            .run_query(query.start(first.end_cursor.unwrap()))
            .await
            .unwrap();
        assert_eq!(names(&second), ["b", "c"]);
    }

    #[tokio::test]
    async fn test_ordered_query_skips_entities_without_the_property() {
        let store = seeded(&["a"]).await;
        store
            .save(Entity::new(Key::incomplete("Product")))
            .await
            .unwrap();

        let ordered = store
            .run_query(Query::new("Product").order_asc("downcase_name"))
            .await
            .unwrap();
        assert_eq!(ordered.entities.len(), 1);

        let unordered = store.run_query(Query::new("Product")).await.unwrap();
        assert_eq!(unordered.entities.len(), 2);
    }

    #[tokio::test]
    async fn test_cursor_from_other_order_is_rejected() {
        let store = seeded(&["a", "b"]).await;
        let first = store
            .run_query(Query::new("Product").limit(1))
            .await
            .unwrap();

        let result = store
            .run_query(
                Query::new("Product")
                    .order_asc("downcase_name")
                    .start(first.end_cursor.unwrap()),
            )
            .await;
        assert!(matches!(result, Err(DatastoreError::InvalidCursor(_))));
    }

    #[tokio::test]
    async fn test_unknown_kind_is_empty() {
        let store = MemoryDatastore::new();
        let results = store.run_query(Query::new("Nothing")).await.unwrap();
        assert!(results.entities.is_empty());
        assert!(results.end_cursor.is_none());
    }
}
