//! MongoDB implementation of [`Datastore`]
//!
//! Each kind lives in its own collection, named after the kind, as documents
//! `{ _id: <i64>, <property>: <scalar>, ... }`. Ids come from a `counters`
//! collection (`{ _id: <kind>, seq: <i64> }`) bumped atomically per insert
//! and raised to any id saved explicitly.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Bson, Document, doc},
    options::{FindOptions, ReturnDocument},
};
use std::collections::BTreeMap;
use tracing::instrument;

use super::{
    Cursor, Datastore, DatastoreError, DatastoreResult, Entity, FilterOp, Key, Query,
    QueryResults, Value,
};

const COUNTERS_COLLECTION: &str = "counters";

pub struct MongoDatastore {
    db: Database,
    counters: Collection<Document>,
}

impl MongoDatastore {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            counters: db.collection::<Document>(COUNTERS_COLLECTION),
        }
    }

    fn collection(&self, kind: &str) -> Collection<Document> {
        self.db.collection::<Document>(kind)
    }

    /// Next id for `kind`, starting at 1.
    async fn allocate_id(&self, kind: &str) -> DatastoreResult<i64> {
        let counter = self
            .counters
            .find_one_and_update(doc! { "_id": kind }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| malformed(kind, "id counter upsert returned no document"))?;

        bson_integer(counter.get("seq"))
            .ok_or_else(|| malformed(kind, "id counter has a non-integer 'seq'"))
    }

    /// Keep the counter at or above `id` so allocation never reuses it.
    async fn reserve_id(&self, kind: &str, id: i64) -> DatastoreResult<()> {
        self.counters
            .update_one(doc! { "_id": kind }, doc! { "$max": { "seq": id } })
            .upsert(true)
            .await?;
        Ok(())
    }

    /// Build the MongoDB filter for a query, including the cursor position.
    ///
    /// Filters on the same property merge into one operator document. An
    /// ordered query only matches documents that have the sort property.
    fn build_filter(query: &Query) -> Document {
        let mut by_property: BTreeMap<&str, Document> = BTreeMap::new();
        for filter in &query.filters {
            by_property
                .entry(filter.property.as_str())
                .or_default()
                .insert(operator(filter.op), to_bson(&filter.value));
        }
        if let Some(order) = query.order.as_deref() {
            by_property
                .entry(order)
                .or_default()
                .insert("$exists", true);
        }

        let mut filter = Document::new();
        for (property, conditions) in by_property {
            filter.insert(property, conditions);
        }

        match &query.start_cursor {
            None => filter,
            Some(cursor) => {
                let resume = Self::resume_filter(cursor, query.order.as_deref());
                if filter.is_empty() {
                    resume
                } else {
                    doc! { "$and": [filter, resume] }
                }
            }
        }
    }

    /// Documents strictly after the cursor in `(order, _id)` order.
    fn resume_filter(cursor: &Cursor, order: Option<&str>) -> Document {
        match order {
            None => doc! { "_id": { "$gt": cursor.id } },
            Some(property) => {
                let value = cursor.value.as_ref().map_or(Bson::Null, to_bson);

                let mut after_value = Document::new();
                after_value.insert(property, doc! { "$gt": value.clone() });

                let mut same_value = Document::new();
                same_value.insert(property, value);
                same_value.insert("_id", doc! { "$gt": cursor.id });

                doc! { "$or": [after_value, same_value] }
            }
        }
    }

    fn sort_document(order: Option<&str>) -> Document {
        let mut sort = Document::new();
        if let Some(property) = order {
            sort.insert(property, 1);
        }
        sort.insert("_id", 1);
        sort
    }
}

fn operator(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "$eq",
        FilterOp::Lt => "$lt",
        FilterOp::Lte => "$lte",
        FilterOp::Gt => "$gt",
        FilterOp::Gte => "$gte",
    }
}

fn malformed(kind: &str, message: &str) -> DatastoreError {
    DatastoreError::Malformed {
        kind: kind.to_string(),
        message: message.to_string(),
    }
}

fn bson_integer(value: Option<&Bson>) -> Option<i64> {
    match value? {
        Bson::Int64(n) => Some(*n),
        Bson::Int32(n) => Some(i64::from(*n)),
        _ => None,
    }
}

fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Boolean(b) => Bson::Boolean(*b),
        Value::Integer(n) => Bson::Int64(*n),
        Value::Double(n) => Bson::Double(*n),
        Value::String(s) => Bson::String(s.clone()),
    }
}

/// Scalar BSON only; arrays, subdocuments and the like are not entity properties.
fn from_bson(value: &Bson) -> Option<Value> {
    match value {
        Bson::Null => Some(Value::Null),
        Bson::Boolean(b) => Some(Value::Boolean(*b)),
        Bson::Int32(n) => Some(Value::Integer(i64::from(*n))),
        Bson::Int64(n) => Some(Value::Integer(*n)),
        Bson::Double(n) => Some(Value::Double(*n)),
        Bson::String(s) => Some(Value::String(s.clone())),
        _ => None,
    }
}

fn to_document(id: i64, entity: &Entity) -> Document {
    let mut document = doc! { "_id": id };
    for (name, value) in &entity.properties {
        document.insert(name.as_str(), to_bson(value));
    }
    document
}

fn from_document(kind: &str, document: Document) -> DatastoreResult<Entity> {
    let id = bson_integer(document.get("_id"))
        .ok_or_else(|| malformed(kind, "document '_id' is not an integer"))?;

    let mut entity = Entity::new(Key::with_id(kind, id));
    for (name, value) in document {
        if name == "_id" {
            continue;
        }
        match from_bson(&value) {
            Some(value) => {
                entity.properties.insert(name, value);
            }
            None => tracing::debug!(kind, id, property = %name, "Skipping non-scalar property"),
        }
    }
    Ok(entity)
}

#[async_trait]
impl Datastore for MongoDatastore {
    #[instrument(skip(self, query), fields(kind = %query.kind, limit = ?query.limit))]
    async fn run_query(&self, query: Query) -> DatastoreResult<QueryResults> {
        let order = query.order.as_deref();
        if let Some(cursor) = &query.start_cursor {
            cursor.check_order(order)?;
        }
        // MongoDB treats a zero limit as "no limit".
        if query.limit == Some(0) {
            return Ok(QueryResults::default());
        }

        let filter = Self::build_filter(&query);
        let options = FindOptions::builder()
            .limit(query.limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX)))
            .sort(Self::sort_document(order))
            .build();

        let cursor = self
            .collection(&query.kind)
            .find(filter)
            .with_options(options)
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        let entities = documents
            .into_iter()
            .map(|document| from_document(&query.kind, document))
            .collect::<DatastoreResult<Vec<_>>>()?;

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
        let document = self
            .collection(&key.kind)
            .find_one(doc! { "_id": id })
            .await?;

        document
            .map(|document| from_document(&key.kind, document))
            .transpose()
    }

    #[instrument(skip(self, entity), fields(key = %entity.key))]
    async fn save(&self, entity: Entity) -> DatastoreResult<Key> {
        let kind = entity.key.kind.as_str();
        let collection = self.collection(kind);

        let id = match entity.key.id {
            Some(id) => {
                collection
                    .replace_one(doc! { "_id": id }, to_document(id, &entity))
                    .upsert(true)
                    .await?;
                self.reserve_id(kind, id).await?;
                id
            }
            None => {
                let id = self.allocate_id(kind).await?;
                collection.insert_one(to_document(id, &entity)).await?;
                id
            }
        };

        tracing::info!(kind, id, "Entity saved");
        Ok(Key::with_id(kind, id))
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: Key) -> DatastoreResult<()> {
        let id = key.require_id()?;
        let result = self
            .collection(&key.kind)
            .delete_one(doc! { "_id": id })
            .await?;

        tracing::info!(kind = %key.kind, id, deleted = result.deleted_count, "Entity deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> DatastoreResult<()> {
        database::mongodb::check_health(&self.db)
            .await
            .map_err(DatastoreError::Unavailable)
    }
}
