//! Product access layer
//!
//! Maps [`Product`] records onto store entities, builds the paging and
//! prefix-search queries, and gates every write on validation.

use std::sync::Arc;
use tracing::instrument;

use crate::datastore::{Cursor, Datastore, FilterOp, Key, Query};
use crate::entity::KIND;
use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductPage, ProductParams};

/// Maximum number of autocomplete suggestions.
pub const AUTOSEARCH_LIMIT: usize = 5;

/// Upper bound appended to a search term to turn it into a prefix range.
pub const HIGH_SENTINEL: char = char::MAX;

/// Product service providing the catalog's data operations
///
/// Validation failures are reported as `Ok(false)` with the errors attached to
/// the product; `Err` is reserved for store and cursor failures.
pub struct ProductService<D: Datastore + ?Sized> {
    datastore: Arc<D>,
}

impl<D: Datastore> ProductService<D> {
    /// Create a new ProductService owning the given datastore
    pub fn new(datastore: D) -> Self {
        Self {
            datastore: Arc::new(datastore),
        }
    }
}

impl<D: Datastore + ?Sized> ProductService<D> {
    /// Create a ProductService over a datastore shared with other components
    pub fn from_shared(datastore: Arc<D>) -> Self {
        Self { datastore }
    }

    /// One page of products in store order.
    ///
    /// A next-page cursor is returned only when the page is full, so a
    /// returned cursor may still lead to an empty page. A zero `limit` is
    /// rejected with [`ProductError::EmptyPage`].
    #[instrument(skip(self, cursor), fields(has_cursor = cursor.is_some()))]
    pub async fn query(&self, limit: usize, cursor: Option<&str>) -> ProductResult<ProductPage> {
        if limit == 0 {
            return Err(ProductError::EmptyPage);
        }

        let mut query = Query::new(KIND).limit(limit);
        if let Some(token) = cursor.filter(|token| !token.trim().is_empty()) {
            query = query.start(Cursor::decode(token)?);
        }

        let results = self.datastore.run_query(query).await?;
        let next_cursor = if results.entities.len() == limit {
            results.end_cursor.map(|cursor| cursor.encode())
        } else {
            None
        };

        let products: Vec<Product> = results
            .entities
            .into_iter()
            .map(Product::from_entity)
            .collect();
        tracing::debug!(count = products.len(), has_next = next_cursor.is_some(), "Listed products");

        Ok(ProductPage {
            products,
            cursor: next_cursor,
        })
    }

    /// Look up a product by id. Absent is not an error.
    #[instrument(skip(self))]
    pub async fn find(&self, id: i64) -> ProductResult<Option<Product>> {
        let entity = self.datastore.lookup(Key::with_id(KIND, id)).await?;
        Ok(entity.map(Product::from_entity))
    }

    /// Like [`find`](Self::find) but absent becomes [`ProductError::NotFound`].
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ProductResult<Product> {
        self.find(id).await?.ok_or(ProductError::NotFound(id))
    }

    /// Validate and write the product, assigning its id on first save.
    ///
    /// Returns `Ok(false)` without touching the store when validation fails.
    #[instrument(skip(self, product), fields(product_id = ?product.id))]
    pub async fn save(&self, product: &mut Product) -> ProductResult<bool> {
        if !product.check_valid() {
            tracing::info!(errors = ?product.error_messages(), "Product failed validation");
            return Ok(false);
        }

        let key = self.datastore.save(product.to_entity()).await?;
        let id = key
            .id
            .ok_or_else(|| ProductError::Datastore(format!("store returned incomplete key {}", key)))?;
        product.id = Some(id);

        tracing::info!(product_id = id, "Product saved successfully");
        Ok(true)
    }

    /// Apply the permitted attributes, then [`save`](Self::save).
    #[instrument(skip(self, product, params), fields(product_id = ?product.id))]
    pub async fn update(&self, product: &mut Product, params: ProductParams) -> ProductResult<bool> {
        product.apply(params);
        self.save(product).await
    }

    /// Delete by id. Deleting a missing product succeeds.
    #[instrument(skip(self))]
    pub async fn destroy(&self, id: i64) -> ProductResult<()> {
        self.datastore.delete(Key::with_id(KIND, id)).await?;
        tracing::info!(product_id = id, "Product deleted");
        Ok(())
    }

    /// Up to five products whose `downcase_name` starts with `term`, ascending.
    ///
    /// The term is used as given; callers lower-case it if they want
    /// case-insensitive matching.
    #[instrument(skip(self))]
    pub async fn autosearch(&self, term: &str) -> ProductResult<Vec<Product>> {
        let upper = format!("{}{}", term, HIGH_SENTINEL);
        let query = Query::new(KIND)
            .filter("downcase_name", FilterOp::Gte, term)
            .filter("downcase_name", FilterOp::Lt, upper)
            .order_asc("downcase_name")
            .limit(AUTOSEARCH_LIMIT);

        let results = self.datastore.run_query(query).await?;
        Ok(results
            .entities
            .into_iter()
            .map(Product::from_entity)
            .collect())
    }

    /// Readiness probe for the underlying store.
    pub async fn ping(&self) -> ProductResult<()> {
        Ok(self.datastore.ping().await?)
    }
}

impl<D: Datastore + ?Sized> Clone for ProductService<D> {
    fn clone(&self) -> Self {
        Self {
            datastore: Arc::clone(&self.datastore),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::{
        DatastoreError, Entity, MockDatastore, PropertyFilter, QueryResults, Value,
    };
    use mockall::predicate::eq;

    fn params(name: &str, downcase_name: &str, image_url: &str) -> ProductParams {
        ProductParams {
            name: Some(name.to_string()),
            downcase_name: Some(downcase_name.to_string()),
            image_url: Some(image_url.to_string()),
        }
    }

    fn stored(id: i64, name: &str) -> Entity {
        let mut entity = Entity::new(Key::with_id(KIND, id));
        entity.set("name", name);
        entity.set("downcase_name", name.to_lowercase());
        entity.set("image_url", format!("http://x/{}.png", id));
        entity
    }

    #[tokio::test]
    async fn test_invalid_product_never_reaches_store() {
        let mut mock = MockDatastore::new();
        mock.expect_save().never();

        let service = ProductService::new(mock);
        let mut product = Product::new(params("Go", "", "http://x/go.png"));

        assert!(!service.save(&mut product).await.unwrap());
        assert!(product.id.is_none());
        assert!(product.error_messages().contains_key("downcase_name"));
    }

    #[tokio::test]
    async fn test_save_assigns_id_from_store() {
        let mut mock = MockDatastore::new();
        mock.expect_save()
            .withf(|entity| {
                !entity.key.is_complete()
                    && entity.get("downcase_name") == Some(&Value::from("go"))
            })
            .times(1)
            .returning(|entity| Ok(Key::with_id(entity.key.kind, 17)));

        let service = ProductService::new(mock);
        let mut product = Product::new(params("Go", "go", "http://x/go.png"));

        assert!(service.save(&mut product).await.unwrap());
        assert_eq!(product.id, Some(17));
        assert!(product.is_persisted());
    }

    #[tokio::test]
    async fn test_save_store_failure_is_error_not_false() {
        let mut mock = MockDatastore::new();
        mock.expect_save()
            .returning(|_| Err(DatastoreError::Unavailable("connection reset".into())));

        let service = ProductService::new(mock);
        let mut product = Product::new(params("Go", "go", "http://x/go.png"));

        let result = service.save(&mut product).await;
        assert!(matches!(result, Err(ProductError::Datastore(_))));
        assert!(product.id.is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_applies_params() {
        let mut mock = MockDatastore::new();
        mock.expect_save()
            .withf(|entity| {
                entity.key == Key::with_id(KIND, 4)
                    && entity.get("name") == Some(&Value::from("Rust"))
                    && entity.get("image_url") == Some(&Value::from("http://x/4.png"))
            })
            .times(1)
            .returning(|entity| Ok(entity.key));

        let service = ProductService::new(mock);
        let mut product = Product::from_entity(stored(4, "Go"));
        let changes = ProductParams {
            name: Some("Rust".to_string()),
            ..Default::default()
        };

        assert!(service.update(&mut product, changes).await.unwrap());
        assert_eq!(product.id, Some(4));
    }

    #[tokio::test]
    async fn test_query_returns_cursor_only_for_full_page() {
        let mut mock = MockDatastore::new();
        mock.expect_run_query()
            .withf(|query| query.kind == KIND && query.limit == Some(2) && query.filters.is_empty())
            .times(1)
            .returning(|_| {
                let entities = vec![stored(1, "A"), stored(2, "B")];
                let end_cursor = Cursor::after(&entities[1], None);
                Ok(QueryResults {
                    entities,
                    end_cursor,
                })
            });
        mock.expect_run_query()
            .withf(|query| query.limit == Some(3))
            .times(1)
            .returning(|_| {
                let entities = vec![stored(1, "A")];
                let end_cursor = Cursor::after(&entities[0], None);
                Ok(QueryResults {
                    entities,
                    end_cursor,
                })
            });

        let service = ProductService::new(mock);

        let full = service.query(2, None).await.unwrap();
        assert_eq!(full.products.len(), 2);
        let token = full.cursor.expect("full page has a cursor");
        assert_eq!(Cursor::decode(&token).unwrap().id, 2);

        let partial = service.query(3, None).await.unwrap();
        assert_eq!(partial.products.len(), 1);
        assert!(partial.cursor.is_none());
    }

    #[tokio::test]
    async fn test_query_passes_decoded_cursor() {
        let token = Cursor {
            id: 10,
            order: None,
            value: None,
        }
        .encode();

        let mut mock = MockDatastore::new();
        mock.expect_run_query()
            .withf(|query| query.start_cursor.as_ref().map(|c| c.id) == Some(10))
            .times(1)
            .returning(|_| Ok(QueryResults::default()));

        let service = ProductService::new(mock);
        let page = service.query(10, Some(&token)).await.unwrap();
        assert!(page.products.is_empty());
        assert!(page.cursor.is_none());
    }

    #[tokio::test]
    async fn test_query_rejects_malformed_cursor_before_store() {
        let mut mock = MockDatastore::new();
        mock.expect_run_query().never();

        let service = ProductService::new(mock);
        let result = service.query(10, Some("%%%")).await;
        assert!(matches!(result, Err(ProductError::InvalidCursor(_))));
    }

    #[tokio::test]
    async fn test_query_rejects_zero_limit_before_store() {
        let mut mock = MockDatastore::new();
        mock.expect_run_query().never();

        let service = ProductService::new(mock);
        assert!(matches!(
            service.query(0, None).await,
            Err(ProductError::EmptyPage)
        ));
    }

    #[tokio::test]
    async fn test_find_absent_is_none() {
        let mut mock = MockDatastore::new();
        mock.expect_lookup()
            .with(eq(Key::with_id(KIND, 99)))
            .returning(|_| Ok(None));

        let service = ProductService::new(mock);
        assert!(service.find(99).await.unwrap().is_none());
        assert!(matches!(service.get(99).await, Err(ProductError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_destroy_deletes_by_key() {
        let mut mock = MockDatastore::new();
        mock.expect_delete()
            .with(eq(Key::with_id(KIND, 5)))
            .times(2)
            .returning(|_| Ok(()));

        let service = ProductService::new(mock);
        service.destroy(5).await.unwrap();
        service.destroy(5).await.unwrap();
    }

    #[tokio::test]
    async fn test_autosearch_builds_prefix_range_query() {
        let mut mock = MockDatastore::new();
        mock.expect_run_query()
            .withf(|query| {
                query.kind == KIND
                    && query.order.as_deref() == Some("downcase_name")
                    && query.limit == Some(AUTOSEARCH_LIMIT)
                    && query.filters
                        == vec![
                            PropertyFilter {
                                property: "downcase_name".into(),
                                op: FilterOp::Gte,
                                value: Value::from("Ba"),
                            },
                            PropertyFilter {
                                property: "downcase_name".into(),
                                op: FilterOp::Lt,
                                value: Value::from(format!("Ba{}", char::MAX)),
                            },
                        ]
            })
            .times(1)
            .returning(|_| Ok(QueryResults::default()));

        let service = ProductService::new(mock);
        // Not lower-cased on the way through.
        assert!(service.autosearch("Ba").await.unwrap().is_empty());
    }
}
