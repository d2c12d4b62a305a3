//! Products Domain
//!
//! The catalog's product records, stored in a document store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints (list, show, forms, writes, autosearch)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Access layer: validation, paging, prefix search
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Entity    │  ← Product <-> store entity mapping
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Datastore  │  ← Store primitives (trait + MongoDB / in-memory)
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_products::{handlers, MongoDatastore, ProductService};
//! use mongodb::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017").await?;
//! let db = client.database("catalog");
//!
//! let service = ProductService::new(MongoDatastore::new(&db));
//! let router = handlers::router(service);
//! # Ok(())
//! # }
//! ```

pub mod datastore;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod service;

// Re-export commonly used types
pub use datastore::{Datastore, DatastoreError, MemoryDatastore, MongoDatastore};
pub use entity::KIND;
pub use error::{ProductError, ProductResult};
pub use handlers::ApiDoc;
pub use models::{Notice, Product, ProductForm, ProductPage, ProductParams};
pub use service::ProductService;
