//! Application state management

use domain_products::Datastore;
use mongodb::Client;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub datastore: Arc<dyn Datastore>,
    /// Kept so shutdown can release the connection pool
    pub mongo_client: Option<Client>,
}
