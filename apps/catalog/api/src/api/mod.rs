//! API routes module

pub mod health;

use axum::Router;
use domain_products::{ProductService, handlers};
use std::sync::Arc;

use crate::state::AppState;

/// Create all API routes
pub fn routes(state: &AppState) -> Router {
    let service = ProductService::from_shared(Arc::clone(&state.datastore));

    Router::new().nest("/products", handlers::router(service))
}
