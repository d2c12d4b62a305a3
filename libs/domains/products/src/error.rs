use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

use crate::datastore::DatastoreError;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(i64),

    #[error("Invalid pagination cursor: {0}")]
    InvalidCursor(String),

    #[error("Page size must be at least 1")]
    EmptyPage,

    #[error("Datastore error: {0}")]
    Datastore(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

/// Convert ProductError to AppError for standardized error responses
impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(id) => AppError::NotFound(format!("Product {} not found", id)),
            ProductError::InvalidCursor(reason) => {
                AppError::BadRequest(format!("Invalid pagination cursor: {}", reason))
            }
            ProductError::EmptyPage => {
                AppError::BadRequest("Page size must be at least 1".to_string())
            }
            ProductError::Datastore(msg) => AppError::Datastore(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<DatastoreError> for ProductError {
    fn from(err: DatastoreError) -> Self {
        match err {
            DatastoreError::InvalidCursor(reason) => ProductError::InvalidCursor(reason),
            other => ProductError::Datastore(other.to_string()),
        }
    }
}
