//! Type-safe error codes for API responses.
//!
//! Each code has a string identifier for clients, an integer for logs and
//! metrics, and a default message.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::InvalidId;
//! assert_eq!(code.as_str(), "INVALID_ID");
//! assert_eq!(code.code(), 1002);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    /// Path identifier is not a valid integer key
    InvalidId,
    /// JSON body could not be extracted
    JsonExtraction,
    /// Requested resource was not found
    NotFound,
    /// Request payload is semantically incorrect
    UnprocessableEntity,
    /// Form body could not be extracted
    FormExtraction,
    /// Query or body parameter has an invalid value
    InvalidParameter,
    /// Body content type is neither a form nor JSON
    UnsupportedMediaType,

    // Server errors
    /// An unexpected internal server error occurred
    InternalError,
    /// Service is temporarily unavailable
    ServiceUnavailable,

    // Datastore errors (2000-2999)
    /// The backing document store rejected or failed a request
    DatastoreError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidId => "INVALID_ID",
            Self::JsonExtraction => "JSON_EXTRACTION",
            Self::NotFound => "NOT_FOUND",
            Self::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            Self::FormExtraction => "FORM_EXTRACTION",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::DatastoreError => "DATASTORE_ERROR",
        }
    }

    /// Integer code for structured logs.
    ///
    /// - 1000-1999: request and server errors
    /// - 2000-2999: datastore errors
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidId => 1002,
            Self::JsonExtraction => 1003,
            Self::NotFound => 1004,
            Self::InternalError => 1005,
            Self::UnprocessableEntity => 1009,
            Self::ServiceUnavailable => 1011,
            Self::FormExtraction => 1012,
            Self::InvalidParameter => 1013,
            Self::UnsupportedMediaType => 1014,
            Self::DatastoreError => 2003,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::InvalidId => "Invalid identifier",
            Self::JsonExtraction => "Failed to parse request body",
            Self::NotFound => "Resource not found",
            Self::UnprocessableEntity => "Request cannot be processed",
            Self::FormExtraction => "Failed to parse form body",
            Self::InvalidParameter => "Invalid request parameter",
            Self::UnsupportedMediaType => "Expected a form or JSON body",
            Self::InternalError => "An internal server error occurred",
            Self::ServiceUnavailable => "Service is temporarily unavailable",
            Self::DatastoreError => "Datastore error occurred",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
