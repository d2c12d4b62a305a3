//! Custom extractors for Axum handlers.
//!
//! These reduce boilerplate and route rejections through [`AppError`](crate::errors::AppError)
//! so every failure shares the same JSON error shape.

pub mod form_or_json;
pub mod id_path;

pub use form_or_json::FormOrJson;
pub use id_path::IdPath;
