//! Body extractor accepting either an HTML form post or a JSON document.

use crate::errors::AppError;
use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;

/// Deserializes the request body from `application/x-www-form-urlencoded`
/// or `application/json`, chosen by the `Content-Type` header.
///
/// No validation happens here; handlers that re-render a form with field
/// errors need the raw payload even when it is invalid.
///
/// # Example
/// ```ignore
/// use axum::Router;
/// use axum::routing::post;
/// use axum_helpers::extractors::FormOrJson;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Params {
///     name: Option<String>,
/// }
///
/// async fn create(FormOrJson(params): FormOrJson<Params>) -> String {
///     params.name.unwrap_or_default()
/// }
///
/// let app = Router::new().route("/products", post(create));
/// ```
#[derive(Debug, Clone)]
pub struct FormOrJson<T>(pub T);

fn media_type(req: &Request) -> String {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

impl<T, S> FromRequest<S> for FormOrJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let media_type = media_type(&req);

        if media_type == "application/json" || media_type.ends_with("+json") {
            let Json(data) = Json::<T>::from_request(req, state).await?;
            Ok(FormOrJson(data))
        } else if media_type == "application/x-www-form-urlencoded" {
            let Form(data) = Form::<T>::from_request(req, state).await?;
            Ok(FormOrJson(data))
        } else {
            Err(AppError::UnsupportedMediaType(format!(
                "expected a form or JSON body, got '{}'",
                media_type
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing::post};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Params {
        name: Option<String>,
    }

    fn app() -> Router {
        Router::new().route(
            "/",
            post(|FormOrJson(params): FormOrJson<Params>| async move {
                params.name.unwrap_or_default()
            }),
        )
    }

    async fn send(content_type: &str, body: &'static str) -> (StatusCode, String) {
        let response = app()
            .oneshot(
                axum::http::Request::post("/")
                    .header(CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_accepts_json() {
        let (status, body) = send("application/json", r#"{"name":"Go"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Go");
    }

    #[tokio::test]
    async fn test_accepts_form_with_charset() {
        let (status, body) = send(
            "application/x-www-form-urlencoded; charset=utf-8",
            "name=Rust+Book",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Rust Book");
    }

    #[tokio::test]
    async fn test_rejects_other_media_types() {
        let (status, _) = send("text/plain", "name=Go").await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_malformed_json_is_client_error() {
        let (status, _) = send("application/json", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
