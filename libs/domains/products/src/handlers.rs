//! HTTP handlers for the product catalog

use axum::{
    Json, Router,
    extract::{OriginalUri, Query, State},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_helpers::{
    AppError, FormOrJson, IdPath,
    errors::responses::{
        BadRequestIdResponse, BadRequestParameterResponse, InternalServerErrorResponse,
        NotFoundResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::datastore::Datastore;
use crate::error::ProductResult;
use crate::models::{
    AutosearchParams, ListParams, Notice, Product, ProductForm, ProductPage, ProductParams,
};
use crate::service::ProductService;

/// Products per list page.
pub const PER_PAGE: usize = 10;

pub const ADDED_NOTICE: &str = "Added Product";
pub const UPDATED_NOTICE: &str = "Updated Product";

/// OpenAPI documentation for the products endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        new_product,
        create_product,
        get_product,
        edit_product,
        update_product,
        delete_product,
        autosearch,
    ),
    components(
        schemas(Product, ProductParams, ProductPage, ProductForm, Notice),
        responses(
            NotFoundResponse,
            BadRequestIdResponse,
            BadRequestParameterResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Products", description = "Product catalog endpoints")
    )
)]
pub struct ApiDoc;

/// Create the products router with all HTTP endpoints
pub fn router<D: Datastore + ?Sized + 'static>(service: ProductService<D>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/new", get(new_product))
        .route("/autosearch", get(autosearch))
        .route("/autocomplete", get(autosearch))
        .route(
            "/{id}",
            get(get_product)
                .put(update_product)
                .patch(update_product)
                .post(update_product)
                .delete(delete_product),
        )
        .route("/{id}/edit", get(edit_product))
        .with_state(shared_service)
}

/// `303 See Other` to `location`, carrying the one-shot notice in the body.
fn redirect(location: String, notice: Option<&str>) -> Response {
    let headers = [(header::LOCATION, location.clone())];
    match notice {
        Some(notice) => (
            StatusCode::SEE_OTHER,
            headers,
            Json(Notice {
                notice: notice.to_string(),
                location,
            }),
        )
            .into_response(),
        None => (StatusCode::SEE_OTHER, headers).into_response(),
    }
}

fn unprocessable(product: Product) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ProductForm::from(product))).into_response()
}

/// `/api/products` + id -> `/api/products/{id}`
fn member_path(collection: &Uri, id: i64) -> String {
    format!("{}/{}", collection.path().trim_end_matches('/'), id)
}

/// `/api/products/{id}` -> `/api/products`
fn collection_path(member: &Uri) -> String {
    let path = member.path().trim_end_matches('/');
    path.rsplit_once('/')
        .map_or_else(|| "/".to_string(), |(parent, _)| parent.to_string())
}

/// List products, one page at a time
#[utoipa::path(
    get,
    path = "",
    tag = "Products",
    params(ListParams),
    responses(
        (status = 200, description = "A page of products", body = ProductPage),
        (status = 400, response = BadRequestParameterResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<D: Datastore + ?Sized>(
    State(service): State<Arc<ProductService<D>>>,
    Query(params): Query<ListParams>,
) -> ProductResult<Json<ProductPage>> {
    let page = service.query(PER_PAGE, params.cursor.as_deref()).await?;
    Ok(Json(page))
}

/// Blank product form
#[utoipa::path(
    get,
    path = "/new",
    tag = "Products",
    responses(
        (status = 200, description = "Empty product form", body = ProductForm)
    )
)]
async fn new_product() -> Json<ProductForm> {
    Json(ProductForm::from(Product::default()))
}

/// Create a product
#[utoipa::path(
    post,
    path = "",
    tag = "Products",
    request_body = ProductParams,
    responses(
        (status = 303, description = "Created; redirects to the product", body = Notice),
        (status = 422, description = "Validation failed", body = ProductForm),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product<D: Datastore + ?Sized>(
    State(service): State<Arc<ProductService<D>>>,
    OriginalUri(uri): OriginalUri,
    FormOrJson(params): FormOrJson<ProductParams>,
) -> ProductResult<Response> {
    let mut product = Product::new(params);

    if !service.save(&mut product).await? {
        return Ok(unprocessable(product));
    }

    let location = match product.id {
        Some(id) => member_path(&uri, id),
        None => uri.path().to_string(),
    };
    Ok(redirect(location, Some(ADDED_NOTICE)))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<D: Datastore + ?Sized>(
    State(service): State<Arc<ProductService<D>>>,
    IdPath(id): IdPath,
) -> ProductResult<Json<Product>> {
    let product = service.get(id).await?;
    Ok(Json(product))
}

/// Edit form for an existing product
#[utoipa::path(
    get,
    path = "/{id}/edit",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product form", body = ProductForm),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn edit_product<D: Datastore + ?Sized>(
    State(service): State<Arc<ProductService<D>>>,
    IdPath(id): IdPath,
) -> ProductResult<Json<ProductForm>> {
    let product = service.get(id).await?;
    Ok(Json(ProductForm::from(product)))
}

/// Update a product
#[utoipa::path(
    method(put, patch, post),
    path = "/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ProductParams,
    responses(
        (status = 303, description = "Updated; redirects to the product", body = Notice),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, description = "Validation failed", body = ProductForm),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_product<D: Datastore + ?Sized>(
    State(service): State<Arc<ProductService<D>>>,
    IdPath(id): IdPath,
    OriginalUri(uri): OriginalUri,
    FormOrJson(params): FormOrJson<ProductParams>,
) -> ProductResult<Response> {
    let mut product = service.get(id).await?;

    if !service.update(&mut product, params).await? {
        return Ok(unprocessable(product));
    }

    let location = uri.path().trim_end_matches('/').to_string();
    Ok(redirect(location, Some(UPDATED_NOTICE)))
}

/// Delete a product; always redirects to the list
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 303, description = "Deleted (or already absent); redirects to the list"),
        (status = 400, response = BadRequestIdResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_product<D: Datastore + ?Sized>(
    State(service): State<Arc<ProductService<D>>>,
    IdPath(id): IdPath,
    OriginalUri(uri): OriginalUri,
) -> ProductResult<Response> {
    if service.find(id).await?.is_none() {
        tracing::debug!(product_id = id, "Deleting a product that does not exist");
    }
    service.destroy(id).await?;

    Ok(redirect(collection_path(&uri), None))
}

/// JSONP callbacks are limited to dotted JavaScript identifiers.
fn is_valid_callback(callback: &str) -> bool {
    !callback.is_empty()
        && callback.len() <= 128
        && callback
            .split('.')
            .all(|part| {
                let mut chars = part.chars();
                chars
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
            })
}

/// Prefix search on `downcase_name` for autocomplete widgets
///
/// With a `callback` the JSON is wrapped as JSONP: `/**/callback(json)`.
#[utoipa::path(
    get,
    path = "/autosearch",
    tag = "Products",
    params(AutosearchParams),
    responses(
        (status = 200, description = "Up to five matching products", body = Vec<Product>),
        (status = 400, response = BadRequestParameterResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn autosearch<D: Datastore + ?Sized>(
    State(service): State<Arc<ProductService<D>>>,
    Query(params): Query<AutosearchParams>,
) -> Result<Response, AppError> {
    let callback = params.callback.as_deref().filter(|c| !c.is_empty());
    if let Some(callback) = callback {
        if !is_valid_callback(callback) {
            return Err(AppError::BadRequest(format!(
                "Invalid JSONP callback '{}'",
                callback
            )));
        }
    }

    let products = service.autosearch(&params.phrase).await?;

    match callback {
        None => Ok(Json(products).into_response()),
        Some(callback) => {
            let json = serde_json::to_string(&products)
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;
            Ok((
                [(header::CONTENT_TYPE, "text/javascript")],
                format!("/**/{}({})", callback, json),
            )
                .into_response())
        }
    }
}
