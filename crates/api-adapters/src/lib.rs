//! # api-adapters
//!
//! The HTTP surface: an axum router over the auth and product services.
//! Handlers translate between wire DTOs and domain types; all policy
//! lives in the services.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod schemas;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;

use services::{AuthService, ProductService};

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub products: Arc<ProductService>,
    /// Public URL prefix prepended to storage-relative image paths.
    pub media_url_prefix: Arc<str>,
}

/// Well above the 2 MiB per-image cap, leaving room for multipart framing
/// and multi-file batches.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Builds the versioned API router. Mounted as-is by the binary, which
/// adds transport-level layers (tracing, CORS, path normalization).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/login/access-token", post(handlers::login))
        .route("/api/v1/login/refresh-token", post(handlers::refresh))
        .route(
            "/api/v1/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/api/v1/products/{id}",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/api/v1/products/{id}/images",
            post(handlers::upload_images),
        )
        .route(
            "/api/v1/products/{id}/images/{image_id}",
            delete(handlers::delete_image),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
