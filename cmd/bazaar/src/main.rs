//! # bazaar
//!
//! The entry point: loads settings, assembles the adapters behind their
//! ports, and serves the API.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Context;
use axum::{extract::Request, ServiceExt};
use chrono::Duration;
use tower::Layer;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use api_adapters::{router, AppState};
use auth_adapters::{Argon2CredentialHasher, JwtTokenCodec};
use configs::Settings;
use domains::{ImageRepo, ListingCache, ProductRepo, UserRepo};
use services::{AuthService, ImageService, ProductService};
use storage_adapters::{LocalMediaStorage, MemoryListingCache, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = Arc::new(
        SqliteStore::connect(&settings.database.url)
            .await
            .context("failed to open database")?,
    );
    let users: Arc<dyn UserRepo> = store.clone();
    let products_repo: Arc<dyn ProductRepo> = store.clone();
    let images_repo: Arc<dyn ImageRepo> = store.clone();

    let auth = Arc::new(AuthService::new(
        users,
        Arc::new(JwtTokenCodec::new(&settings.jwt.secret)),
        Arc::new(Argon2CredentialHasher),
        Duration::minutes(settings.jwt.access_ttl_minutes),
        Duration::days(settings.jwt.refresh_ttl_days),
    ));

    let cache: Arc<dyn ListingCache> = Arc::new(MemoryListingCache::new(
        StdDuration::from_secs(settings.cache.ttl_seconds),
        settings.cache.max_capacity,
    ));
    let media = ImageService::new(
        images_repo.clone(),
        Arc::new(LocalMediaStorage::new(&settings.media.root)),
    );
    let products = Arc::new(ProductService::new(
        products_repo,
        images_repo,
        cache,
        media,
    ));

    let state = AppState {
        auth,
        products,
        media_url_prefix: settings.media.url_prefix.clone().into(),
    };

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());
    let app = NormalizePathLayer::trim_trailing_slash().layer(app);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "bazaar listening");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .await
        .context("server exited")?;
    Ok(())
}
