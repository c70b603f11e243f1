//! Shared fixture for the HTTP integration tests: a full app wired onto
//! an in-memory database and a temporary media directory, driven
//! in-process through `tower::ServiceExt::oneshot`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::util::ServiceExt;

use api_adapters::{router, AppState};
use auth_adapters::{Argon2CredentialHasher, JwtTokenCodec};
use domains::{ImageRepo, ListingCache, ProductRepo, UserRepo};
use services::{AuthService, ImageService, ProductService};
use storage_adapters::{LocalMediaStorage, MemoryListingCache, SqliteStore};

pub const MIB: usize = 1024 * 1024;

pub struct TestApp {
    pub app: Router,
    /// Owns the on-disk media root; dropped with the fixture.
    pub media_root: tempfile::TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let media_root = tempfile::tempdir().expect("tempdir");

        let store = Arc::new(
            SqliteStore::connect("sqlite::memory:")
                .await
                .expect("in-memory database"),
        );
        let users: Arc<dyn UserRepo> = store.clone();
        let products_repo: Arc<dyn ProductRepo> = store.clone();
        let images_repo: Arc<dyn ImageRepo> = store.clone();

        let auth = Arc::new(AuthService::new(
            users,
            Arc::new(JwtTokenCodec::new(&SecretString::from(
                "integration-test-secret".to_string(),
            ))),
            Arc::new(Argon2CredentialHasher),
            Duration::minutes(30),
            Duration::days(7),
        ));

        let cache: Arc<dyn ListingCache> = Arc::new(MemoryListingCache::new(
            StdDuration::from_secs(60),
            1_000,
        ));
        let media = ImageService::new(
            images_repo.clone(),
            Arc::new(LocalMediaStorage::new(media_root.path())),
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
            media_url_prefix: "/media".into(),
        };

        Self {
            app: router(state),
            media_root,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("infallible service");
        let status = response.status();
        (status, read_json(response).await)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(build(Request::get(path), token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(
            build(Request::delete(path), token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        self.request(
            build(Request::post(path), token)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn put_json(
        &self,
        path: &str,
        body: &Value,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        self.request(
            build(Request::put(path), token)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Multipart upload of `(filename, payload)` pairs.
    pub async fn upload(
        &self,
        path: &str,
        token: &str,
        files: &[(&str, Vec<u8>)],
    ) -> (StatusCode, Value) {
        const BOUNDARY: &str = "integration-test-boundary";

        let mut body = Vec::new();
        for (filename, payload) in files {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(payload);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        self.request(
            build(Request::post(path), Some(token))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Logs in (provisioning the user if new) and returns the access token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self.tokens(username, password).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Raw login response, for tests that need the refresh token too.
    pub async fn tokens(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.post_json(
            "/api/v1/login/access-token",
            &serde_json::json!({ "username": username, "password": password }),
            None,
        )
        .await
    }

    /// Convenience: create a product and return its id.
    pub async fn create_product(&self, token: &str, title: &str, price: i64) -> String {
        let (status, body) = self
            .post_json(
                "/api/v1/products",
                &serde_json::json!({
                    "title": title,
                    "price": price,
                    "description": format!("{title} description"),
                }),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Number of payload files under the media root.
    pub fn stored_payloads(&self) -> usize {
        count_files(self.media_root.path())
    }
}

fn build(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

async fn read_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}
