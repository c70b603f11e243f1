//! Wire DTOs. Request bodies for product create/update deserialize
//! straight into the domain's `NewProduct`/`ProductPatch`; responses get
//! their own shapes so the media URL prefix is applied in one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domains::{Image, ProductWithImages};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: Uuid,
    /// Public URL of the stored payload.
    pub image: String,
}

impl ImageResponse {
    pub fn from_image(image: &Image, media_url_prefix: &str) -> Self {
        Self {
            id: image.id,
            image: format!("{}/{}", media_url_prefix.trim_end_matches('/'), image.path),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub title: String,
    pub price: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub images: Vec<ImageResponse>,
}

impl ProductResponse {
    pub fn from_listing(entry: ProductWithImages, media_url_prefix: &str) -> Self {
        let images = entry
            .images
            .iter()
            .map(|image| ImageResponse::from_image(image, media_url_prefix))
            .collect();
        let product = entry.product;
        Self {
            id: product.id,
            title: product.title,
            price: product.price,
            description: product.description,
            created_at: product.created_at,
            updated_at: product.updated_at,
            images,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub items: Vec<ProductResponse>,
    pub count: usize,
}
