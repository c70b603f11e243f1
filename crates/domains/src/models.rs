//! # Domain Models
//!
//! These structs represent the core entities of the shop.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated account. Provisioned on first login (see AuthService).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Argon2 PHC string; never serialized out through the API layer.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A sellable item owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    /// Whole currency units; always strictly positive.
    pub price: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The entity kinds an image may be attached to.
///
/// Each kind carries its own static image policy, so adding a new ownable
/// type means adding a variant and its limits here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Product,
}

/// Static per-owner-type attachment limits, enforced at attach time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_count: u32,
    pub max_size_bytes: u64,
}

impl OwnerKind {
    /// Tag used in storage paths and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Product => "product",
        }
    }

    pub fn image_limits(&self) -> ImageLimits {
        match self {
            OwnerKind::Product => ImageLimits {
                max_count: 5,
                max_size_bytes: 2 * 1024 * 1024,
            },
        }
    }
}

impl FromStr for OwnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(OwnerKind::Product),
            other => Err(format!("unknown owner kind: {other}")),
        }
    }
}

/// Polymorphic attachment target: which entity an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: Uuid,
}

impl OwnerRef {
    pub fn product(id: Uuid) -> Self {
        Self {
            kind: OwnerKind::Product,
            id,
        }
    }
}

/// An image attached to an owning entity. The payload lives in MediaStorage
/// under `path`; only the record is kept in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: Uuid,
    pub owner: OwnerRef,
    /// Storage-relative path, e.g. `images/product/<owner>_<ts>_<id8>.jpg`
    pub path: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// A product together with its attached images; the unit the listing
/// cache stores and the API returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductWithImages {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<Image>,
}

/// Decoded JWT payload. Expiry is seconds since the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub id: Uuid,
    pub exp: i64,
}

/// The access/refresh pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Fields required to create a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub price: i64,
    pub description: String,
}

/// Partial update; `None` fields keep their prior values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub price: Option<i64>,
    pub description: Option<String>,
}

/// One uploaded file as received from the HTTP layer.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: bytes::Bytes,
}

/// Offset pagination for listings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 100;

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT) as usize
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0) as usize
    }
}

/// One page of a user's product listing. `count` is the total number of
/// products the user owns, not the page length.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub items: Vec<ProductWithImages>,
    pub count: usize,
}
