//! # Core Ports
//!
//! Contracts every adapter must implement. Services only ever see these
//! traits, so backends can be swapped without touching use-case code.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Image, OwnerRef, Product, ProductWithImages, TokenClaims, User};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// Persistence contract for user accounts.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, user: User) -> Result<()>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

/// Persistence contract for products. Reads are scoped to the owner, so a
/// product owned by someone else behaves exactly like a missing one.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ProductRepo: Send + Sync {
    async fn create(&self, product: Product) -> Result<()>;
    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Product>>;
    async fn list(&self, owner_id: Uuid) -> Result<Vec<Product>>;
    async fn update(&self, product: Product) -> Result<()>;

    /// Deletes the product and all its image rows in one transaction.
    /// Returns the deleted image records (for payload cleanup), or `None`
    /// if no such product exists for this owner.
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Vec<Image>>>;
}

/// Persistence contract for polymorphic image attachments.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ImageRepo: Send + Sync {
    async fn insert(&self, image: Image) -> Result<()>;
    async fn count(&self, owner: OwnerRef) -> Result<u32>;
    async fn list(&self, owner: OwnerRef) -> Result<Vec<Image>>;
    async fn get(&self, owner: OwnerRef, image_id: Uuid) -> Result<Option<Image>>;
    async fn delete(&self, image_id: Uuid) -> Result<()>;
}

/// Durable payload storage, addressed by storage-relative path.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn put(&self, rel_path: &str, data: Bytes) -> Result<()>;
    async fn remove(&self, rel_path: &str) -> Result<()>;
}

/// Per-user listing cache. Infallible by contract: a backend hiccup must
/// degrade to a miss inside the adapter, never surface to the service.
///
/// An empty cached listing is a valid value, distinct from "absent".
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ListingCache: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Option<Vec<ProductWithImages>>;
    async fn put(&self, user_id: Uuid, listing: Vec<ProductWithImages>);
    async fn invalidate(&self, user_id: Uuid);
}

/// Signed, expiring bearer tokens. The token does not encode whether it is
/// an access or refresh token; callers supply different TTLs.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait TokenCodec: Send + Sync {
    fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String>;

    /// `None` on signature failure, malformed token or expiry — all three
    /// are indistinguishable, by design.
    fn verify(&self, token: &str) -> Option<TokenClaims>;
}

/// Password hashing contract.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}
