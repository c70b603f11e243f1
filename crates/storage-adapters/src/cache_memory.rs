//! # MemoryListingCache
//!
//! In-process implementation of the `ListingCache` port over
//! `moka::future::Cache`, with a backend-level TTL. An empty listing is a
//! present value; only a missing key is a miss.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use uuid::Uuid;

use domains::{ListingCache, ProductWithImages};

pub struct MemoryListingCache {
    cache: Cache<Uuid, Vec<ProductWithImages>>,
}

impl MemoryListingCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl ListingCache for MemoryListingCache {
    async fn get(&self, user_id: Uuid) -> Option<Vec<ProductWithImages>> {
        self.cache.get(&user_id).await
    }

    async fn put(&self, user_id: Uuid, listing: Vec<ProductWithImages>) {
        self.cache.insert(user_id, listing).await;
    }

    async fn invalidate(&self, user_id: Uuid) {
        self.cache.invalidate(&user_id).await;
    }
}
