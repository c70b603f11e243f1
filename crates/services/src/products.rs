//! # ProductService
//!
//! Owner-scoped product CRUD, batch image upload, and the cache-aside
//! listing. Every read is scoped to the requesting user, so another
//! user's product is indistinguishable from a missing one.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use domains::{
    AppError, Image, ImageRepo, ImageUpload, ListingCache, NewProduct, OwnerRef, Page, Product,
    ProductPage, ProductPatch, ProductRepo, ProductWithImages, Result, User,
};

use crate::images::{check_size, ImageService};

pub struct ProductService {
    products: Arc<dyn ProductRepo>,
    images: Arc<dyn ImageRepo>,
    cache: Arc<dyn ListingCache>,
    media: ImageService,
}

impl ProductService {
    pub fn new(
        products: Arc<dyn ProductRepo>,
        images: Arc<dyn ImageRepo>,
        cache: Arc<dyn ListingCache>,
        media: ImageService,
    ) -> Self {
        Self {
            products,
            images,
            cache,
            media,
        }
    }

    /// Cache-aside listing. A miss reads the store and populates the cache
    /// unconditionally — an empty listing is cached too, so the next read
    /// distinguishes "no products" from "never looked".
    pub async fn list(&self, user: &User, page: Page) -> Result<ProductPage> {
        let listing = match self.cache.get(user.id).await {
            Some(hit) => hit,
            None => {
                let listing = self.load_listing(user.id).await?;
                self.cache.put(user.id, listing.clone()).await;
                listing
            }
        };

        let count = listing.len();
        let items = listing
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect();
        Ok(ProductPage { items, count })
    }

    pub async fn get(&self, user: &User, id: Uuid) -> Result<ProductWithImages> {
        let product = self.fetch_scoped(user, id).await?;
        let images = self.images.list(OwnerRef::product(product.id)).await?;
        Ok(ProductWithImages { product, images })
    }

    pub async fn create(&self, user: &User, new: NewProduct) -> Result<ProductWithImages> {
        validate_price(new.price)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::now_v7(),
            owner_id: user.id,
            title: new.title,
            price: new.price,
            description: new.description,
            created_at: now,
            updated_at: now,
        };
        self.products.create(product.clone()).await?;
        self.cache.invalidate(user.id).await;

        tracing::info!(product_id = %product.id, owner = %user.id, "created product");
        Ok(ProductWithImages {
            product,
            images: Vec::new(),
        })
    }

    /// Applies only the supplied fields; a supplied price is validated
    /// before anything is written.
    pub async fn update(
        &self,
        user: &User,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<ProductWithImages> {
        if let Some(price) = patch.price {
            validate_price(price)?;
        }

        let mut product = self.fetch_scoped(user, id).await?;
        if let Some(title) = patch.title {
            product.title = title;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        product.updated_at = Utc::now();

        self.products.update(product.clone()).await?;
        self.cache.invalidate(user.id).await;

        let images = self.images.list(OwnerRef::product(product.id)).await?;
        Ok(ProductWithImages { product, images })
    }

    /// Deletes the product and its image rows in one transaction, then
    /// removes the stored payloads.
    pub async fn delete(&self, user: &User, id: Uuid) -> Result<()> {
        let images = self
            .products
            .delete(user.id, id)
            .await?
            .ok_or_else(|| AppError::not_found("product", id))?;

        self.media.remove_payloads(&images).await;
        self.cache.invalidate(user.id).await;

        tracing::info!(product_id = %id, owner = %user.id, images = images.len(),
            "deleted product");
        Ok(())
    }

    /// Attaches a batch of uploads to a product, all or nothing: every
    /// file is checked against the size limit and the whole batch against
    /// the remaining count headroom before the first byte is stored. A
    /// mid-batch storage failure detaches whatever this batch attached.
    pub async fn upload_images(
        &self,
        user: &User,
        product_id: Uuid,
        files: Vec<ImageUpload>,
    ) -> Result<Vec<Image>> {
        let product = self.fetch_scoped(user, product_id).await?;
        let owner = OwnerRef::product(product.id);
        let limits = owner.kind.image_limits();

        if files.is_empty() {
            return Err(AppError::Validation("no files uploaded".into()));
        }
        for file in &files {
            check_size(&limits, file.bytes.len() as u64)?;
        }
        let current = self.images.count(owner).await?;
        if current as usize + files.len() > limits.max_count as usize {
            return Err(AppError::Validation(format!(
                "image count cannot exceed {}",
                limits.max_count
            )));
        }

        let mut attached = Vec::with_capacity(files.len());
        for file in files {
            match self.media.attach(owner, file).await {
                Ok(image) => attached.push(image),
                Err(err) => {
                    for image in &attached {
                        if let Err(cleanup) = self.media.detach(image).await {
                            tracing::error!(image_id = %image.id, %cleanup,
                                "failed to unwind batch upload");
                        }
                    }
                    self.cache.invalidate(user.id).await;
                    return Err(err);
                }
            }
        }

        self.cache.invalidate(user.id).await;
        Ok(attached)
    }

    pub async fn delete_image(&self, user: &User, product_id: Uuid, image_id: Uuid) -> Result<()> {
        let product = self.fetch_scoped(user, product_id).await?;
        let owner = OwnerRef::product(product.id);

        let image = self
            .images
            .get(owner, image_id)
            .await?
            .ok_or_else(|| AppError::not_found("image", image_id))?;

        // Detach can fail after the record is already gone; the cached
        // listing must stop serving the image either way.
        let detached = self.media.detach(&image).await;
        self.cache.invalidate(user.id).await;
        detached
    }

    async fn fetch_scoped(&self, user: &User, id: Uuid) -> Result<Product> {
        self.products
            .get(user.id, id)
            .await?
            .ok_or_else(|| AppError::not_found("product", id))
    }

    async fn load_listing(&self, user_id: Uuid) -> Result<Vec<ProductWithImages>> {
        let products = self.products.list(user_id).await?;
        let mut listing = Vec::with_capacity(products.len());
        for product in products {
            let images = self.images.list(OwnerRef::product(product.id)).await?;
            listing.push(ProductWithImages { product, images });
        }
        Ok(listing)
    }
}

fn validate_price(price: i64) -> Result<()> {
    if price <= 0 {
        return Err(AppError::Validation("invalid price".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use domains::{
        MockImageRepo, MockListingCache, MockMediaStorage, MockProductRepo, OwnerKind,
    };

    fn sample_user() -> User {
        User {
            id: Uuid::now_v7(),
            username: "alice".into(),
            password_hash: "hash".into(),
            created_at: Utc::now(),
        }
    }

    fn sample_product(owner_id: Uuid) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::now_v7(),
            owner_id,
            title: "Lamp".into(),
            price: 40,
            description: "Brass lamp".into(),
            created_at: now,
            updated_at: now,
        }
    }

    struct Mocks {
        products: MockProductRepo,
        images: MockImageRepo,
        cache: MockListingCache,
        storage: MockMediaStorage,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                products: MockProductRepo::new(),
                images: MockImageRepo::new(),
                cache: MockListingCache::new(),
                storage: MockMediaStorage::new(),
            }
        }

        fn build(self) -> ProductService {
            let images: Arc<dyn ImageRepo> = Arc::new(self.images);
            let media = ImageService::new(images.clone(), Arc::new(self.storage));
            ProductService::new(Arc::new(self.products), images, Arc::new(self.cache), media)
        }
    }

    #[tokio::test]
    async fn list_hit_skips_the_store() {
        let user = sample_user();
        let cached = vec![ProductWithImages {
            product: sample_product(user.id),
            images: vec![],
        }];

        let mut mocks = Mocks::new();
        mocks.products.expect_list().never();
        let hit = cached.clone();
        mocks
            .cache
            .expect_get()
            .returning(move |_| Some(hit.clone()));

        let page = mocks.build().list(&user, Page::default()).await.unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.items[0].product.id, cached[0].product.id);
    }

    #[tokio::test]
    async fn list_miss_populates_cache_even_when_empty() {
        let user = sample_user();

        let mut mocks = Mocks::new();
        mocks.cache.expect_get().returning(|_| None);
        mocks
            .cache
            .expect_put()
            .withf(|_, listing| listing.is_empty())
            .times(1)
            .returning(|_, _| ());
        mocks.products.expect_list().returning(|_| Ok(vec![]));

        let page = mocks.build().list(&user, Page::default()).await.unwrap();
        assert_eq!(page.count, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn list_paginates_the_cached_listing() {
        let user = sample_user();
        let listing: Vec<_> = (0..4)
            .map(|_| ProductWithImages {
                product: sample_product(user.id),
                images: vec![],
            })
            .collect();

        let mut mocks = Mocks::new();
        let hit = listing.clone();
        mocks
            .cache
            .expect_get()
            .returning(move |_| Some(hit.clone()));

        let page = mocks
            .build()
            .list(
                &user,
                Page {
                    limit: Some(2),
                    offset: Some(1),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.count, 4);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].product.id, listing[1].product.id);
    }

    #[tokio::test]
    async fn create_rejects_non_positive_price() {
        let user = sample_user();
        let mut mocks = Mocks::new();
        mocks.products.expect_create().never();

        let err = mocks
            .build()
            .create(
                &user,
                NewProduct {
                    title: "Free stuff".into(),
                    price: 0,
                    description: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "invalid price"));
    }

    #[tokio::test]
    async fn create_invalidates_the_owner_cache() {
        let user = sample_user();
        let user_id = user.id;

        let mut mocks = Mocks::new();
        mocks.products.expect_create().returning(|_| Ok(()));
        mocks
            .cache
            .expect_invalidate()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(|_| ());

        let created = mocks
            .build()
            .create(
                &user,
                NewProduct {
                    title: "Lamp".into(),
                    price: 40,
                    description: "Brass".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(created.product.owner_id, user.id);
        assert!(created.images.is_empty());
    }

    #[tokio::test]
    async fn update_applies_only_supplied_fields() {
        let user = sample_user();
        let product = sample_product(user.id);
        let product_id = product.id;
        let original_description = product.description.clone();

        let mut mocks = Mocks::new();
        let stored = product.clone();
        mocks
            .products
            .expect_get()
            .returning(move |_, _| Ok(Some(stored.clone())));
        let expected_description = original_description.clone();
        mocks
            .products
            .expect_update()
            .withf(move |p| {
                p.title == "Renamed" && p.price == 40 && p.description == expected_description
            })
            .times(1)
            .returning(|_| Ok(()));
        mocks.cache.expect_invalidate().returning(|_| ());
        mocks.images.expect_list().returning(|_| Ok(vec![]));

        let updated = mocks
            .build()
            .update(
                &user,
                product_id,
                ProductPatch {
                    title: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.product.title, "Renamed");
        assert_eq!(updated.product.description, original_description);
    }

    #[tokio::test]
    async fn update_rejects_zero_price_before_reading() {
        let user = sample_user();
        let mut mocks = Mocks::new();
        mocks.products.expect_get().never();
        mocks.products.expect_update().never();

        let err = mocks
            .build()
            .update(
                &user,
                Uuid::now_v7(),
                ProductPatch {
                    price: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_product_and_foreign_product_look_identical() {
        let user = sample_user();
        let mut mocks = Mocks::new();
        // Scoped get: the repo returns None for both cases.
        mocks.products.expect_get().returning(|_, _| Ok(None));

        let err = mocks.build().get(&user, Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("product", _)));
    }

    #[tokio::test]
    async fn delete_removes_payloads_and_invalidates() {
        let user = sample_user();
        let product = sample_product(user.id);
        let image = Image {
            id: Uuid::now_v7(),
            owner: OwnerRef::product(product.id),
            path: "images/product/a.jpg".into(),
            size_bytes: 3,
            created_at: Utc::now(),
        };

        let mut mocks = Mocks::new();
        let cascade = vec![image.clone()];
        mocks
            .products
            .expect_delete()
            .returning(move |_, _| Ok(Some(cascade.clone())));
        mocks
            .storage
            .expect_remove()
            .withf(move |p| p == image.path)
            .times(1)
            .returning(|_| Ok(()));
        mocks.cache.expect_invalidate().times(1).returning(|_| ());

        mocks.build().delete(&user, product.id).await.unwrap();
    }

    #[tokio::test]
    async fn batch_upload_is_rejected_before_storage_when_over_count() {
        let user = sample_user();
        let product = sample_product(user.id);
        let product_id = product.id;

        let mut mocks = Mocks::new();
        mocks
            .products
            .expect_get()
            .returning(move |_, _| Ok(Some(product.clone())));
        mocks.images.expect_count().returning(|_| Ok(3));
        mocks.images.expect_insert().never();
        mocks.storage.expect_put().never();

        let files: Vec<_> = (0..3)
            .map(|i| ImageUpload {
                filename: format!("f{i}.jpg"),
                bytes: Bytes::from_static(b"data"),
            })
            .collect();

        // 3 existing + 3 new > max_count of 5 for products
        assert_eq!(OwnerKind::Product.image_limits().max_count, 5);
        let err = mocks
            .build()
            .upload_images(&user, product_id, files)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn batch_upload_unwinds_on_mid_batch_storage_failure() {
        let user = sample_user();
        let product = sample_product(user.id);
        let product_id = product.id;

        let mut mocks = Mocks::new();
        mocks
            .products
            .expect_get()
            .returning(move |_, _| Ok(Some(product.clone())));
        mocks.images.expect_count().returning(|_| Ok(0));
        mocks.images.expect_insert().returning(|_| Ok(()));
        // First file lands, second write blows up, first gets detached.
        let mut seq = mockall::Sequence::new();
        mocks
            .storage
            .expect_put()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        mocks
            .storage
            .expect_put()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(AppError::internal("disk full")));
        mocks.images.expect_delete().times(2).returning(|_| Ok(()));
        mocks.storage.expect_remove().times(1).returning(|_| Ok(()));
        mocks.cache.expect_invalidate().times(1).returning(|_| ());

        let files = vec![
            ImageUpload {
                filename: "a.jpg".into(),
                bytes: Bytes::from_static(b"aaaa"),
            },
            ImageUpload {
                filename: "b.jpg".into(),
                bytes: Bytes::from_static(b"bbbb"),
            },
        ];

        let err = mocks
            .build()
            .upload_images(&user, product_id, files)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn delete_image_invalidates_cache_even_when_payload_removal_fails() {
        let user = sample_user();
        let user_id = user.id;
        let product = sample_product(user.id);
        let product_id = product.id;
        let image = Image {
            id: Uuid::now_v7(),
            owner: OwnerRef::product(product_id),
            path: "images/product/a.jpg".into(),
            size_bytes: 3,
            created_at: Utc::now(),
        };
        let image_id = image.id;

        let mut mocks = Mocks::new();
        mocks
            .products
            .expect_get()
            .returning(move |_, _| Ok(Some(product.clone())));
        let stored = image.clone();
        mocks
            .images
            .expect_get()
            .returning(move |_, _| Ok(Some(stored.clone())));
        mocks.images.expect_delete().times(1).returning(|_| Ok(()));
        mocks
            .storage
            .expect_remove()
            .returning(|_| Err(AppError::internal("disk gone")));
        // The record is gone, so the listing must be invalidated even
        // though the payload removal failed.
        mocks
            .cache
            .expect_invalidate()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(|_| ());

        let err = mocks
            .build()
            .delete_image(&user, product_id, image_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn delete_image_is_scoped_to_the_product() {
        let user = sample_user();
        let product = sample_product(user.id);
        let product_id = product.id;

        let mut mocks = Mocks::new();
        mocks
            .products
            .expect_get()
            .returning(move |_, _| Ok(Some(product.clone())));
        mocks.images.expect_get().returning(|_, _| Ok(None));

        let err = mocks
            .build()
            .delete_image(&user, product_id, Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("image", _)));
    }
}
