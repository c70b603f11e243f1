//! # ImageService
//!
//! Enforces the per-owner-type attachment policy and keeps the image
//! record and its stored payload consistent with each other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use domains::{
    AppError, Image, ImageLimits, ImageRepo, ImageUpload, MediaStorage, OwnerRef, Result,
};

pub struct ImageService {
    images: Arc<dyn ImageRepo>,
    storage: Arc<dyn MediaStorage>,
}

impl ImageService {
    pub fn new(images: Arc<dyn ImageRepo>, storage: Arc<dyn MediaStorage>) -> Self {
        Self { images, storage }
    }

    /// Validates the upload against the owner type's limits, then persists
    /// the record and writes the payload. A failed payload write deletes
    /// the record again so neither side survives alone.
    pub async fn attach(&self, owner: OwnerRef, upload: ImageUpload) -> Result<Image> {
        let limits = owner.kind.image_limits();
        check_size(&limits, upload.bytes.len() as u64)?;

        let current = self.images.count(owner).await?;
        if current >= limits.max_count {
            return Err(AppError::Validation(format!(
                "image count cannot exceed {}",
                limits.max_count
            )));
        }

        let id = Uuid::now_v7();
        let now = Utc::now();
        let image = Image {
            id,
            owner,
            path: storage_path(&owner, id, &upload.filename, now),
            size_bytes: upload.bytes.len() as i64,
            created_at: now,
        };

        self.images.insert(image.clone()).await?;
        if let Err(err) = self.storage.put(&image.path, upload.bytes).await {
            // Roll the record back; a listing must never reference a
            // payload that was never written.
            if let Err(cleanup) = self.images.delete(id).await {
                tracing::error!(image_id = %id, %cleanup, "failed to roll back image record");
            }
            return Err(err);
        }

        tracing::debug!(image_id = %id, path = %image.path, "attached image");
        Ok(image)
    }

    /// Deletes the record, then the payload. Record first: if the payload
    /// removal fails the image is already gone from every listing.
    pub async fn detach(&self, image: &Image) -> Result<()> {
        self.images.delete(image.id).await?;
        self.storage.remove(&image.path).await?;
        Ok(())
    }

    /// Payload cleanup for records that were already deleted elsewhere
    /// (e.g. by the transactional product cascade). Failures are logged,
    /// not surfaced — the rows are gone either way.
    pub async fn remove_payloads(&self, images: &[Image]) {
        for image in images {
            if let Err(err) = self.storage.remove(&image.path).await {
                tracing::warn!(image_id = %image.id, path = %image.path, %err,
                    "failed to remove stored payload");
            }
        }
    }
}

/// Size check shared with batch pre-validation. Exactly the limit passes.
pub fn check_size(limits: &ImageLimits, size_bytes: u64) -> Result<()> {
    if size_bytes > limits.max_size_bytes {
        return Err(AppError::Validation(format!(
            "image size cannot exceed {} MB",
            limits.max_size_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

/// `images/<owner_kind>/<owner_id>_<timestamp>_<id8><ext>`
///
/// The microsecond timestamp matches the original upload-path convention;
/// the first 8 hex chars of the image id disambiguate files attached to
/// the same owner within the same instant.
fn storage_path(owner: &OwnerRef, image_id: Uuid, filename: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d%H%M%S%6f");
    let id8 = &image_id.simple().to_string()[..8];
    format!(
        "images/{}/{}_{}_{}{}",
        owner.kind.as_str(),
        owner.id,
        stamp,
        id8,
        sanitize_extension(filename),
    )
}

/// Lowercased alphanumeric extension with a leading dot, at most 8 chars;
/// empty when the filename has none worth keeping.
fn sanitize_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .take(8)
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use domains::{MockImageRepo, MockMediaStorage};

    const MIB: usize = 1024 * 1024;

    fn upload(size: usize) -> ImageUpload {
        ImageUpload {
            filename: "picture.JPEG".into(),
            bytes: Bytes::from(vec![0u8; size]),
        }
    }

    fn service(images: MockImageRepo, storage: MockMediaStorage) -> ImageService {
        ImageService::new(Arc::new(images), Arc::new(storage))
    }

    #[tokio::test]
    async fn attach_accepts_payload_at_exact_size_limit() {
        let mut images = MockImageRepo::new();
        images.expect_count().returning(|_| Ok(0));
        images.expect_insert().times(1).returning(|_| Ok(()));

        let mut storage = MockMediaStorage::new();
        storage.expect_put().times(1).returning(|_, _| Ok(()));

        let owner = OwnerRef::product(Uuid::now_v7());
        let image = service(images, storage)
            .attach(owner, upload(2 * MIB))
            .await
            .unwrap();
        assert_eq!(image.size_bytes, (2 * MIB) as i64);
        assert!(image.path.ends_with(".jpeg"));
    }

    #[tokio::test]
    async fn attach_rejects_payload_one_byte_over() {
        let mut images = MockImageRepo::new();
        images.expect_insert().never();

        let err = service(images, MockMediaStorage::new())
            .attach(OwnerRef::product(Uuid::now_v7()), upload(2 * MIB + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("2 MB")));
    }

    #[tokio::test]
    async fn attach_rejects_sixth_image() {
        let mut images = MockImageRepo::new();
        images.expect_count().returning(|_| Ok(5));
        images.expect_insert().never();

        let err = service(images, MockMediaStorage::new())
            .attach(OwnerRef::product(Uuid::now_v7()), upload(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains('5')));
    }

    #[tokio::test]
    async fn attach_allows_fifth_image() {
        let mut images = MockImageRepo::new();
        images.expect_count().returning(|_| Ok(4));
        images.expect_insert().times(1).returning(|_| Ok(()));

        let mut storage = MockMediaStorage::new();
        storage.expect_put().returning(|_, _| Ok(()));

        assert!(service(images, storage)
            .attach(OwnerRef::product(Uuid::now_v7()), upload(10))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn attach_rolls_back_record_when_storage_write_fails() {
        let mut images = MockImageRepo::new();
        images.expect_count().returning(|_| Ok(0));
        images.expect_insert().returning(|_| Ok(()));
        images.expect_delete().times(1).returning(|_| Ok(()));

        let mut storage = MockMediaStorage::new();
        storage
            .expect_put()
            .returning(|_, _| Err(AppError::internal("disk full")));

        let err = service(images, storage)
            .attach(OwnerRef::product(Uuid::now_v7()), upload(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn detach_removes_record_before_payload() {
        let owner = OwnerRef::product(Uuid::now_v7());
        let image = Image {
            id: Uuid::now_v7(),
            owner,
            path: "images/product/x.jpg".into(),
            size_bytes: 10,
            created_at: Utc::now(),
        };

        let mut images = MockImageRepo::new();
        images.expect_delete().times(1).returning(|_| Ok(()));
        let mut storage = MockMediaStorage::new();
        storage.expect_remove().times(1).returning(|_| Ok(()));

        service(images, storage).detach(&image).await.unwrap();
    }

    #[test]
    fn storage_path_follows_upload_convention() {
        let owner_id = Uuid::now_v7();
        let owner = OwnerRef::product(owner_id);
        let image_id = Uuid::now_v7();
        let path = storage_path(&owner, image_id, "Cat Photo.PNG", Utc::now());

        assert!(path.starts_with(&format!("images/product/{owner_id}_")));
        assert!(path.ends_with(".png"));
        assert!(path.contains(&image_id.simple().to_string()[..8]));
    }

    #[test]
    fn storage_paths_are_distinct_within_one_instant() {
        let owner = OwnerRef::product(Uuid::now_v7());
        let now = Utc::now();
        let a = storage_path(&owner, Uuid::now_v7(), "a.jpg", now);
        let b = storage_path(&owner, Uuid::now_v7(), "b.jpg", now);
        assert_ne!(a, b);
    }

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(sanitize_extension("photo.JPEG"), ".jpeg");
        assert_eq!(sanitize_extension("archive.tar.gz"), ".gz");
        assert_eq!(sanitize_extension("noext"), "");
        assert_eq!(sanitize_extension("shot.p;n,g"), ".png");
    }
}
