//! # SqliteStore
//!
//! sqlx-backed implementation of the `UserRepo`, `ProductRepo` and
//! `ImageRepo` ports over a single SQLite pool. The schema is embedded
//! and applied at connect time.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use domains::{
    AppError, Image, ImageRepo, OwnerKind, OwnerRef, Product, ProductRepo, Result, User, UserRepo,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id            TEXT PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at    TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS products (
        id          TEXT PRIMARY KEY,
        owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title       TEXT NOT NULL,
        price       INTEGER NOT NULL,
        description TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS images (
        id         TEXT PRIMARY KEY,
        owner_kind TEXT NOT NULL,
        owner_id   TEXT NOT NULL,
        path       TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_images_owner ON images (owner_kind, owner_id)",
    "CREATE INDEX IF NOT EXISTS idx_products_owner ON products (owner_id)",
];

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and applies the
    /// schema. A single connection is enough: SQLite serializes writers
    /// anyway, and it keeps `sqlite::memory:` databases coherent.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await.map_err(db_err)?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(err: impl std::fmt::Display) -> AppError {
    AppError::Internal(err.to_string())
}

fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(db_err)
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    })
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product> {
    Ok(Product {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        owner_id: parse_uuid(&row.get::<String, _>("owner_id"))?,
        title: row.get("title"),
        price: row.get("price"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_image(row: &sqlx::sqlite::SqliteRow) -> Result<Image> {
    let kind: String = row.get("owner_kind");
    Ok(Image {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        owner: OwnerRef {
            kind: OwnerKind::from_str(&kind).map_err(db_err)?,
            id: parse_uuid(&row.get::<String, _>("owner_id"))?,
        },
        path: row.get("path"),
        size_bytes: row.get("size_bytes"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn create(&self, user: User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)")
            .bind(user.id.to_string())
            .bind(user.username)
            .bind(user.password_hash)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_user).transpose()
    }
}

#[async_trait]
impl ProductRepo for SqliteStore {
    async fn create(&self, product: Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, owner_id, title, price, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product.id.to_string())
        .bind(product.owner_id.to_string())
        .bind(product.title)
        .bind(product.price)
        .bind(product.description)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn list(&self, owner_id: Uuid) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT * FROM products WHERE owner_id = ? ORDER BY created_at ASC, id ASC")
            .bind(owner_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_product).collect()
    }

    async fn update(&self, product: Product) -> Result<()> {
        sqlx::query(
            "UPDATE products SET title = ?, price = ?, description = ?, updated_at = ?
             WHERE id = ? AND owner_id = ?",
        )
        .bind(product.title)
        .bind(product.price)
        .bind(product.description)
        .bind(product.updated_at)
        .bind(product.id.to_string())
        .bind(product.owner_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Removes the product and its image rows in one transaction so a
    /// failure midway never leaves images pointing at a deleted product.
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Vec<Image>>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let exists = sqlx::query("SELECT id FROM products WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if exists.is_none() {
            return Ok(None);
        }

        let image_rows = sqlx::query("SELECT * FROM images WHERE owner_kind = ? AND owner_id = ?")
            .bind(OwnerKind::Product.as_str())
            .bind(id.to_string())
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;
        let images = image_rows
            .iter()
            .map(row_to_image)
            .collect::<Result<Vec<_>>>()?;

        sqlx::query("DELETE FROM images WHERE owner_kind = ? AND owner_id = ?")
            .bind(OwnerKind::Product.as_str())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(Some(images))
    }
}

#[async_trait]
impl ImageRepo for SqliteStore {
    async fn insert(&self, image: Image) -> Result<()> {
        sqlx::query(
            "INSERT INTO images (id, owner_kind, owner_id, path, size_bytes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(image.id.to_string())
        .bind(image.owner.kind.as_str())
        .bind(image.owner.id.to_string())
        .bind(image.path)
        .bind(image.size_bytes)
        .bind(image.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn count(&self, owner: OwnerRef) -> Result<u32> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM images WHERE owner_kind = ? AND owner_id = ?")
            .bind(owner.kind.as_str())
            .bind(owner.id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        let n: i64 = row.get("n");
        Ok(n as u32)
    }

    async fn list(&self, owner: OwnerRef) -> Result<Vec<Image>> {
        let rows = sqlx::query(
            "SELECT * FROM images WHERE owner_kind = ? AND owner_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(owner.kind.as_str())
        .bind(owner.id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_image).collect()
    }

    async fn get(&self, owner: OwnerRef, image_id: Uuid) -> Result<Option<Image>> {
        let row = sqlx::query("SELECT * FROM images WHERE id = ? AND owner_kind = ? AND owner_id = ?")
            .bind(image_id.to_string())
            .bind(owner.kind.as_str())
            .bind(owner.id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_image).transpose()
    }

    async fn delete(&self, image_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(image_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
