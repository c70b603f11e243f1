//! # configs
//!
//! Runtime settings: defaults, overridden by an optional `config.toml`,
//! overridden by `BAZAAR__*` environment variables (`__` separates
//! sections, e.g. `BAZAAR__JWT__SECRET`). A `.env` file is honored.

use config::builder::{ConfigBuilder, DefaultState};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Directory payloads are written under.
    pub root: String,
    /// Public URL prefix prepended to storage-relative paths.
    pub url_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    pub secret: SecretString,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub ttl_seconds: u64,
    pub max_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub jwt: JwtSettings,
    pub cache: CacheSettings,
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        let _ = dotenvy::dotenv();

        let settings = defaults()?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("BAZAAR").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("database.url", "sqlite://bazaar.db")?
        .set_default("media.root", "./media")?
        .set_default("media.url_prefix", "/media")?
        .set_default("jwt.secret", "change_me")?
        .set_default("jwt.access_ttl_minutes", 30)?
        .set_default("jwt.refresh_ttl_days", 7)?
        .set_default("cache.ttl_seconds", 60)?
        .set_default("cache.max_capacity", 10_000)
}
