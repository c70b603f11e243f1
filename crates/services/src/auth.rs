//! # AuthService
//!
//! Login, token refresh and per-request authentication.
//!
//! Every failure path collapses into `AppError::Unauthenticated` so the
//! caller cannot tell an expired token from a tampered one, or a bad
//! password from a missing user.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use domains::{
    AppError, CredentialHasher, Result, TokenCodec, TokenPair, User, UserRepo,
};

pub struct AuthService {
    users: Arc<dyn UserRepo>,
    tokens: Arc<dyn TokenCodec>,
    hasher: Arc<dyn CredentialHasher>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        tokens: Arc<dyn TokenCodec>,
        hasher: Arc<dyn CredentialHasher>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Exchanges credentials for an access/refresh pair.
    ///
    /// An unknown username is provisioned on the spot and logged in —
    /// there is no separate registration endpoint. A known username with
    /// a wrong password fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let user = match self.users.find_by_username(username).await? {
            Some(user) => {
                if !self.hasher.verify(password, &user.password_hash) {
                    return Err(AppError::Unauthenticated("incorrect password".into()));
                }
                user
            }
            None => {
                let user = User {
                    id: Uuid::now_v7(),
                    username: username.to_string(),
                    password_hash: self.hasher.hash(password)?,
                    created_at: Utc::now(),
                };
                self.users.create(user.clone()).await?;
                tracing::info!(username, "provisioned new user on first login");
                user
            }
        };

        self.issue_pair(user.id)
    }

    /// Exchanges a live refresh token for a fresh pair embedding the same
    /// user id. The presented token is not rotated or denylisted; it stays
    /// valid until its natural expiry.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self
            .tokens
            .verify(refresh_token)
            .ok_or_else(|| AppError::Unauthenticated("invalid refresh token".into()))?;

        self.issue_pair(claims.id)
    }

    /// Resolves a bearer token to the user it was issued for.
    pub async fn authenticate(&self, bearer_token: &str) -> Result<User> {
        let claims = self
            .tokens
            .verify(bearer_token)
            .ok_or_else(|| AppError::Unauthenticated("invalid bearer token".into()))?;

        self.users
            .find_by_id(claims.id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("invalid bearer token".into()))
    }

    fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.tokens.issue(user_id, self.access_ttl)?,
            refresh_token: self.tokens.issue(user_id, self.refresh_ttl)?,
        })
    }
}
