//! # JwtTokenCodec
//!
//! HS256 implementation of the `TokenCodec` port. Tokens are
//! self-contained `{id, exp}` claims; nothing distinguishes an access
//! token from a refresh token except the TTL the caller chose.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use domains::{AppError, Result, TokenClaims, TokenCodec};

pub struct JwtTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtTokenCodec {
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::default();
        // Default leeway is 60s; expiry must be exact so a token issued
        // with a past TTL verifies as invalid immediately.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }
}

impl TokenCodec for JwtTokenCodec {
    fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String> {
        let claims = TokenClaims {
            id: user_id,
            exp: (Utc::now() + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(AppError::internal)
    }

    fn verify(&self, token: &str) -> Option<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .ok()
    }
}
