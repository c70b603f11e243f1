//! # auth-adapters
//!
//! JWT and Argon2 implementations of the `TokenCodec` and
//! `CredentialHasher` ports.

pub mod jwt;
pub mod password;

pub use jwt::JwtTokenCodec;
pub use password::Argon2CredentialHasher;
