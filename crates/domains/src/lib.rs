//! # domains
//!
//! The central domain models, error taxonomy and port definitions for
//! the bazaar shop backend.

pub mod error;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;
