//! # services
//!
//! Use-case orchestration over the domain ports: authentication and token
//! lifecycle, image attachment policy, and product CRUD with the per-user
//! listing cache.

pub mod auth;
pub mod images;
pub mod products;

pub use auth::AuthService;
pub use images::ImageService;
pub use products::ProductService;
