// Meta Ads Gateway - Library root

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod middleware;
pub mod models;
pub mod routes;

pub use auth::{AuthManager, UserAuthManager};
pub use client::MetaApiClient;
pub use error::{ApiError, ApiErrorKind, Error, Result};
