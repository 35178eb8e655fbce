//! Authentication Module
//! Mission: Token issuance, validation and role-gated access to admin routes

pub mod api;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod revocation;
pub mod service;
pub mod user_store;

pub use error::AuthError;
pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, RouteGuard};
pub use revocation::RevocationList;
pub use service::AuthService;
pub use user_store::{CredentialStore, UserStore};
