//! Catering Backend Library
//!
//! Storefront and admin console API with a token-based auth gateway and
//! per-tier request admission.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;
pub mod notify;
pub mod store;
