//! Request admission pipeline.
//!
//! This module provides:
//! - Origin and transport security checks
//! - Request logging with latency tracking
//! - Panic recovery
//! - Per-tier rate limiting per client address

pub mod logging;
pub mod rate_limit;
pub mod recovery;
pub mod security;

pub use logging::request_logging;
pub use rate_limit::{rate_limit_middleware, Admission, RateLimiter, Tier, TierLimit};
pub use recovery::recovery_layer;
pub use security::{security_middleware, SecurityPolicy};
