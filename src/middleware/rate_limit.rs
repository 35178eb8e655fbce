//! Rate limiting middleware.
//!
//! Fixed-window counters per `(client, tier)`. Buckets are spread over
//! independently locked shards so unrelated clients never queue behind
//! each other, while increment-and-compare on one bucket stays atomic.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SHARD_COUNT: usize = 64;

/// Buckets idle for this many windows are dropped by `cleanup`
const IDLE_WINDOWS: u32 = 3;

/// Configuration for one rate-limit tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

/// Route groups, each with its own fixed policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    PublicRead,
    PublicWrite,
    Contact,
    Auth,
    Admin,
    Healthcheck,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::PublicRead => "public-read",
            Tier::PublicWrite => "public-write",
            Tier::Contact => "contact",
            Tier::Auth => "auth",
            Tier::Admin => "admin",
            Tier::Healthcheck => "healthcheck",
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        let max_requests = match self {
            Tier::PublicRead => 100,
            Tier::PublicWrite => 10,
            Tier::Contact => 5,
            Tier::Auth => 20,
            Tier::Admin => 200,
            Tier::Healthcheck => 60,
        };
        RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

type BucketKey = (String, Tier);

struct RateBucket {
    count: u32,
    window_start: Instant,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Rejected { retry_after: Duration },
}

/// Per-client, per-tier request counters.
pub struct RateLimiter {
    shards: Box<[Mutex<HashMap<BucketKey, RateBucket>>]>,
    hasher: RandomState,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, client: &str, tier: Tier) -> &Mutex<HashMap<BucketKey, RateBucket>> {
        let idx = self.hasher.hash_one((client, tier)) as usize % self.shards.len();
        &self.shards[idx]
    }

    /// Check if a request should be allowed.
    pub fn admit(&self, client: &str, tier: Tier) -> Admission {
        self.admit_at(client, tier, Instant::now())
    }

    pub fn admit_at(&self, client: &str, tier: Tier, now: Instant) -> Admission {
        let config = tier.config();
        let mut shard = self.shard(client, tier).lock();

        let entry = shard
            .entry((client.to_string(), tier))
            .or_insert(RateBucket {
                count: 0,
                window_start: now,
            });

        // Reset window if expired
        if now.saturating_duration_since(entry.window_start) >= config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);

        if entry.count > config.max_requests {
            let reset_at = entry.window_start + config.window;
            Admission::Rejected {
                retry_after: reset_at.saturating_duration_since(now),
            }
        } else {
            Admission::Allowed {
                remaining: config.max_requests - entry.count,
            }
        }
    }

    /// Drop buckets whose window ended long enough ago that no live client
    /// can still be counted by them (call from a background task).
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    pub fn cleanup_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut shard = shard.lock();
            let before = shard.len();
            shard.retain(|(_, tier), bucket| {
                now.saturating_duration_since(bucket.window_start)
                    < tier.config().window * IDLE_WINDOWS
            });
            removed += before - shard.len();
        }
        if removed > 0 {
            debug!(removed, "Evicted idle rate-limit buckets");
        }
        removed
    }

    pub fn bucket_count(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }
}

/// State handed to the middleware for one route group.
#[derive(Clone)]
pub struct TierLimit {
    pub limiter: Arc<RateLimiter>,
    pub tier: Tier,
    pub trust_proxy: bool,
}

impl TierLimit {
    pub fn new(limiter: Arc<RateLimiter>, tier: Tier, trust_proxy: bool) -> Self {
        Self {
            limiter,
            tier,
            trust_proxy,
        }
    }
}

/// Source address of the request. Behind a trusted proxy this is the last
/// `X-Forwarded-For` hop, the one the proxy appended; earlier hops are
/// client-supplied. Otherwise the peer address.
pub fn client_ip<B>(request: &Request<B>, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get_all("x-forwarded-for")
            .iter()
            .last()
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Bucket key for a request; `"unknown"` when no address is available.
pub fn client_key<B>(request: &Request<B>, trust_proxy: bool) -> String {
    client_ip(request, trust_proxy)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware function.
pub async fn rate_limit_middleware(
    State(limit): State<TierLimit>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&request, limit.trust_proxy);

    match limit.limiter.admit(&client, limit.tier) {
        Admission::Allowed { .. } => next.run(request).await,
        Admission::Rejected { retry_after } => {
            // Retry-After is whole seconds; never advertise 0
            let retry_secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;

            warn!(
                client = %client,
                tier = limit.tier.as_str(),
                retry_after_secs = retry_secs,
                "Rate limit exceeded"
            );

            let body = serde_json::json!({
                "error": "RateLimited",
                "message": "Too many requests. Please slow down.",
                "retry_after_seconds": retry_secs,
            });

            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_secs.to_string())],
                axum::Json(body),
            )
                .into_response()
        }
    }
}
