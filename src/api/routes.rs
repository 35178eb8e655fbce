//! Router assembly.
//!
//! Every route lives in exactly one tier router. Per request the layers run
//! outermost first: security, CORS, logging, panic recovery, the tier's rate
//! limiter, then (admin tier only) the route guard.

use crate::api::{contact, health, records};
use crate::auth::{api as auth_api, auth_middleware, AuthService, RouteGuard};
use crate::middleware::{
    rate_limit_middleware, recovery_layer, request_logging, security_middleware, RateLimiter,
    SecurityPolicy, Tier, TierLimit,
};
use crate::notify::Notifier;
use crate::store::RecordStore;
use axum::{
    extract::FromRef,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub records: Arc<RecordStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

fn with_tier(
    router: Router<AppState>,
    limiter: &Arc<RateLimiter>,
    tier: Tier,
    trust_proxy: bool,
) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(
        TierLimit::new(limiter.clone(), tier, trust_proxy),
        rate_limit_middleware,
    ))
}

fn cors_layer(policy: &SecurityPolicy) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([RETRY_AFTER]);

    if policy.allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = policy
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable allowed origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Create the full application router
pub fn create_router(state: AppState, limiter: Arc<RateLimiter>, policy: SecurityPolicy) -> Router {
    let trust_proxy = policy.trust_proxy;

    let health_routes = Router::new().route("/health", get(health::health_check));

    let public_read_routes = Router::new()
        .route("/menu", get(records::list_menu_items))
        .route("/menu/:id", get(records::get_menu_item))
        .route("/packages", get(records::list_packages))
        .route("/packages/:id", get(records::get_package));

    let public_write_routes = Router::new().route("/bookings", post(records::create_booking));

    let contact_routes = Router::new().route("/contact", post(contact::submit_contact));

    let auth_routes = Router::new()
        .route("/auth/login", post(auth_api::login))
        .route("/auth/refresh", post(auth_api::refresh))
        .route("/auth/logout", post(auth_api::logout));

    // Guard sits inside the admin tier limiter so abusive traffic is
    // counted before any token work is done
    let admin_routes = Router::new()
        .route("/auth/validate", get(auth_api::validate))
        .route("/bookings", get(records::list_bookings))
        .route(
            "/bookings/:id",
            get(records::get_booking)
                .put(records::update_booking)
                .delete(records::delete_booking),
        )
        .route("/menu", post(records::create_menu_item))
        .route(
            "/menu/:id",
            put(records::update_menu_item).delete(records::delete_menu_item),
        )
        .route("/packages", post(records::create_package))
        .route(
            "/packages/:id",
            put(records::update_package).delete(records::delete_package),
        )
        .route_layer(middleware::from_fn_with_state(
            RouteGuard::admin(state.auth.jwt().clone()),
            auth_middleware,
        ));

    let api = Router::new()
        .merge(with_tier(health_routes, &limiter, Tier::Healthcheck, trust_proxy))
        .merge(with_tier(public_read_routes, &limiter, Tier::PublicRead, trust_proxy))
        .merge(with_tier(public_write_routes, &limiter, Tier::PublicWrite, trust_proxy))
        .merge(with_tier(contact_routes, &limiter, Tier::Contact, trust_proxy))
        .merge(with_tier(auth_routes, &limiter, Tier::Auth, trust_proxy))
        .merge(with_tier(admin_routes, &limiter, Tier::Admin, trust_proxy))
        .with_state(state);

    apply_pipeline(api, policy)
}

/// Wrap routes in the global layers: security, CORS, logging, then panic
/// recovery innermost.
pub fn apply_pipeline(router: Router, policy: SecurityPolicy) -> Router {
    let cors = cors_layer(&policy);
    let policy = Arc::new(policy);

    router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn_with_state(
                policy.clone(),
                security_middleware,
            ))
            .layer(cors)
            .layer(middleware::from_fn_with_state(policy, request_logging))
            .layer(recovery_layer()),
    )
}
