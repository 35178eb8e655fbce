//! Catering booking backend
//! Mission: Serve the storefront and admin console behind the auth gateway

use anyhow::{Context, Result};
use catering_backend::{
    api::{create_router, AppState},
    auth::{AuthService, JwtHandler, RevocationList, UserStore},
    config::{load_env, Config},
    middleware::{RateLimiter, SecurityPolicy},
    notify::LogNotifier,
    store::RecordStore,
};
use chrono::Utc;
use clap::Parser;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, time::interval};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    let config = Config::parse();
    config.validate()?;

    info!("Catering backend starting");

    if config.uses_dev_secret() {
        warn!("JWT_SECRET not set, using the development secret. Set it in production!");
    }
    if config.require_https && !config.trust_proxy {
        warn!("REQUIRE_HTTPS without TRUST_PROXY only accepts requests carrying an https URI");
    }

    // Credential store + seeded admin
    let user_store = Arc::new(UserStore::new(&config.auth_db_path)?);
    let admin_password = match &config.admin_password {
        Some(p) => p.clone(),
        None => Uuid::new_v4().simple().to_string(),
    };
    if user_store.ensure_admin(&config.admin_username, &admin_password)?
        && config.admin_password.is_none()
    {
        warn!(
            username = %config.admin_username,
            password = %admin_password,
            "Generated admin password. Change it after first login!"
        );
    }
    info!(
        path = %config.auth_db_path,
        accounts = user_store.list_users()?.len(),
        "Credential store ready"
    );

    let jwt_handler = Arc::new(JwtHandler::with_ttls(
        &config.jwt_secret,
        config.access_ttl(),
        config.refresh_ttl(),
    ));
    let revoked = config
        .refresh_rotation_denylist
        .then(|| Arc::new(RevocationList::default()));
    let auth = AuthService::new(user_store, jwt_handler, revoked.clone());

    let records = Arc::new(RecordStore::new(&config.db_path)?);
    info!(path = %config.db_path, "Record store ready");

    let limiter = Arc::new(RateLimiter::new());

    // Periodically evict idle rate-limit buckets and expired revocations
    tokio::spawn(maintenance_polling(
        limiter.clone(),
        revoked,
        Duration::from_secs(config.rate_limit_cleanup_secs.max(1)),
    ));

    let state = AppState {
        auth,
        records,
        notifier: Arc::new(LogNotifier),
    };
    let policy = SecurityPolicy {
        allowed_origins: config.allowed_origins(),
        require_https: config.require_https,
        trust_proxy: config.trust_proxy,
    };
    let app = create_router(state, limiter, policy);

    // Start server
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("API server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn maintenance_polling(
    limiter: Arc<RateLimiter>,
    revoked: Option<Arc<RevocationList>>,
    every: Duration,
) {
    let mut ticker = interval(every);
    loop {
        ticker.tick().await;
        limiter.cleanup();
        if let Some(revoked) = &revoked {
            revoked.purge_expired(Utc::now().timestamp());
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catering_backend=debug,catering=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
