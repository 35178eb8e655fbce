//! Runtime configuration
//! Every setting is a CLI flag with an environment-variable fallback.

use anyhow::{bail, Result};
use clap::{builder::BoolishValueParser, ArgAction, Parser};
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::Path;

pub const MAX_ACCESS_TTL_MINUTES: i64 = 24 * 60;
pub const MAX_REFRESH_TTL_HOURS: i64 = 24 * 365;

pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

#[derive(Parser, Debug, Clone)]
#[command(name = "catering")]
#[command(about = "Catering booking backend: storefront API and admin console gateway")]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: SocketAddr,

    /// SQLite database holding console accounts
    #[arg(long, env = "AUTH_DB_PATH", default_value = "catering_auth.db")]
    pub auth_db_path: String,

    /// SQLite database holding bookings, menu items and packages
    #[arg(long, env = "DB_PATH", default_value = "catering.db")]
    pub db_path: String,

    /// HMAC key for signing tokens
    #[arg(long, env = "JWT_SECRET", default_value = DEV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    /// Access token lifetime, 1 minute to 1 day
    #[arg(long, env = "ACCESS_TOKEN_TTL_MINUTES", default_value_t = 15, value_parser = clap::value_parser!(i64).range(1..=MAX_ACCESS_TTL_MINUTES))]
    pub access_ttl_minutes: i64,

    /// Refresh token lifetime, 1 hour to 1 year; must exceed the access lifetime
    #[arg(long, env = "REFRESH_TOKEN_TTL_HOURS", default_value_t = 168, value_parser = clap::value_parser!(i64).range(1..=MAX_REFRESH_TTL_HOURS))]
    pub refresh_ttl_hours: i64,

    /// Comma separated origins allowed to call the API; empty allows any
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Reject requests that did not arrive over HTTPS
    #[arg(long, env = "REQUIRE_HTTPS", action = ArgAction::Set, default_value_t = false, value_parser = BoolishValueParser::new())]
    pub require_https: bool,

    /// Trust X-Forwarded-For / X-Forwarded-Proto from a fronting proxy
    #[arg(long, env = "TRUST_PROXY", action = ArgAction::Set, default_value_t = false, value_parser = BoolishValueParser::new())]
    pub trust_proxy: bool,

    /// Admin account created on first start when none exists
    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    /// Password for the seeded admin; a random one is generated and logged if unset
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Make refresh tokens single-use by denylisting them on rotation and logout
    #[arg(long, env = "REFRESH_ROTATION_DENYLIST", action = ArgAction::Set, default_value_t = true, value_parser = BoolishValueParser::new())]
    pub refresh_rotation_denylist: bool,

    /// Interval of the bucket / denylist maintenance task
    #[arg(long, env = "RATE_LIMIT_CLEANUP_SECS", default_value_t = 60)]
    pub rate_limit_cleanup_secs: u64,
}

impl Config {
    /// Cross-field checks clap cannot express
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_ACCESS_TTL_MINUTES).contains(&self.access_ttl_minutes) {
            bail!(
                "ACCESS_TOKEN_TTL_MINUTES must be between 1 and {MAX_ACCESS_TTL_MINUTES}, got {}",
                self.access_ttl_minutes
            );
        }
        if !(1..=MAX_REFRESH_TTL_HOURS).contains(&self.refresh_ttl_hours) {
            bail!(
                "REFRESH_TOKEN_TTL_HOURS must be between 1 and {MAX_REFRESH_TTL_HOURS}, got {}",
                self.refresh_ttl_hours
            );
        }
        if self.refresh_ttl_hours * 60 <= self.access_ttl_minutes {
            bail!(
                "REFRESH_TOKEN_TTL_HOURS ({}h) must exceed ACCESS_TOKEN_TTL_MINUTES ({}m)",
                self.refresh_ttl_hours,
                self.access_ttl_minutes
            );
        }
        Ok(())
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_ttl_minutes)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.refresh_ttl_hours)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect()
    }
}

pub fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate directory when launched from elsewhere
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let candidate = manifest_dir.join(".env");
    if candidate.exists() {
        let _ = dotenv::from_path(&candidate);
    }
}
