//! Process configuration, read once at startup from the environment.

use std::net::SocketAddr;

use anyhow::Context;
use chrono::Duration;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HS256 signing secret.
    pub jwt_secret: String,
    /// Whether `jwt_secret` came from the environment rather than the dev default.
    pub jwt_secret_configured: bool,
    pub token_ttl: Duration,
    /// Postgres URL; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub environment: String,
    /// Return persistence fault messages to clients verbatim.
    pub expose_internal_errors: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let (jwt_secret, jwt_secret_configured) = match var("JWT_SECRET") {
            Some(secret) => (secret, true),
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                (DEV_JWT_SECRET.to_string(), false)
            }
        };

        let ttl_hours = match var("TOKEN_TTL_HOURS") {
            Some(v) => v
                .parse::<i64>()
                .with_context(|| format!("TOKEN_TTL_HOURS must be an integer, got '{v}'"))?,
            None => 24,
        };
        if ttl_hours <= 0 {
            anyhow::bail!("TOKEN_TTL_HOURS must be positive, got {ttl_hours}");
        }

        let database_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS must be an integer, got '{v}'"))?,
            None => 10,
        };

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("BIND_ADDR must be host:port, got '{bind_addr}'"))?;

        let environment = var("APP_ENV").unwrap_or_else(|| "development".to_string());
        let expose_internal_errors = environment != "production";

        Ok(Self {
            jwt_secret,
            jwt_secret_configured,
            token_ttl: Duration::hours(ttl_hours),
            database_url: var("DATABASE_URL"),
            database_max_connections,
            bind_addr,
            environment,
            expose_internal_errors,
        })
    }
}
