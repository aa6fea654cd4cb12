//! Service wiring: the composition root's long-lived collaborators.

use std::sync::Arc;

use stockroom_auth::Hs256TokenService;
use stockroom_infra::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore};

use crate::app::errors::ApiError;
use crate::config::AppConfig;

/// Everything a handler needs, built once at startup and shared via `Extension`.
#[derive(Clone)]
pub struct AppServices {
    pub config: AppConfig,
    pub store: Arc<dyn CatalogStore>,
    pub tokens: Arc<Hs256TokenService>,
}

impl AppServices {
    pub fn new(config: AppConfig, store: Arc<dyn CatalogStore>) -> Self {
        let tokens = Arc::new(Hs256TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl));
        Self { config, store, tokens }
    }

    /// Log an unexpected fault and turn it into a 500.
    ///
    /// The fault message is returned to the caller only when
    /// `expose_internal_errors` is set.
    pub fn internal(&self, err: impl core::fmt::Display) -> ApiError {
        tracing::error!(error = %err, "request failed");
        if self.config.expose_internal_errors {
            ApiError::Internal(err.to_string())
        } else {
            ApiError::Internal("Internal server error".to_string())
        }
    }
}

/// Open the configured store: Postgres when `DATABASE_URL` is set, otherwise
/// an empty in-memory store.
pub async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CatalogStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresCatalogStore::connect(url, config.database_max_connections).await?;
            store.apply_schema().await?;
            tracing::info!("connected to postgres catalog store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on exit)");
            Ok(Arc::new(InMemoryCatalogStore::new()))
        }
    }
}
