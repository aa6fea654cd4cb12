use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::errors::json_error;
use crate::app::services::AppServices;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "message": "Stockroom API is running",
    }))
}

/// Deployment diagnostics. A store fault is reported in the body rather than
/// failing the request.
pub async fn debug(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    let mut body = serde_json::json!({
        "status": "debug_info",
        "jwt_secret_configured": services.config.jwt_secret_configured,
        "environment": services.config.environment,
    });

    match services.store.count_users().await {
        Ok(count) => {
            body["database_accessible"] = true.into();
            body["user_count"] = count.into();
        }
        Err(err) => {
            tracing::warn!(error = %err, "debug endpoint could not reach the store");
            body["database_accessible"] = false.into();
            body["error"] = err.to_string().into();
        }
    }

    Json(body)
}

pub async fn not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "Not found")
}
