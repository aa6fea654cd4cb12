//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store and token service handles shared by every handler
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use stockroom_auth::TokenVerifier;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: services::AppServices) -> Router {
    let tokens: Arc<dyn TokenVerifier> = services.tokens.clone();
    let auth_state = middleware::AuthState { tokens };
    let services = Arc::new(services);

    // Protected routes: bearer token required before any handler runs.
    let protected = routes::protected_router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/api/health", get(routes::system::health))
        .route("/api/debug", get(routes::system::debug))
        .merge(routes::public_router())
        .merge(protected)
        .fallback(routes::system::not_found)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
