use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use stockroom_auth::TokenVerifier;

use crate::app::errors::ApiError;
use crate::context::AuthContext;

const TOKEN_REQUIRED: &str = "Authorization token is required";

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenVerifier>,
}

/// Reject requests without a valid, unexpired bearer token.
///
/// Runs before the handler, so no domain logic executes for a bad token.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let claims = state
        .tokens
        .verify(token)
        .map_err(|e| ApiError::Unauthenticated(e.to_string()))?;

    req.extensions_mut().insert(AuthContext::new(claims));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let missing = || ApiError::Unauthenticated(TOKEN_REQUIRED.to_string());

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(missing)?;

    let header = header.to_str().map_err(|_| missing())?;

    let header = header.strip_prefix("Bearer ").ok_or_else(missing)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(missing());
    }

    Ok(token)
}
