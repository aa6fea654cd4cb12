//! API-side role gates.
//!
//! Called first thing in every mutating handler, before the payload is looked
//! at, so a rejected caller never reaches validation or persistence.

use stockroom_auth::{AuthError, User, require_admin, require_staff_or_admin};

use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;
use crate::context::AuthContext;

/// Require the caller to be staff or an admin (create/update).
pub async fn staff_or_admin(services: &AppServices, auth: &AuthContext) -> ApiResult<User> {
    require_staff_or_admin(&*services.store, auth.claims())
        .await
        .map_err(|e| gate_error(services, e))
}

/// Require the caller to be an admin (delete).
pub async fn admin(services: &AppServices, auth: &AuthContext) -> ApiResult<User> {
    require_admin(&*services.store, auth.claims())
        .await
        .map_err(|e| gate_error(services, e))
}

fn gate_error(services: &AppServices, err: AuthError) -> ApiError {
    match err {
        AuthError::Lookup(msg) => services.internal(msg),
        other => other.into(),
    }
}
