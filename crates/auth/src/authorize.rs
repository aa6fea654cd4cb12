//! Role gates layered on identity resolution.
//!
//! - No HTTP
//! - No panics
//! - The decision is a pure function of (resolved role, accepted roles)

use crate::identity::{AuthError, UserDirectory, resolve_identity};
use crate::{Role, TokenClaims, User, role_allowed};

const STAFF_OR_ADMIN: &[Role] = &[Role::Staff, Role::Admin];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Resolve the caller and require their role to be one of `allowed`.
///
/// Resolution failures propagate unchanged; a resolved user outside `allowed`
/// yields `denial`.
pub async fn require_role<D>(
    directory: &D,
    claims: &TokenClaims,
    allowed: &[Role],
    denial: AuthError,
) -> Result<User, AuthError>
where
    D: UserDirectory + ?Sized,
{
    let user = resolve_identity(directory, claims).await?;

    if role_allowed(allowed, user.role) {
        Ok(user)
    } else {
        tracing::warn!(user_id = %user.id, role = %user.role, "role gate denied request");
        Err(denial)
    }
}

/// Gate for create/update operations.
pub async fn require_staff_or_admin<D>(directory: &D, claims: &TokenClaims) -> Result<User, AuthError>
where
    D: UserDirectory + ?Sized,
{
    require_role(directory, claims, STAFF_OR_ADMIN, AuthError::InsufficientPermissions).await
}

/// Gate for destructive operations.
pub async fn require_admin<D>(directory: &D, claims: &TokenClaims) -> Result<User, AuthError>
where
    D: UserDirectory + ?Sized,
{
    require_role(directory, claims, ADMIN_ONLY, AuthError::AdminRequired).await
}
