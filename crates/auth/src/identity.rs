//! Identity resolution: verified token subject -> persisted user.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use stockroom_core::UserId;

use crate::{TokenClaims, User};

/// Read access to persisted users.
///
/// Implemented by the persistence layer; kept here so the resolver has no
/// storage dependency.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> anyhow::Result<Option<User>>;
}

/// Why a principal could not be resolved or authorized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid token - no identity found")]
    MissingIdentity,

    #[error("Invalid token - identity is not a valid user ID")]
    InvalidIdentity,

    #[error("User not found")]
    UserNotFound,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Insufficient permissions - admin access required")]
    AdminRequired,

    /// The directory failed; carries the fault message unchanged.
    #[error("{0}")]
    Lookup(String),
}

/// Coarse classification the transport maps to a status code.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    Unauthenticated,
    NotFound,
    Forbidden,
    Internal,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::MissingIdentity | AuthError::InvalidIdentity => AuthErrorKind::Unauthenticated,
            AuthError::UserNotFound => AuthErrorKind::NotFound,
            AuthError::InsufficientPermissions | AuthError::AdminRequired => AuthErrorKind::Forbidden,
            AuthError::Lookup(_) => AuthErrorKind::Internal,
        }
    }
}

/// Resolve the user a verified token speaks for.
///
/// No side effects; every failure is classified (see [`AuthError::kind`]).
pub async fn resolve_identity<D>(directory: &D, claims: &TokenClaims) -> Result<User, AuthError>
where
    D: UserDirectory + ?Sized,
{
    let user_id = subject_user_id(claims.sub.as_ref())?;

    match directory.find_user(user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(AuthError::UserNotFound),
        Err(e) => Err(AuthError::Lookup(e.to_string())),
    }
}

/// Interpret a subject claim as a user id.
///
/// Accepts integer strings and JSON integers. Missing, null and empty subjects
/// carry no identity; anything else is not a user id. Strings are parsed
/// strictly, so surrounding whitespace is rejected.
fn subject_user_id(sub: Option<&Value>) -> Result<UserId, AuthError> {
    match sub {
        None | Some(Value::Null) => Err(AuthError::MissingIdentity),
        Some(Value::String(s)) if s.is_empty() => Err(AuthError::MissingIdentity),
        Some(Value::String(s)) => s.parse::<UserId>().map_err(|_| AuthError::InvalidIdentity),
        Some(Value::Number(n)) => n.as_i64().map(UserId::new).ok_or(AuthError::InvalidIdentity),
        Some(_) => Err(AuthError::InvalidIdentity),
    }
}
