//! `stockroom-auth`: authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: user lookups go through the
//! [`UserDirectory`] trait, implemented by the persistence layer.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod roles;
pub mod user;

pub use authorize::{require_admin, require_role, require_staff_or_admin};
pub use claims::{Hs256TokenService, TokenClaims, TokenError, TokenVerifier};
pub use identity::{AuthError, AuthErrorKind, UserDirectory, resolve_identity};
pub use roles::{Role, role_allowed};
pub use user::User;
