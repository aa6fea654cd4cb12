use stockroom_auth::TokenClaims;

/// Verified token for a request.
///
/// Inserted by the auth middleware on protected routes; the subject is not
/// resolved to a user until a handler passes it through a role gate.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    claims: TokenClaims,
}

impl AuthContext {
    pub fn new(claims: TokenClaims) -> Self {
        Self { claims }
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }
}
