use shared::types::jwt::JwtClaims;

/// Verified identity for a single request.
///
/// Created once — by [`TokenAuthority::verify`] after the token checks out,
/// or at login/registration — then passed explicitly down the handler chain.
/// Fields are private so the value stays read-only after construction; there
/// is no keyed context lookup or runtime downcasting anywhere.
///
/// Never persisted; dropped at the end of the request.
///
/// [`TokenAuthority::verify`]: crate::auth::tokens::TokenAuthority::verify
#[derive(Debug, Clone)]
pub struct Identity {
    user_id: i64,
    email: String,
    issued_at: i64,
    expires_at: i64,
}

impl Identity {
    pub(crate) fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email.clone(),
            issued_at: claims.iat as i64,
            expires_at: claims.exp as i64,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }
}
