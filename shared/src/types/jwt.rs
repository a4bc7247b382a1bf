use serde::{Deserialize, Serialize};

/// Claims embedded in every bearer token issued by the server.
///
/// The token is self-contained: verifying the HMAC signature and checking
/// `exp` is everything — **zero DB reads** on any request.  The flip side is
/// that an issued token stays valid until `exp` no matter what; there is no
/// revocation list by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Standard JWT subject — the user ID rendered as a string.
    pub sub: String,

    /// Numeric user ID (matches `users.id`).  Kept alongside `sub` so
    /// handlers never re-parse the subject string.
    pub user_id: i64,

    /// Email captured at issue time.  Display-only; a changed email takes
    /// effect on the next login.
    pub email: String,

    /// Issued-at (Unix timestamp, seconds).
    pub iat: usize,

    /// Standard JWT expiry (Unix timestamp, seconds).  Always > `iat`.
    pub exp: usize,
}
