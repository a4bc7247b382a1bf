use thiserror::Error;

/// Authentication failure taxonomy.
///
/// Every variant here is an *expected* outcome — a wrong password or an
/// expired token is not an exceptional condition, so callers get a typed
/// value rather than a panic or an opaque error chain.
///
/// External callers must never learn which variant occurred: the router and
/// the login handler collapse all of these into one generic denial response.
/// Internal logs keep the distinction (`warn!("auth rejected: {e}")`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Submitted secret does not match the stored credential.
    #[error("invalid credentials")]
    CredentialInvalid,

    /// Token is not three base64url segments, or a segment fails to decode.
    #[error("malformed token")]
    Malformed,

    /// Token structure is fine but the MAC does not verify under the
    /// server key.
    #[error("token signature mismatch")]
    BadSignature,

    /// Token verified but `exp` has passed.
    #[error("token expired")]
    Expired,

    /// Declared signing algorithm differs from the one configured
    /// server-side (algorithm-substitution attempt, including `"none"`).
    #[error("token algorithm mismatch")]
    AlgorithmMismatch,
}
