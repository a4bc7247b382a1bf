use std::time::Duration;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use shared::types::jwt::JwtClaims;

use crate::auth::error::AuthError;
use crate::auth::identity::Identity;

/// The only signing algorithm this server accepts.  Symmetric HMAC — the
/// same key material signs and verifies, so issuer and verifier must share
/// one `TokenAuthority` (or two constructed from the same secret).
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Refuse keys below this size.  A short HMAC key makes offline brute-force
/// of the signature practical, which silently voids every other guarantee.
pub const MIN_SECRET_BYTES: usize = 32;

/// Issues and verifies stateless bearer tokens.
///
/// The key is injected at construction — never read from ambient process
/// state — so tests can run several independently-keyed authorities side by
/// side.  Verification touches no storage and no network: signature + clock
/// is the whole check.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenAuthority {
    /// Build an authority from raw secret bytes and a token lifetime.
    ///
    /// Fails when the secret is shorter than [`MIN_SECRET_BYTES`] — callers
    /// treat that as a fatal startup condition, not something to paper over
    /// with a default key.
    pub fn new(secret: &[u8], ttl: Duration) -> anyhow::Result<Self> {
        if secret.len() < MIN_SECRET_BYTES {
            anyhow::bail!(
                "signing secret must be at least {} bytes, got {}",
                MIN_SECRET_BYTES,
                secret.len()
            );
        }
        if ttl.as_secs() == 0 {
            anyhow::bail!("token ttl must be non-zero");
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a signed token for an authenticated user.
    ///
    /// `now` is a Unix timestamp in seconds, passed explicitly so callers
    /// (and tests) control the clock.  Claims: `sub`/`user_id`, `email`,
    /// `iat = now`, `exp = now + ttl`.
    pub fn issue(&self, user_id: i64, email: &str, now: i64) -> anyhow::Result<String> {
        let claims = JwtClaims {
            sub: user_id.to_string(),
            user_id,
            email: email.to_string(),
            iat: now as usize,
            exp: (now + self.ttl.as_secs() as i64) as usize,
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding)
            .context("Failed to sign token")
    }

    /// Verify a presented token against the server key and the given clock.
    ///
    /// Check order:
    ///   1. three dot-separated segments, header decodes → else `Malformed`
    ///   2. declared algorithm is HS256 → else `AlgorithmMismatch`
    ///   3. MAC over header+payload verifies → else `BadSignature`
    ///   4. `now < exp` → else `Expired`
    ///
    /// The algorithm check runs on the *declared* header before any
    /// signature work, so a token claiming `"none"` or an asymmetric scheme
    /// is rejected as a substitution attempt even if its signature bytes
    /// would coincidentally match.
    pub fn verify(&self, token: &str, now: i64) -> Result<Identity, AuthError> {
        let declared = declared_algorithm(token)?;
        if declared != "HS256" {
            debug!("Token declared unsupported algorithm: {}", declared);
            return Err(AuthError::AlgorithmMismatch);
        }

        // Expiry is validated below against the caller's clock, not the
        // system clock the jsonwebtoken crate would use.
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data =
            decode::<JwtClaims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::BadSignature,
                _ => AuthError::Malformed,
            })?;

        let claims = data.claims;
        if now >= claims.exp as i64 {
            return Err(AuthError::Expired);
        }

        Ok(Identity::from_claims(&claims))
    }
}

/// Read the `alg` field out of the (unverified) token header.
///
/// Done by hand rather than via `jsonwebtoken::decode_header` because the
/// crate cannot represent `"alg": "none"` in its `Algorithm` enum — it would
/// surface as a parse error, and we want that case reported as an algorithm
/// mismatch, not as a malformed token.
fn declared_algorithm(token: &str) -> Result<String, AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::Malformed);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(segments[0])
        .map_err(|_| AuthError::Malformed)?;

    let header: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::Malformed)?;

    header
        .get("alg")
        .and_then(|a| a.as_str())
        .map(str::to_owned)
        .ok_or(AuthError::Malformed)
}
