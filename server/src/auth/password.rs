use tracing::debug;

use crate::auth::error::AuthError;

/// Hash a password using Argon2id (recommended for production)
///
/// The returned PHC string embeds the algorithm, its parameters, and the
/// per-invocation random salt, so verification keeps working after a future
/// work-factor increase — old hashes verify with their recorded parameters.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString},
    };
    use rand::rngs::OsRng;

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))
}

/// Verify a password against its stored hash.
///
/// Recomputes using the parameters embedded in the stored PHC string and
/// compares in constant time (the argon2 crate guarantees this).
///
/// A malformed stored hash is a verification *failure*, never an error —
/// the caller cannot tell "no such hash" apart from "wrong password", so
/// nothing leaks about which part failed.
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    use argon2::{
        Argon2,
        password_hash::{PasswordHash, PasswordVerifier},
    };

    let parsed_hash = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Stored password hash failed to parse: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Typed form of [`verify_password`] for the login path: a failed check is
/// an expected outcome, returned as [`AuthError::CredentialInvalid`].
pub fn check_credential(stored_hash: &str, password: &str) -> Result<(), AuthError> {
    if verify_password(stored_hash, password) {
        Ok(())
    } else {
        Err(AuthError::CredentialInvalid)
    }
}
