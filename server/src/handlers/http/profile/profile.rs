//! The authenticated user's own account.
//!
//! Auth is performed by the router BEFORE these handlers are called: every
//! handler receives a verified [`Identity`] and never re-checks the token.

use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, combinators::BoxBody};
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::AppState;
use crate::auth::Identity;
use crate::database::users::UserRecord;
use crate::database::{CascadeError, cascade, utils};
use crate::handlers::http::utils::{deliver_error_json, deliver_serialized_json, deliver_success_json};

#[derive(Debug, PartialEq, Eq)]
pub enum ProfileError {
    /// The account behind a still-valid token is gone — possible because
    /// tokens cannot be revoked at deletion time (stateless by design).
    UserNotFound,
    InvalidName,
    InvalidBody,
    DatabaseError,
    /// Cascade failed or timed out; nothing was deleted.  Retryable.
    TransactionFailed,
}

impl ProfileError {
    fn to_code(&self) -> &'static str {
        match self {
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::InvalidName => "INVALID_NAME",
            Self::InvalidBody => "INVALID_BODY",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::TransactionFailed => "TRANSACTION_FAILED",
        }
    }

    fn to_message(&self) -> String {
        match self {
            Self::UserNotFound => "User not found".to_string(),
            Self::InvalidName => "Name must be 2-100 characters".to_string(),
            Self::InvalidBody => "Request body must be a JSON object".to_string(),
            Self::DatabaseError => "Database error occurred".to_string(),
            Self::TransactionFailed => "Deletion could not complete; please retry".to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::InvalidName | Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TransactionFailed => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

fn profile_json(user: &UserRecord) -> serde_json::Value {
    json!({
        "id":         user.id,
        "name":       user.name,
        "email":      user.email,
        "created_at": user.created_at,
        "updated_at": user.updated_at,
    })
}

fn deliver_profile_error(e: &ProfileError) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_error_json(e.to_code(), &e.to_message(), e.status())
}

// ===========================================================================
// get
// ===========================================================================

/// GET /api/users/me — return the authenticated user's profile.
pub async fn handle_get_me(
    _req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing get profile for user {}", identity.user_id());

    match fetch_profile(&state, identity.user_id()).await {
        Ok(user) => deliver_serialized_json(
            &json!({ "status": "success", "data": profile_json(&user) }),
            StatusCode::OK,
        ),
        Err(e) => {
            warn!("Get profile failed for user {}: {}", identity.user_id(), e.to_code());
            deliver_profile_error(&e)
        }
    }
}

// ===========================================================================
// update
// ===========================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateProfileData {
    pub name: String,
}

/// PATCH /api/users/me — update the display name.
///
/// Principal attributes are mutable only by the principal itself; the route
/// derives the target from the verified identity, never from the body.
pub async fn handle_update_me(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing update profile for user {}", identity.user_id());

    let body = req
        .collect()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read request body: {}", e))?
        .to_bytes();

    let data: UpdateProfileData = match serde_json::from_slice(&body) {
        Ok(data) => data,
        Err(_) => return deliver_profile_error(&ProfileError::InvalidBody),
    };

    match apply_rename(&state, identity.user_id(), &data.name).await {
        Ok(user) => deliver_serialized_json(
            &json!({ "status": "success", "data": profile_json(&user) }),
            StatusCode::OK,
        ),
        Err(e) => {
            warn!("Update profile failed for user {}: {}", identity.user_id(), e.to_code());
            deliver_profile_error(&e)
        }
    }
}

// ===========================================================================
// delete
// ===========================================================================

/// DELETE /api/users/me — delete the account and everything it owns.
///
/// Runs the user cascade: the user's comments and reactions everywhere,
/// every post they own with its dependents, then the user row — one atomic
/// transaction.  The bearer token naturally outlives the account; any later
/// use hits `USER_NOT_FOUND`.
pub async fn handle_delete_me(
    _req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing account deletion for user {}", identity.user_id());

    match apply_delete(&state, identity.user_id()).await {
        Ok(()) => deliver_success_json::<serde_json::Value>(
            None,
            Some("Account deleted"),
            StatusCode::OK,
        ),
        Err(e) => {
            warn!("Account deletion failed for user {}: {}", identity.user_id(), e.to_code());
            deliver_profile_error(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// Core operations (handler-independent, used by the tests)
// ---------------------------------------------------------------------------

async fn fetch_profile(state: &AppState, user_id: i64) -> std::result::Result<UserRecord, ProfileError> {
    use crate::database::users as db_users;

    db_users::get_user_by_id(&state.db, user_id)
        .await
        .map_err(|e| {
            error!("Database error fetching profile: {}", e);
            ProfileError::DatabaseError
        })?
        .ok_or(ProfileError::UserNotFound)
}

async fn apply_rename(
    state: &AppState,
    user_id: i64,
    name: &str,
) -> std::result::Result<UserRecord, ProfileError> {
    use crate::database::users as db_users;

    if !utils::is_valid_name(name) {
        return Err(ProfileError::InvalidName);
    }

    let renamed = db_users::update_user_name(&state.db, user_id, utils::sanitize_string(name))
        .await
        .map_err(|e| {
            error!("Database error renaming user: {}", e);
            ProfileError::DatabaseError
        })?;

    if !renamed {
        return Err(ProfileError::UserNotFound);
    }

    fetch_profile(state, user_id).await
}

async fn apply_delete(state: &AppState, user_id: i64) -> std::result::Result<(), ProfileError> {
    match cascade::delete_user(&state.db, user_id).await {
        Ok(()) => Ok(()),
        Err(CascadeError::NotFound) => Err(ProfileError::UserNotFound),
        Err(e @ CascadeError::DeadlineExceeded) | Err(e @ CascadeError::Transaction(_)) => {
            error!("User cascade failed: {}", e);
            Err(ProfileError::TransactionFailed)
        }
    }
}
