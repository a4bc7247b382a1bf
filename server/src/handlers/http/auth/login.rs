use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, combinators::BoxBody};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::{error, info, warn};

use crate::AppState;
use crate::auth::password;
use crate::database::utils::get_timestamp;
use crate::handlers::http::utils::deliver_serialized_json;

/// Login request data
#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

/// Login response codes
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginResponse {
    Success {
        user_id: i64,
        name: String,
        email: String,
        token: String,
        expires_in: u64,
        message: String,
    },
    Error {
        code: String,
        message: String,
    },
}

/// Error codes for login
#[derive(Debug, PartialEq, Eq)]
pub enum LoginError {
    /// Unknown email and wrong password both land here — the response never
    /// says which check failed.
    InvalidCredentials,
    MissingField(String),
    InvalidBody,
    DatabaseError,
    InternalError,
}

impl LoginError {
    fn to_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidBody => "INVALID_BODY",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    fn to_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::MissingField(field) => format!("Missing required field: {}", field),
            Self::InvalidBody => "Request body must be a JSON object".to_string(),
            Self::DatabaseError => "Database error occurred".to_string(),
            Self::InternalError => "An internal error occurred".to_string(),
        }
    }

    fn to_response(&self) -> LoginResponse {
        LoginResponse::Error {
            code: self.to_code().to_string(),
            message: self.to_message(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::MissingField(_) | Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::DatabaseError | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Main login handler
pub async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing login request");

    let login_data = match parse_login_body(req).await {
        Ok(data) => data,
        Err(e) => {
            warn!("Login parsing failed: {}", e.to_code());
            return deliver_serialized_json(&e.to_response(), e.status());
        }
    };

    if let Err(e) = validate_login(&login_data) {
        warn!("Login validation failed: {}", e.to_code());
        return deliver_serialized_json(&e.to_response(), e.status());
    }

    match attempt_login(&login_data, &state).await {
        Ok(response) => {
            deliver_serialized_json(&response, StatusCode::OK)
        }
        Err(e) => {
            warn!("Login failed: {}", e.to_code());
            deliver_serialized_json(&e.to_response(), e.status())
        }
    }
}

/// Parse the JSON request body
async fn parse_login_body(
    req: Request<hyper::body::Incoming>,
) -> std::result::Result<LoginData, LoginError> {
    let body = req
        .collect()
        .await
        .map_err(|_| LoginError::InternalError)?
        .to_bytes();

    serde_json::from_slice(&body).map_err(|_| LoginError::InvalidBody)
}

/// Validate login data
fn validate_login(data: &LoginData) -> std::result::Result<(), LoginError> {
    if data.email.trim().is_empty() {
        return Err(LoginError::MissingField("email".to_string()));
    }

    if data.password.is_empty() {
        return Err(LoginError::MissingField("password".to_string()));
    }

    Ok(())
}

/// Check the credential and mint a token.
///
/// Unknown email and wrong password are logged distinctly but both return
/// [`LoginError::InvalidCredentials`] — the caller cannot probe for
/// registered addresses.
async fn attempt_login(
    data: &LoginData,
    state: &AppState,
) -> std::result::Result<LoginResponse, LoginError> {
    use crate::database::users as db_users;

    let email = data.email.trim().to_lowercase();

    let user = db_users::get_user_auth(&state.db, email)
        .await
        .map_err(|e| {
            error!("Database error getting user auth: {}", e);
            LoginError::DatabaseError
        })?
        .ok_or_else(|| {
            warn!("Login attempt for unknown email");
            LoginError::InvalidCredentials
        })?;

    if let Err(e) = password::check_credential(&user.password_hash, &data.password) {
        warn!("Credential check failed for user {}: {}", user.id, e);
        return Err(LoginError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(user.id, &user.email, get_timestamp())
        .map_err(|e| {
            error!("Failed to issue token: {}", e);
            LoginError::InternalError
        })?;

    info!("User logged in successfully: {} (ID: {})", user.name, user.id);

    Ok(LoginResponse::Success {
        user_id: user.id,
        name: user.name,
        email: user.email,
        token,
        expires_in: state.tokens.ttl().as_secs(),
        message: "Login successful".to_string(),
    })
}
