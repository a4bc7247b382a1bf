use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, combinators::BoxBody};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::{error, info, warn};

use crate::AppState;
use crate::auth::password;
use crate::database::utils::{self, get_timestamp};
use crate::handlers::http::utils::deliver_serialized_json;

/// Registration request data
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationData {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Registration response codes
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistrationResponse {
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

/// Error codes for registration
#[derive(Debug, PartialEq, Eq)]
pub enum RegistrationError {
    EmailTaken,
    InvalidName,
    InvalidEmail,
    InvalidPassword,
    InvalidBody,
    DatabaseError,
    InternalError,
}

impl RegistrationError {
    fn to_code(&self) -> &'static str {
        match self {
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::InvalidName => "INVALID_NAME",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::InvalidBody => "INVALID_BODY",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    fn to_message(&self) -> String {
        match self {
            Self::EmailTaken => "Email is already registered".to_string(),
            Self::InvalidName => "Name must be 2-100 characters".to_string(),
            Self::InvalidEmail => "Invalid email format".to_string(),
            Self::InvalidPassword => {
                "Password must be 6-72 characters with at least one letter and one number"
                    .to_string()
            }
            Self::InvalidBody => "Request body must be a JSON object".to_string(),
            Self::DatabaseError => "Database error occurred".to_string(),
            Self::InternalError => "An internal error occurred".to_string(),
        }
    }

    fn to_response(&self) -> RegistrationResponse {
        RegistrationResponse::Error {
            code: self.to_code().to_string(),
            message: self.to_message(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::EmailTaken
            | Self::InvalidName
            | Self::InvalidEmail
            | Self::InvalidPassword
            | Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::DatabaseError | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Main registration handler
pub async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing registration request");

    let registration_data = match parse_registration_body(req).await {
        Ok(data) => data,
        Err(e) => {
            warn!("Registration parsing failed: {}", e.to_code());
            return deliver_serialized_json(&e.to_response(), e.status());
        }
    };

    if let Err(e) = validate_registration(&registration_data) {
        warn!("Registration validation failed: {}", e.to_code());
        return deliver_serialized_json(&e.to_response(), e.status());
    }

    match attempt_registration(&registration_data, &state).await {
        Ok(response) => deliver_serialized_json(&response, StatusCode::CREATED),
        Err(e) => {
            warn!("Registration failed: {}", e.to_code());
            deliver_serialized_json(&e.to_response(), e.status())
        }
    }
}

/// Parse the JSON request body
async fn parse_registration_body(
    req: Request<hyper::body::Incoming>,
) -> std::result::Result<RegistrationData, RegistrationError> {
    let body = req
        .collect()
        .await
        .map_err(|_| RegistrationError::InternalError)?
        .to_bytes();

    serde_json::from_slice(&body).map_err(|_| RegistrationError::InvalidBody)
}

/// Validate registration data
fn validate_registration(data: &RegistrationData) -> std::result::Result<(), RegistrationError> {
    if !utils::is_valid_name(&data.name) {
        return Err(RegistrationError::InvalidName);
    }

    if !utils::is_valid_email(data.email.trim()) {
        return Err(RegistrationError::InvalidEmail);
    }

    if !utils::is_valid_password(&data.password) {
        return Err(RegistrationError::InvalidPassword);
    }

    Ok(())
}

/// Hash the secret, insert the user, mint a first token.
///
/// The plaintext password exists only on this stack frame; what hits the
/// database is the Argon2id PHC string.
async fn attempt_registration(
    data: &RegistrationData,
    state: &AppState,
) -> std::result::Result<RegistrationResponse, RegistrationError> {
    use crate::database::users as db_users;

    let name = utils::sanitize_string(&data.name);
    let email = data.email.trim().to_lowercase();

    let taken = db_users::email_taken(&state.db, email.clone())
        .await
        .map_err(|e| {
            error!("Database error checking email: {}", e);
            RegistrationError::DatabaseError
        })?;
    if taken {
        return Err(RegistrationError::EmailTaken);
    }

    let password_hash = password::hash_password(&data.password).map_err(|e| {
        error!("Password hashing failed: {}", e);
        RegistrationError::InternalError
    })?;

    let user_id = match db_users::create_user(
        &state.db,
        db_users::NewUser {
            name: name.clone(),
            email: email.clone(),
            password_hash,
        },
    )
    .await
    {
        Ok(id) => id,
        // Raced a concurrent registration for the same address past the
        // email_taken check; the UNIQUE constraint is the authority.
        Err(e) if is_unique_violation(&e) => return Err(RegistrationError::EmailTaken),
        Err(e) => {
            error!("Database error creating user: {}", e);
            return Err(RegistrationError::DatabaseError);
        }
    };

    let token = state
        .tokens
        .issue(user_id, &email, get_timestamp())
        .map_err(|e| {
            error!("Failed to issue token: {}", e);
            RegistrationError::InternalError
        })?;

    info!("User registered successfully: {} (ID: {})", name, user_id);

    Ok(RegistrationResponse::Success {
        user_id,
        name,
        email,
        token,
        expires_in: state.tokens.ttl().as_secs(),
        message: "Registration successful".to_string(),
    })
}

fn is_unique_violation(err: &tokio_rusqlite::Error) -> bool {
    matches!(
        err,
        tokio_rusqlite::Error::Error(tokio_rusqlite::rusqlite::Error::SqliteFailure(e, _))
            if e.code == tokio_rusqlite::rusqlite::ErrorCode::ConstraintViolation
    )
}
