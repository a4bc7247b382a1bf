use serde::{Deserialize, Serialize};

/// Standard error response structure
///
/// Every error the API returns serializes to this envelope.  `code` is a
/// stable machine-readable string (e.g. `"NOT_AUTHORIZED"`); `message` is
/// for humans and carries no information beyond what `code` already states.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            status: "error".to_string(),
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}
