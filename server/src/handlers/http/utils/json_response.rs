use anyhow::{Result, anyhow};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode, header};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use tracing::{debug, error};

use shared::types::json_error::ErrorResponse;

/// Serialize any `Serialize` type and deliver it as a JSON response.
/// This is the primary helper all handlers should use instead of
/// writing their own one-off serialization + response-building blocks.
pub fn deliver_serialized_json<T: Serialize>(
    data: &T,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let json = serde_json::to_string(data).map_err(|e| anyhow!("Failed to serialize: {}", e))?;

    debug!("Delivering JSON response, size: {} bytes", json.len());

    let response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(json)).boxed())
        .map_err(|e| anyhow!("Failed to build JSON response: {}", e))?;

    Ok(response)
}

/// Delivers a JSON error response with the specified error code, message, and status.
pub fn deliver_error_json(
    error_code: &str,
    message: &str,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    error!(
        "Delivering error JSON: {} - {} ({})",
        status.as_u16(),
        error_code,
        message
    );

    deliver_serialized_json(&ErrorResponse::new(error_code, message), status)
}

/// Delivers a success JSON response with optional data and message.
pub fn deliver_success_json<T: Serialize>(
    data: Option<T>,
    message: Option<&str>,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let mut body = json!({ "status": "success" });

    if let Some(d) = data {
        body["data"] = serde_json::to_value(d).map_err(|e| anyhow!("Failed to serialize: {}", e))?;
    }
    if let Some(m) = message {
        body["message"] = json!(m);
    }

    deliver_serialized_json(&body, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_shape() {
        let resp = deliver_error_json("NOT_AUTHORIZED", "not authorized", StatusCode::FORBIDDEN)
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn success_with_message_only() {
        let resp =
            deliver_success_json::<serde_json::Value>(None, Some("done"), StatusCode::OK).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
