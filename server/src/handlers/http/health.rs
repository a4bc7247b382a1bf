use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};

use crate::AppState;
use crate::handlers::http::utils::deliver_serialized_json;

/// GET /api/health — liveness probe, no auth, no storage access.
pub async fn handle_health(
    _req: Request<hyper::body::Incoming>,
    _state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_serialized_json(&serde_json::json!({ "status": "ok" }), StatusCode::OK)
}
