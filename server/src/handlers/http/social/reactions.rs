//! Reaction ("like") endpoints.
//!
//! One toggle route: anyone authenticated may react to any existing post,
//! so the only checks are authentication (done by the router) and post
//! existence.

use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::{error, info, warn};

use crate::AppState;
use crate::auth::Identity;
use crate::handlers::http::utils::{deliver_error_json, deliver_serialized_json, path_id};

#[derive(Debug, PartialEq, Eq)]
pub enum ReactionError {
    InvalidPostId,
    PostNotFound,
    DatabaseError,
}

impl ReactionError {
    fn to_code(&self) -> &'static str {
        match self {
            Self::InvalidPostId => "INVALID_POST_ID",
            Self::PostNotFound => "POST_NOT_FOUND",
            Self::DatabaseError => "DATABASE_ERROR",
        }
    }

    fn to_message(&self) -> String {
        match self {
            Self::InvalidPostId => "Invalid post ID".to_string(),
            Self::PostNotFound => "Post not found".to_string(),
            Self::DatabaseError => "Database error occurred".to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPostId => StatusCode::BAD_REQUEST,
            Self::PostNotFound => StatusCode::NOT_FOUND,
            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// POST /api/posts/:id/react — toggle the authenticated user's reaction.
pub async fn handle_toggle_reaction(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(post_id) = path_id(req.uri().path(), 3) else {
        let e = ReactionError::InvalidPostId;
        return deliver_error_json(e.to_code(), &e.to_message(), e.status());
    };

    info!("Processing reaction toggle on post {} by user {}", post_id, identity.user_id());

    match apply_toggle(&state, identity.user_id(), post_id).await {
        Ok(liked) => deliver_serialized_json(
            &json!({ "status": "success", "data": { "liked": liked } }),
            StatusCode::OK,
        ),
        Err(e) => {
            warn!("Reaction toggle on post {} failed: {}", post_id, e.to_code());
            deliver_error_json(e.to_code(), &e.to_message(), e.status())
        }
    }
}

// ---------------------------------------------------------------------------
// Core operation (handler-independent, used by the tests)
// ---------------------------------------------------------------------------

async fn apply_toggle(
    state: &AppState,
    user_id: i64,
    post_id: i64,
) -> std::result::Result<bool, ReactionError> {
    use crate::database::{posts as db_posts, reactions as db_reactions};

    let exists = db_posts::get_post(&state.db, post_id)
        .await
        .map_err(|e| {
            error!("Database error checking post: {}", e);
            ReactionError::DatabaseError
        })?
        .is_some();
    if !exists {
        return Err(ReactionError::PostNotFound);
    }

    db_reactions::toggle_reaction(&state.db, user_id, post_id)
        .await
        .map_err(|e| {
            error!("Database error toggling reaction: {}", e);
            ReactionError::DatabaseError
        })
}
