//! Comment endpoints.
//!
//! Creating and listing comments confirm the parent post exists (post
//! existence is public).  Deleting consults the ownership guard: comment
//! author or parent post owner, and a missing comment is denied exactly
//! like someone else's comment.

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
use crate::auth::authz::{self, Action, OwnershipView};
use crate::database::comments::CommentRecord;
use crate::handlers::http::utils::{
    deliver_error_json, deliver_serialized_json, deliver_success_json, parse_pagination, path_id,
};

const MAX_COMMENT_LEN: usize = 2_000;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub body: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommentError {
    InvalidPostId,
    InvalidCommentId,
    EmptyComment,
    CommentTooLong,
    MalformedRequest,
    PostNotFound,
    /// Missing comment and wrong owner collapse here.
    NotAuthorized,
    DatabaseError,
}

impl CommentError {
    fn to_code(&self) -> &'static str {
        match self {
            Self::InvalidPostId => "INVALID_POST_ID",
            Self::InvalidCommentId => "INVALID_COMMENT_ID",
            Self::EmptyComment => "EMPTY_COMMENT",
            Self::CommentTooLong => "COMMENT_TOO_LONG",
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::PostNotFound => "POST_NOT_FOUND",
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::DatabaseError => "DATABASE_ERROR",
        }
    }

    fn to_message(&self) -> String {
        match self {
            Self::InvalidPostId => "Invalid post ID".to_string(),
            Self::InvalidCommentId => "Invalid comment ID".to_string(),
            Self::EmptyComment => "Comment body cannot be empty".to_string(),
            Self::CommentTooLong => {
                format!("Comment must be at most {} characters", MAX_COMMENT_LEN)
            }
            Self::MalformedRequest => "Request body must be a JSON object".to_string(),
            Self::PostNotFound => "Post not found".to_string(),
            Self::NotAuthorized => "Not authorized".to_string(),
            Self::DatabaseError => "Database error occurred".to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPostId
            | Self::InvalidCommentId
            | Self::EmptyComment
            | Self::CommentTooLong
            | Self::MalformedRequest => StatusCode::BAD_REQUEST,
            Self::PostNotFound => StatusCode::NOT_FOUND,
            Self::NotAuthorized => StatusCode::FORBIDDEN,
            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn deliver_comment_error(e: &CommentError) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_error_json(e.to_code(), &e.to_message(), e.status())
}

fn comment_json(comment: &CommentRecord) -> serde_json::Value {
    json!({
        "id":         comment.id,
        "body":       comment.body,
        "owner_id":   comment.owner_id,
        "post_id":    comment.post_id,
        "created_at": comment.created_at,
    })
}

fn validate_comment(data: &CommentRequest) -> std::result::Result<(), CommentError> {
    let body = data.body.trim();
    if body.is_empty() {
        return Err(CommentError::EmptyComment);
    }
    if body.len() > MAX_COMMENT_LEN {
        return Err(CommentError::CommentTooLong);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/posts/:id/comments — paginated, oldest first, public.
pub async fn handle_list_comments(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    use crate::database::{comments as db_comments, posts as db_posts};

    let Some(post_id) = path_id(req.uri().path(), 3) else {
        return deliver_comment_error(&CommentError::InvalidPostId);
    };

    let pagination = parse_pagination(&req);

    let result = async {
        let post = db_posts::get_post(&state.db, post_id).await?;
        if post.is_none() {
            return Ok(None);
        }
        let comments = db_comments::list_post_comments(
            &state.db,
            post_id,
            pagination.limit(),
            pagination.offset(),
        )
        .await?;
        Ok::<_, tokio_rusqlite::Error>(Some(comments))
    }
    .await;

    match result {
        Ok(Some(comments)) => deliver_serialized_json(
            &json!({
                "status":    "success",
                "data":      comments.iter().map(comment_json).collect::<Vec<_>>(),
                "page":      pagination.page,
                "page_size": pagination.page_size,
            }),
            StatusCode::OK,
        ),
        Ok(None) => deliver_comment_error(&CommentError::PostNotFound),
        Err(e) => {
            error!("Database error listing comments for post {}: {}", post_id, e);
            deliver_comment_error(&CommentError::DatabaseError)
        }
    }
}

/// POST /api/posts/:id/comments — comment on an existing post.
pub async fn handle_create_comment(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(post_id) = path_id(req.uri().path(), 3) else {
        return deliver_comment_error(&CommentError::InvalidPostId);
    };

    info!("Processing comment on post {} by user {}", post_id, identity.user_id());

    let body = req
        .collect()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read request body: {}", e))?
        .to_bytes();

    let data: CommentRequest = match serde_json::from_slice(&body) {
        Ok(data) => data,
        Err(_) => return deliver_comment_error(&CommentError::MalformedRequest),
    };

    match apply_create(&state, identity.user_id(), post_id, &data).await {
        Ok(comment) => deliver_serialized_json(
            &json!({ "status": "success", "data": comment_json(&comment) }),
            StatusCode::CREATED,
        ),
        Err(e) => {
            warn!("Comment on post {} failed: {}", post_id, e.to_code());
            deliver_comment_error(&e)
        }
    }
}

/// DELETE /api/comments/:id — comment author or parent post owner.
pub async fn handle_delete_comment(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(comment_id) = path_id(req.uri().path(), 3) else {
        return deliver_comment_error(&CommentError::InvalidCommentId);
    };

    info!(
        "Processing deletion of comment {} by user {}",
        comment_id,
        identity.user_id()
    );

    match apply_delete(&state, identity.user_id(), comment_id).await {
        Ok(()) => {
            deliver_success_json::<serde_json::Value>(None, Some("Comment deleted"), StatusCode::OK)
        }
        Err(e) => {
            warn!("Deletion of comment {} failed: {}", comment_id, e.to_code());
            deliver_comment_error(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// Core operations (handler-independent, used by the tests)
// ---------------------------------------------------------------------------

async fn apply_create(
    state: &AppState,
    user_id: i64,
    post_id: i64,
    data: &CommentRequest,
) -> std::result::Result<CommentRecord, CommentError> {
    use crate::database::{comments as db_comments, posts as db_posts};

    validate_comment(data)?;

    // Dependents may not reference a missing post.
    let exists = db_posts::get_post(&state.db, post_id)
        .await
        .map_err(|e| {
            error!("Database error checking post: {}", e);
            CommentError::DatabaseError
        })?
        .is_some();
    if !exists {
        return Err(CommentError::PostNotFound);
    }

    let comment_id = db_comments::create_comment(
        &state.db,
        db_comments::NewComment {
            body: data.body.trim().to_string(),
            owner_id: user_id,
            post_id,
        },
    )
    .await
    .map_err(|e| {
        error!("Database error creating comment: {}", e);
        CommentError::DatabaseError
    })?;

    db_comments::get_comment(&state.db, comment_id)
        .await
        .map_err(|e| {
            error!("Database error reloading comment: {}", e);
            CommentError::DatabaseError
        })?
        .ok_or(CommentError::DatabaseError)
}

async fn apply_delete(
    state: &AppState,
    user_id: i64,
    comment_id: i64,
) -> std::result::Result<(), CommentError> {
    use crate::database::{comments as db_comments, posts as db_posts};

    let comment = db_comments::get_comment(&state.db, comment_id)
        .await
        .map_err(|e| {
            error!("Database error fetching comment: {}", e);
            CommentError::DatabaseError
        })?;

    let view = match &comment {
        None => None,
        Some(comment) => {
            let parent_owner = db_posts::post_owner(&state.db, comment.post_id)
                .await
                .map_err(|e| {
                    error!("Database error snapshotting post owner: {}", e);
                    CommentError::DatabaseError
                })?;

            Some(OwnershipView {
                owner_id: comment.owner_id,
                parent_owner_id: parent_owner,
            })
        }
    };

    if !authz::can(user_id, Action::Delete, view.as_ref()) {
        warn!("User {} denied deletion of comment {}", user_id, comment_id);
        return Err(CommentError::NotAuthorized);
    }

    // A false return means the comment vanished between snapshot and delete;
    // it is gone either way, so both paths are a success to the caller.
    db_comments::delete_comment(&state.db, comment_id)
        .await
        .map_err(|e| {
            error!("Database error deleting comment: {}", e);
            CommentError::DatabaseError
        })?;

    Ok(())
}
