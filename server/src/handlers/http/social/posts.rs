//! Post endpoints.
//!
//! Reads are public.  Mutations consult the ownership guard first, and a
//! denial is one flat `NOT_AUTHORIZED` whether the post is missing or owned
//! by someone else — mutation paths never confirm existence.

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
use crate::database::posts::{PostRecord, PostSummary};
use crate::database::{CascadeError, cascade};
use crate::handlers::http::utils::{
    deliver_error_json, deliver_serialized_json, deliver_success_json, parse_pagination, path_id,
};

const MAX_TITLE_LEN: usize = 200;
const MAX_BODY_LEN: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PostError {
    InvalidPostId,
    InvalidTitle,
    BodyTooLong,
    MalformedRequest,
    /// Missing post and wrong owner collapse here on mutation paths.
    NotAuthorized,
    /// Only surfaced by public reads, or to an owner whose post vanished
    /// mid-request.
    PostNotFound,
    DatabaseError,
    /// Cascade failed or timed out; nothing was deleted.  Retryable.
    TransactionFailed,
}

impl PostError {
    fn to_code(&self) -> &'static str {
        match self {
            Self::InvalidPostId => "INVALID_POST_ID",
            Self::InvalidTitle => "INVALID_TITLE",
            Self::BodyTooLong => "BODY_TOO_LONG",
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::PostNotFound => "POST_NOT_FOUND",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::TransactionFailed => "TRANSACTION_FAILED",
        }
    }

    fn to_message(&self) -> String {
        match self {
            Self::InvalidPostId => "Invalid post ID".to_string(),
            Self::InvalidTitle => format!("Title must be 1-{} characters", MAX_TITLE_LEN),
            Self::BodyTooLong => format!("Body must be at most {} characters", MAX_BODY_LEN),
            Self::MalformedRequest => "Request body must be a JSON object".to_string(),
            Self::NotAuthorized => "Not authorized".to_string(),
            Self::PostNotFound => "Post not found".to_string(),
            Self::DatabaseError => "Database error occurred".to_string(),
            Self::TransactionFailed => "Deletion could not complete; please retry".to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPostId | Self::InvalidTitle | Self::BodyTooLong | Self::MalformedRequest => {
                StatusCode::BAD_REQUEST
            }
            Self::NotAuthorized => StatusCode::FORBIDDEN,
            Self::PostNotFound => StatusCode::NOT_FOUND,
            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TransactionFailed => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

fn deliver_post_error(e: &PostError) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_error_json(e.to_code(), &e.to_message(), e.status())
}

fn post_json(post: &PostRecord, comment_count: i64, reaction_count: i64) -> serde_json::Value {
    json!({
        "id":             post.id,
        "title":          post.title,
        "body":           post.body,
        "owner_id":       post.owner_id,
        "created_at":     post.created_at,
        "updated_at":     post.updated_at,
        "comment_count":  comment_count,
        "reaction_count": reaction_count,
    })
}

fn summary_json(summary: &PostSummary) -> serde_json::Value {
    post_json(&summary.post, summary.comment_count, summary.reaction_count)
}

fn validate_post(data: &PostRequest) -> std::result::Result<(), PostError> {
    let title = data.title.trim();
    if title.is_empty() || title.len() > MAX_TITLE_LEN {
        return Err(PostError::InvalidTitle);
    }
    if data.body.len() > MAX_BODY_LEN {
        return Err(PostError::BodyTooLong);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/posts — paginated listing with dependent counts, public.
pub async fn handle_list_posts(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    use crate::database::posts as db_posts;

    let pagination = parse_pagination(&req);
    info!("Listing posts, page {}", pagination.page);

    let result = async {
        let total = db_posts::count_posts(&state.db).await?;
        let posts =
            db_posts::list_posts(&state.db, pagination.limit(), pagination.offset()).await?;
        Ok::<_, tokio_rusqlite::Error>((total, posts))
    }
    .await;

    match result {
        Ok((total, posts)) => deliver_serialized_json(
            &json!({
                "status":    "success",
                "data":      posts.iter().map(summary_json).collect::<Vec<_>>(),
                "total":     total,
                "page":      pagination.page,
                "page_size": pagination.page_size,
            }),
            StatusCode::OK,
        ),
        Err(e) => {
            error!("Database error listing posts: {}", e);
            deliver_post_error(&PostError::DatabaseError)
        }
    }
}

/// GET /api/posts/:id — single post with counts, public.
pub async fn handle_get_post(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    use crate::database::posts as db_posts;

    let Some(post_id) = path_id(req.uri().path(), 3) else {
        return deliver_post_error(&PostError::InvalidPostId);
    };

    match db_posts::get_post_with_counts(&state.db, post_id).await {
        Ok(Some(summary)) => deliver_serialized_json(
            &json!({ "status": "success", "data": summary_json(&summary) }),
            StatusCode::OK,
        ),
        Ok(None) => deliver_post_error(&PostError::PostNotFound),
        Err(e) => {
            error!("Database error fetching post {}: {}", post_id, e);
            deliver_post_error(&PostError::DatabaseError)
        }
    }
}

/// POST /api/posts — create a post owned by the authenticated user.
pub async fn handle_create_post(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing create post from user {}", identity.user_id());

    let body = req
        .collect()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read request body: {}", e))?
        .to_bytes();

    let data: PostRequest = match serde_json::from_slice(&body) {
        Ok(data) => data,
        Err(_) => return deliver_post_error(&PostError::MalformedRequest),
    };

    match apply_create(&state, identity.user_id(), &data).await {
        Ok(post) => deliver_serialized_json(
            &json!({ "status": "success", "data": post_json(&post, 0, 0) }),
            StatusCode::CREATED,
        ),
        Err(e) => {
            warn!("Create post failed for user {}: {}", identity.user_id(), e.to_code());
            deliver_post_error(&e)
        }
    }
}

/// PATCH /api/posts/:id — update title/body, owner only.
pub async fn handle_update_post(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(post_id) = path_id(req.uri().path(), 3) else {
        return deliver_post_error(&PostError::InvalidPostId);
    };

    info!("Processing update of post {} by user {}", post_id, identity.user_id());

    let body = req
        .collect()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read request body: {}", e))?
        .to_bytes();

    let data: PostRequest = match serde_json::from_slice(&body) {
        Ok(data) => data,
        Err(_) => return deliver_post_error(&PostError::MalformedRequest),
    };

    match apply_update(&state, identity.user_id(), post_id, &data).await {
        Ok(post) => deliver_serialized_json(
            &json!({ "status": "success", "data": post_json(&post.post, post.comment_count, post.reaction_count) }),
            StatusCode::OK,
        ),
        Err(e) => {
            warn!("Update of post {} failed: {}", post_id, e.to_code());
            deliver_post_error(&e)
        }
    }
}

/// DELETE /api/posts/:id — cascade-delete a post, owner only.
pub async fn handle_delete_post(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(post_id) = path_id(req.uri().path(), 3) else {
        return deliver_post_error(&PostError::InvalidPostId);
    };

    info!("Processing deletion of post {} by user {}", post_id, identity.user_id());

    match apply_delete(&state, identity.user_id(), post_id).await {
        Ok(()) => {
            deliver_success_json::<serde_json::Value>(None, Some("Post deleted"), StatusCode::OK)
        }
        Err(e) => {
            warn!("Deletion of post {} failed: {}", post_id, e.to_code());
            deliver_post_error(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// Core operations (handler-independent, used by the tests)
// ---------------------------------------------------------------------------

async fn apply_create(
    state: &AppState,
    user_id: i64,
    data: &PostRequest,
) -> std::result::Result<PostRecord, PostError> {
    use crate::database::posts as db_posts;

    validate_post(data)?;

    let post_id = db_posts::create_post(
        &state.db,
        db_posts::NewPost {
            title: data.title.trim().to_string(),
            body: data.body.clone(),
            owner_id: user_id,
        },
    )
    .await
    .map_err(|e| {
        error!("Database error creating post: {}", e);
        PostError::DatabaseError
    })?;

    db_posts::get_post(&state.db, post_id)
        .await
        .map_err(|e| {
            error!("Database error reloading post: {}", e);
            PostError::DatabaseError
        })?
        .ok_or(PostError::PostNotFound)
}

/// Ownership snapshot for the guard; `None` when the post doesn't exist.
async fn ownership_of(
    state: &AppState,
    post_id: i64,
) -> std::result::Result<Option<OwnershipView>, PostError> {
    use crate::database::posts as db_posts;

    let owner = db_posts::post_owner(&state.db, post_id).await.map_err(|e| {
        error!("Database error snapshotting post owner: {}", e);
        PostError::DatabaseError
    })?;

    Ok(owner.map(OwnershipView::owned_by))
}

async fn apply_update(
    state: &AppState,
    user_id: i64,
    post_id: i64,
    data: &PostRequest,
) -> std::result::Result<PostSummary, PostError> {
    use crate::database::posts as db_posts;

    validate_post(data)?;

    let view = ownership_of(state, post_id).await?;
    if !authz::can(user_id, Action::Update, view.as_ref()) {
        warn!("User {} denied update of post {}", user_id, post_id);
        return Err(PostError::NotAuthorized);
    }

    let updated = db_posts::update_post(
        &state.db,
        post_id,
        data.title.trim().to_string(),
        data.body.clone(),
    )
    .await
    .map_err(|e| {
        error!("Database error updating post: {}", e);
        PostError::DatabaseError
    })?;

    if !updated {
        // The guard passed, so the caller owned the post; it vanished in a
        // concurrent delete.
        return Err(PostError::PostNotFound);
    }

    db_posts::get_post_with_counts(&state.db, post_id)
        .await
        .map_err(|e| {
            error!("Database error reloading post: {}", e);
            PostError::DatabaseError
        })?
        .ok_or(PostError::PostNotFound)
}

async fn apply_delete(
    state: &AppState,
    user_id: i64,
    post_id: i64,
) -> std::result::Result<(), PostError> {
    let view = ownership_of(state, post_id).await?;
    if !authz::can(user_id, Action::Delete, view.as_ref()) {
        warn!("User {} denied deletion of post {}", user_id, post_id);
        return Err(PostError::NotAuthorized);
    }

    match cascade::delete_post(&state.db, post_id).await {
        Ok(()) => Ok(()),
        // Authorized, but the post vanished in a concurrent delete.
        Err(CascadeError::NotFound) => Err(PostError::PostNotFound),
        Err(e) => {
            error!("Post cascade failed: {}", e);
            Err(PostError::TransactionFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::users as db_users;
    use crate::database::{comments, posts as db_posts, reactions};
    use crate::test_support::test_state;

    fn request(title: &str, body: &str) -> PostRequest {
        PostRequest {
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    async fn seed_user(state: &AppState, email: &str) -> i64 {
        db_users::create_user(
            &state.db,
            db_users::NewUser {
                name: "user".to_string(),
                email: email.to_string(),
                password_hash: "$argon2id$fake".to_string(),
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn title_and_body_limits() {
        assert!(validate_post(&request("hello", "world")).is_ok());
        assert_eq!(
            validate_post(&request("", "world")).unwrap_err(),
            PostError::InvalidTitle
        );
        assert_eq!(
            validate_post(&request("   ", "world")).unwrap_err(),
            PostError::InvalidTitle
        );
        assert_eq!(
            validate_post(&request(&"t".repeat(201), "world")).unwrap_err(),
            PostError::InvalidTitle
        );
        assert_eq!(
            validate_post(&request("hello", &"b".repeat(10_001))).unwrap_err(),
            PostError::BodyTooLong
        );
    }

    #[tokio::test]
    async fn owner_updates_others_denied() {
        // alice creates P1; bob's update is denied; alice's succeeds.
        let state = test_state().await;
        let alice = seed_user(&state, "alice@example.com").await;
        let bob = seed_user(&state, "bob@example.com").await;

        let p1 = apply_create(&state, alice, &request("P1", "original")).await.unwrap();

        let denied = apply_update(&state, bob, p1.id, &request("P1", "hijacked"))
            .await
            .unwrap_err();
        assert_eq!(denied, PostError::NotAuthorized);
        // Unchanged after the denial.
        let unchanged = db_posts::get_post(&state.db, p1.id).await.unwrap().unwrap();
        assert_eq!(unchanged.body, "original");

        let updated = apply_update(&state, alice, p1.id, &request("P1", "edited"))
            .await
            .unwrap();
        assert_eq!(updated.post.body, "edited");
    }

    #[tokio::test]
    async fn missing_post_indistinguishable_from_wrong_owner() {
        let state = test_state().await;
        let alice = seed_user(&state, "alice@example.com").await;
        let bob = seed_user(&state, "bob@example.com").await;
        let p1 = apply_create(&state, alice, &request("P1", "")).await.unwrap();

        let on_missing = apply_update(&state, bob, 99_999, &request("t", ""))
            .await
            .unwrap_err();
        let on_foreign = apply_update(&state, bob, p1.id, &request("t", ""))
            .await
            .unwrap_err();

        assert_eq!(on_missing, PostError::NotAuthorized);
        assert_eq!(on_foreign, PostError::NotAuthorized);
        assert_eq!(on_missing.status(), on_foreign.status());
    }

    #[tokio::test]
    async fn delete_cascades_and_is_owner_only() {
        let state = test_state().await;
        let alice = seed_user(&state, "alice@example.com").await;
        let bob = seed_user(&state, "bob@example.com").await;

        let p1 = apply_create(&state, alice, &request("P1", "")).await.unwrap();
        comments::create_comment(
            &state.db,
            comments::NewComment {
                body: "hi".to_string(),
                owner_id: bob,
                post_id: p1.id,
            },
        )
        .await
        .unwrap();
        reactions::toggle_reaction(&state.db, bob, p1.id).await.unwrap();

        assert_eq!(
            apply_delete(&state, bob, p1.id).await.unwrap_err(),
            PostError::NotAuthorized
        );

        apply_delete(&state, alice, p1.id).await.unwrap();
        assert!(db_posts::get_post(&state.db, p1.id).await.unwrap().is_none());
        assert!(
            comments::list_post_comments(&state.db, p1.id, 10, 0)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
