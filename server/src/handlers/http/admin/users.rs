use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::{error, info, warn};

use crate::AppState;
use crate::auth::authz;
use crate::handlers::http::utils::{
    deliver_error_json, deliver_serialized_json, parse_pagination, query_param,
};

/// GET /api/users — administrative listing of registered users.
///
/// Gated by an out-of-band shared secret (`admin_secret` query parameter)
/// rather than a token claim — a placeholder policy, kept behind the
/// `authz` interface so a real role system can replace it without touching
/// this handler.  Denial is a flat 403 with no detail.
pub async fn handle_list_users(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Serving user list");

    let presented = query_param(&req, "admin_secret");
    let configured = state.config.auth.resolved_admin_list_secret();

    if !authz::admin_listing_allowed(presented.as_deref(), configured.as_deref()) {
        warn!("Unauthorised user listing attempt");
        return deliver_error_json("FORBIDDEN", "Forbidden", StatusCode::FORBIDDEN);
    }

    use crate::database::users as db_users;

    let pagination = parse_pagination(&req);

    let result = async {
        let total = db_users::count_users(&state.db).await?;
        let users =
            db_users::list_users(&state.db, pagination.limit(), pagination.offset()).await?;
        Ok::<_, tokio_rusqlite::Error>((total, users))
    }
    .await;

    match result {
        Ok((total, users)) => {
            let users_json: Vec<serde_json::Value> = users
                .iter()
                .map(|u| {
                    json!({
                        "id":         u.id,
                        "name":       u.name,
                        "email":      u.email,
                        "created_at": u.created_at,
                        "updated_at": u.updated_at,
                    })
                })
                .collect();

            deliver_serialized_json(
                &json!({
                    "status":    "success",
                    "data":      users_json,
                    "total":     total,
                    "page":      pagination.page,
                    "page_size": pagination.page_size,
                }),
                StatusCode::OK,
            )
        }
        Err(e) => {
            error!("Failed to query user list: {}", e);
            deliver_error_json(
                "DATABASE_ERROR",
                "Database error occurred",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}
