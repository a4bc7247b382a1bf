use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Method, Request, Response, StatusCode};
use tracing::warn;

use crate::AppState;
use crate::auth::Identity;
use crate::database::utils::get_timestamp;
use crate::handlers::http::utils::headers::get_bearer_token;
use crate::handlers::http::utils::json_response;
use crate::handlers::http::{admin, auth, health, profile, social};

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
// Two security tiers:
//
//   RouteHandler — no auth.  Receives (req, state).
//                  Use for: /login, /register, public reads, /health.
//
//   AuthHandler  — bearer token verified by the router: signature + expiry,
//                  zero DB reads (stateless verification).
//                  Receives (req, state, identity).
//                  Use for: anything acting as a specific user.

type RouteHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

type AuthHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
            Identity, // verified by the router; handlers never re-verify
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

enum RouteKind {
    /// No authentication check.
    Open(RouteHandler),

    /// Bearer token required; the router verifies it and hands the handler
    /// a typed [`Identity`].
    Auth(AuthHandler),
}

struct Route {
    method: Method,
    path: String,
    kind: RouteKind,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    // ── Open (no auth) ────────────────────────────────────────────────────────

    /// GET with no authentication — public reads and health checks.
    pub fn get<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::GET,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    /// POST with no authentication — use only for login / register.
    pub fn post<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::POST,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    // ── Bearer auth (token signature + expiry, zero DB reads) ─────────────────

    /// GET guarded by bearer auth.
    pub fn get_auth<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.push_auth(Method::GET, path, handler)
    }

    /// POST guarded by bearer auth.
    pub fn post_auth<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.push_auth(Method::POST, path, handler)
    }

    /// PATCH guarded by bearer auth.
    pub fn patch_auth<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.push_auth(Method::PATCH, path, handler)
    }

    /// DELETE guarded by bearer auth.
    pub fn delete_auth<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.push_auth(Method::DELETE, path, handler)
    }

    fn push_auth<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Auth(Box::new(move |req, state, identity| {
                Box::pin(handler(req, state, identity))
            })),
        });
        self
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
        state: AppState,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        for route in &self.routes {
            if route.method != method || !Self::path_matches(&route.path, &path) {
                continue;
            }

            return match &route.kind {
                RouteKind::Open(h) => h(req, state).await,

                RouteKind::Auth(h) => {
                    let Some(token) = get_bearer_token(&req) else {
                        warn!("Auth rejected {} {}: no bearer token", method, path);
                        return unauthorized();
                    };

                    // The specific failure stays in the logs; the response
                    // is one flat denial whatever the cause.
                    match state.tokens.verify(&token, get_timestamp()) {
                        Ok(identity) => h(req, state, identity).await,
                        Err(e) => {
                            warn!("Auth rejected {} {}: {}", method, path, e);
                            unauthorized()
                        }
                    }
                }
            };
        }

        json_response::deliver_error_json("NOT_FOUND", "Endpoint not found", StatusCode::NOT_FOUND)
            .context("Failed to deliver 404 response")
    }

    // ── Path matching ─────────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string from incoming request path before comparing.
        let clean = request_path.split('?').next().unwrap_or(request_path);

        // Exact match.
        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        // e.g.  "/api/posts/:id"  matches  "/api/posts/42"
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| r.starts_with(':') || r == p)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Generic denial: never distinguishes missing, malformed, expired, or
/// forged tokens.
fn unauthorized() -> Result<Response<BoxBody<Bytes, Infallible>>> {
    json_response::deliver_error_json(
        "UNAUTHORIZED",
        "Authentication required",
        StatusCode::UNAUTHORIZED,
    )
    .context("Failed to deliver 401 response")
}

// ---------------------------------------------------------------------------
// Route table
// ---------------------------------------------------------------------------

/// Every endpoint the server exposes, in match order.
pub fn build_router() -> Router {
    Router::new()
        // Liveness
        .get("/api/health", health::handle_health)
        // Auth
        .post("/api/auth/register", auth::register::handle_register)
        .post("/api/auth/login", auth::login::handle_login)
        // Public reads
        .get("/api/posts", social::posts::handle_list_posts)
        .get("/api/posts/:id", social::posts::handle_get_post)
        .get("/api/posts/:id/comments", social::comments::handle_list_comments)
        // Admin-gated listing (shared secret, not a token claim)
        .get("/api/users", admin::users::handle_list_users)
        // Profile
        .get_auth("/api/users/me", profile::handle_get_me)
        .patch_auth("/api/users/me", profile::handle_update_me)
        .delete_auth("/api/users/me", profile::handle_delete_me)
        // Posts
        .post_auth("/api/posts", social::posts::handle_create_post)
        .patch_auth("/api/posts/:id", social::posts::handle_update_post)
        .delete_auth("/api/posts/:id", social::posts::handle_delete_post)
        // Comments + reactions
        .post_auth("/api/posts/:id/comments", social::comments::handle_create_comment)
        .post_auth("/api/posts/:id/react", social::reactions::handle_toggle_reaction)
        .delete_auth("/api/comments/:id", social::comments::handle_delete_comment)
}
