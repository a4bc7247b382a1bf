use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpListener;

// Error tracing
use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use server::AppState;
use server::auth::TokenAuthority;
use server::database;
use server::handlers::http::build_router;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

    // load_config validates everything fatal up front: a missing or short
    // signing key refuses to start rather than substituting a default.
    let config = shared::config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    let jwt_secret = config
        .auth
        .resolved_jwt_secret()
        .context("JWT secret missing after validation")?;
    let tokens = TokenAuthority::new(
        jwt_secret.as_bytes(),
        Duration::from_secs(config.auth.token_ttl_secs()),
    )
    .context("Failed to construct token authority")?;

    let db = database::open_database(&config.database.path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;

    let addr: SocketAddr = config
        .server
        .addr()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.addr()))?;

    let state = AppState {
        db,
        config: Arc::new(config),
        tokens: Arc::new(tokens),
    };

    let router = Arc::new(build_router());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let state = state.clone();
        let router = router.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                let router = router.clone();
                async move {
                    let method = req.method().clone();
                    let path = req.uri().path().to_string();

                    match router.route(req, state).await {
                        Ok(response) => Ok::<_, Infallible>(response),
                        Err(e) => {
                            error!("Handler error on {} {}: {:#}", method, path, e);
                            Ok(internal_error_response())
                        }
                    }
                }
            });

            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, service)
                .await
            {
                error!("Error serving connection from {}: {:?}", peer, err);
            }
        });
    }
}

/// Last-resort 500 when a handler itself failed to build a response.
fn internal_error_response()
-> Response<http_body_util::combinators::BoxBody<Bytes, Infallible>> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header("content-type", "application/json")
        .body(
            Full::new(Bytes::from_static(
                br#"{"status":"error","code":"INTERNAL_ERROR","message":"An internal error occurred"}"#,
            ))
            .boxed(),
        )
        .expect("static response must build")
}
