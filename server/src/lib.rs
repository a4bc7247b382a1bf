pub mod auth;
pub mod database;
pub mod handlers;

use std::sync::Arc;

use tokio_rusqlite::Connection;

use shared::types::server_config::AppConfig;

use crate::auth::TokenAuthority;

/// Everything a request handler needs, cloned per connection.
///
/// - `db`: handle to the SQLite worker (cheap clone, one writer thread)
/// - `config`: immutable for the process lifetime — no hot reload, because
///   rotating the signing key mid-flight would invalidate every live token
/// - `tokens`: the signing/verifying authority, key injected at startup
#[derive(Clone)]
pub struct AppState {
    pub db: Connection,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenAuthority>,
}
