pub mod json_error;
pub mod jwt;
pub mod server_config;

pub use self::json_error::ErrorResponse;
pub use self::jwt::JwtClaims;
pub use self::server_config::{AppConfig, AuthConfig, ConfigError};
