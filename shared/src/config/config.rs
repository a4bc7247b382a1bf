use std::fs;
use tracing::{debug, error, info};

use crate::types::server_config::{AppConfig, ConfigError};

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Loading configuration from: {}", path);

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path);

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(&contents)?;

    info!("Configuration loaded successfully");

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.bind.is_empty() {
        return Err(ConfigError::InvalidConfig("bind cannot be empty".into()));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "database path cannot be empty".into(),
        ));
    }

    if config.auth.token_ttl_minutes == 0 {
        return Err(ConfigError::InvalidConfig(
            "token_ttl_minutes must be greater than 0".into(),
        ));
    }

    if config.server.max_connections == 0 {
        return Err(ConfigError::InvalidConfig(
            "max_connections must be greater than 0".into(),
        ));
    }

    // The signing secret must be resolvable (env var or config field) and
    // long enough.  Validated here so a bad config is rejected before the
    // server binds, rather than failing at the first login.
    match config.auth.resolved_jwt_secret() {
        None => {
            return Err(ConfigError::InvalidConfig(
                "jwt_secret must be set via the JWT_SECRET env var or auth.jwt_secret config field"
                    .into(),
            ));
        }
        Some(secret) if secret.len() < 32 => {
            return Err(ConfigError::InvalidConfig(
                "jwt_secret must be at least 32 characters long".into(),
            ));
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> AppConfig {
        toml::from_str(toml_str).expect("test config must parse")
    }

    fn base_config() -> AppConfig {
        parse(
            r#"
            [server]
            bind = "127.0.0.1"
            port = 8080

            [database]
            path = ":memory:"

            [auth]
            token_ttl_minutes = 1440
            jwt_secret = "0123456789abcdef0123456789abcdef"
            "#,
        )
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn defaults_applied() {
        let cfg = parse(
            r#"
            [server]
            bind = "0.0.0.0"

            [database]
            path = "social.db"

            [auth]
            jwt_secret = "0123456789abcdef0123456789abcdef"
            "#,
        );
        assert_eq!(cfg.server.port, 8080);
        // 24 hours
        assert_eq!(cfg.auth.token_ttl_minutes, 1440);
        assert_eq!(cfg.auth.token_ttl_secs(), 86_400);
    }

    #[test]
    fn short_jwt_secret_rejected() {
        // The env var outranks the config field, so this check only holds in
        // an environment without JWT_SECRET set.
        if std::env::var("JWT_SECRET").is_ok() {
            return;
        }

        let mut cfg = base_config();
        cfg.auth.jwt_secret = Some("too-short".to_string());
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_ttl_rejected() {
        let mut cfg = base_config();
        cfg.auth.token_ttl_minutes = 0;
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_database_path_rejected() {
        let mut cfg = base_config();
        cfg.database.path = String::new();
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::InvalidConfig(_))
        ));
    }
}
