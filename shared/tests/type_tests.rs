/// Integration-level tests for the `shared` crate.
///
/// Each section tests one module; unit tests that are tightly coupled to
/// private helpers live inside the modules themselves (see `#[cfg(test)]`
/// blocks in `config.rs`).
// ---------------------------------------------------------------------------
// JWT claims
// ---------------------------------------------------------------------------
#[cfg(test)]
mod jwt_tests {
    use shared::types::*;

    fn sample_claims() -> JwtClaims {
        JwtClaims {
            sub: "42".to_string(),
            user_id: 42,
            email: "alice@example.com".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_086_400,
        }
    }

    #[test]
    fn claims_serialize_and_deserialize_roundtrip() {
        let c = sample_claims();
        let json = serde_json::to_string(&c).unwrap();
        let back: JwtClaims = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sub, c.sub);
        assert_eq!(back.user_id, c.user_id);
        assert_eq!(back.email, c.email);
        assert_eq!(back.exp, c.exp);
        assert_eq!(back.iat, c.iat);
    }

    #[test]
    fn claims_json_contains_expected_keys() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        for key in &["sub", "user_id", "email", "exp", "iat"] {
            assert!(json.get(key).is_some(), "missing key: {}", key);
        }
    }

    #[test]
    fn subject_is_a_string_field() {
        // `sub` must round-trip as a string (not a number) per RFC 7519.
        let json = serde_json::to_value(sample_claims()).unwrap();
        assert!(json["sub"].is_string());
    }

    #[test]
    fn issue_precedes_expiry_in_sample() {
        let c = sample_claims();
        assert!(c.iat < c.exp);
    }

    #[test]
    fn clone_produces_independent_copy() {
        let c1 = sample_claims();
        let mut c2 = c1.clone();
        c2.user_id = 99;
        assert_eq!(c1.user_id, 42);
        assert_eq!(c2.user_id, 99);
    }
}

// ---------------------------------------------------------------------------
// Server config
// ---------------------------------------------------------------------------

#[cfg(test)]
mod server_config_tests {
    use shared::types::server_config::*;

    fn test_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                bind: "127.0.0.1".into(),
                port: 8080,
                max_connections: 500,
            },
            database: DatabaseConfig {
                path: "social.db".into(),
            },
            auth: AuthConfig {
                token_ttl_minutes: 1440,
                jwt_secret: Some("0123456789abcdef0123456789abcdef".into()),
                admin_list_secret: None,
            },
        }
    }

    #[test]
    fn addr_joins_bind_and_port() {
        assert_eq!(test_config().server.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn ttl_converts_to_seconds() {
        assert_eq!(test_config().auth.token_ttl_secs(), 86_400);
    }

    #[test]
    fn config_field_supplies_jwt_secret() {
        // With no env override the config field is the source.
        let cfg = test_config();
        if std::env::var("JWT_SECRET").is_err() {
            assert_eq!(
                cfg.auth.resolved_jwt_secret().as_deref(),
                Some("0123456789abcdef0123456789abcdef")
            );
        }
    }

    #[test]
    fn absent_admin_secret_resolves_to_none() {
        let cfg = test_config();
        if std::env::var("ADMIN_LIST_SECRET").is_err() {
            assert!(cfg.auth.resolved_admin_list_secret().is_none());
        }
    }

    #[test]
    fn minimal_toml_parses_with_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0"

            [database]
            path = ":memory:"

            [auth]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.auth.token_ttl_minutes, 1440);
        assert!(cfg.auth.jwt_secret.is_none());
    }
}

// ---------------------------------------------------------------------------
// JSON error type
// ---------------------------------------------------------------------------

#[cfg(test)]
mod json_error_tests {
    use shared::types::*;

    #[test]
    fn error_response_new_sets_status_to_error() {
        let e = ErrorResponse::new("NOT_FOUND", "resource missing");
        assert_eq!(e.status, "error");
        assert_eq!(e.code, "NOT_FOUND");
        assert_eq!(e.message, "resource missing");
    }

    #[test]
    fn error_response_serializes_correctly() {
        let e = ErrorResponse::new("FORBIDDEN", "access denied");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "FORBIDDEN");
    }
}
