use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_ACCESS_EXPIRES_IN: &str = "24h";
pub const DEFAULT_REFRESH_EXPIRES_IN: &str = "7d";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// Duration string such as `24h`, see `auth::duration`.
    pub expires_in: String,
    pub refresh_expires_in: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs against the in-memory user store.
    pub database_url: Option<String>,
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a non-negative integer")),
                None => Ok(default),
            }
        };

        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: var("JWT_ISSUER", "aidemoi"),
            audience: var("JWT_AUDIENCE", "aidemoi-users"),
            expires_in: var("JWT_EXPIRES_IN", DEFAULT_ACCESS_EXPIRES_IN),
            refresh_expires_in: var("REFRESH_TOKEN_EXPIRES_IN", DEFAULT_REFRESH_EXPIRES_IN),
        };

        let rate_limit = RateLimitConfig {
            max_requests: number("RATE_LIMIT_MAX", 100)?.max(1),
            window_secs: number("RATE_LIMIT_WINDOW_SECS", 60)?.max(1),
        };

        let port = number("APP_PORT", 3000)?;
        let port = u16::try_from(port).context("APP_PORT out of range")?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            environment: var("APP_ENV", "development"),
            host: var("APP_HOST", "0.0.0.0"),
            port,
            jwt,
            rate_limit,
            cors_allowed_origins,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = load(&[("JWT_SECRET", "s3cret")]).expect("config");
        assert_eq!(cfg.jwt.secret, "s3cret");
        assert_eq!(cfg.jwt.expires_in, "24h");
        assert_eq!(cfg.jwt.refresh_expires_in, "7d");
        assert_eq!(cfg.jwt.issuer, "aidemoi");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.rate_limit.max_requests, 100);
        assert_eq!(cfg.rate_limit.window_secs, 60);
        assert!(cfg.database_url.is_none());
        assert!(!cfg.is_production());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn overrides_are_read() {
        let cfg = load(&[
            ("JWT_SECRET", "x"),
            ("JWT_EXPIRES_IN", "15m"),
            ("REFRESH_TOKEN_EXPIRES_IN", "30d"),
            ("APP_ENV", "production"),
            ("APP_PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/aidemoi"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ])
        .expect("config");
        assert_eq!(cfg.jwt.expires_in, "15m");
        assert_eq!(cfg.jwt.refresh_expires_in, "30d");
        assert!(cfg.is_production());
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/aidemoi"));
        assert_eq!(
            cfg.cors_allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(load(&[("JWT_SECRET", "x"), ("APP_PORT", "70000")]).is_err());
        assert!(load(&[("JWT_SECRET", "x"), ("APP_PORT", "abc")]).is_err());
    }
}
