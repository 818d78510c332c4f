use std::{sync::Arc, time::Instant};

use crate::{
    companies::repo::{CompanyStore, MemoryCompanyStore},
    config::AppConfig,
    db,
    users::{
        memory::MemoryUserStore,
        repo::{PgUserStore, UserStore},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub companies: Arc<dyn CompanyStore>,
    pub started_at: Instant,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let users: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url).await?;
                if let Err(e) = db::migrate(&pool).await {
                    tracing::warn!(error = %format_args!("{e:#}"), "migration failed; continuing");
                }
                tracing::info!("database connection established");
                Arc::new(PgUserStore::new(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; users are kept in memory");
                Arc::new(MemoryUserStore::new())
            }
        };

        Ok(Self::from_parts(
            Arc::new(config),
            users,
            Arc::new(MemoryCompanyStore::new()),
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        companies: Arc<dyn CompanyStore>,
    ) -> Self {
        Self {
            config,
            users,
            companies,
            started_at: Instant::now(),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_users(Arc::new(MemoryUserStore::new()))
    }

    #[cfg(test)]
    pub fn fake_with_users(users: Arc<dyn UserStore>) -> Self {
        use crate::config::{JwtConfig, RateLimitConfig};

        let config = Arc::new(AppConfig {
            database_url: None,
            environment: "test".into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                expires_in: "1h".into(),
                refresh_expires_in: "7d".into(),
            },
            rate_limit: RateLimitConfig {
                max_requests: 1_000,
                window_secs: 60,
            },
            cors_allowed_origins: Vec::new(),
        });

        Self::from_parts(config, users, Arc::new(MemoryCompanyStore::new()))
    }
}
