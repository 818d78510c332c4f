use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    /// Seconds since the state was built.
    uptime: f64,
    environment: String,
}

#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    #[serde(flatten)]
    base: HealthResponse,
    version: &'static str,
    database: &'static str,
    users: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApiInfo {
    message: &'static str,
    version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(health_detailed))
}

pub fn api_root() -> Router<AppState> {
    Router::new().route("/", get(api_info))
}

fn base(state: &AppState) -> HealthResponse {
    HealthResponse {
        status: "ok",
        timestamp: OffsetDateTime::now_utc(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.config.environment.clone(),
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(base(&state))
}

pub async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let (database, users) = match state.users.ping().await {
        Ok(()) => match state.users.count().await {
            Ok(n) => ("connected", Some(n)),
            Err(e) => {
                warn!(error = %e, "user count failed");
                ("connected", None)
            }
        },
        Err(e) => {
            warn!(error = %e, "database ping failed");
            ("unavailable", None)
        }
    };

    Json(DetailedHealthResponse {
        base: base(&state),
        version: env!("CARGO_PKG_VERSION"),
        database,
        users,
    })
}

pub async fn api_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "Welcome to Aide Moi Backend API",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}
