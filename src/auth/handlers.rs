use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MessageResponse, ProfileResponse, RefreshRequest,
            RefreshResponse,
        },
        extractors::AuthUser,
        services::SessionService,
    },
    error::AppResult,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/profile", get(profile))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(sessions, payload))]
pub async fn login(
    State(sessions): State<SessionService>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let outcome = sessions.login(&payload.email, &payload.password).await?;
    Ok(Json(LoginResponse {
        message: "Login successful",
        tokens: outcome.tokens.into(),
        user: outcome.user.into(),
    }))
}

#[instrument(skip(sessions, payload))]
pub async fn refresh(
    State(sessions): State<SessionService>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let access = sessions.refresh(&payload.refresh_token)?;
    Ok(Json(RefreshResponse {
        access_token: access.token,
        expires_in: access.expires_in,
    }))
}

#[instrument(skip(sessions, principal))]
pub async fn profile(
    State(sessions): State<SessionService>,
    AuthUser(principal): AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = sessions.profile(&principal).await?;
    Ok(Json(ProfileResponse { user: user.into() }))
}

#[instrument(skip(sessions, principal))]
pub async fn logout(
    State(sessions): State<SessionService>,
    AuthUser(principal): AuthUser,
) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: sessions.logout(&principal),
    })
}
