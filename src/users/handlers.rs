use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{CreateUserRequest, UpdateUserRequest},
    repo::StoreError,
    repo_types::{NewUser, UserChanges, UserView},
};
use crate::{
    auth::password::hash_password,
    error::{AppError, AppResult},
    extract::ApiJson,
    state::AppState,
    validation::{normalize_email, require_email, require_non_blank, require_password},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn store_failure(message: &'static str) -> impl FnOnce(StoreError) -> AppError {
    move |e| match e {
        StoreError::EmailTaken => AppError::EmailTaken,
        StoreError::Backend(cause) => AppError::internal(message, cause),
    }
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserView>>> {
    let users = state
        .users
        .list()
        .await
        .map_err(store_failure("Failed to list users"))?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserView>> {
    state
        .users
        .find_by_id(id)
        .await
        .map_err(store_failure("Failed to get user"))?
        .map(|u| Json(u.into()))
        .ok_or(AppError::UserNotFound)
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    payload.email = normalize_email(&payload.email);
    require_non_blank("username", &payload.username)?;
    require_email(&payload.email)?;
    require_password(&payload.password)?;

    // Ensure email is not taken
    let existing = state
        .users
        .find_by_email(&payload.email)
        .await
        .map_err(store_failure("Failed to create user"))?;
    if existing.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::EmailTaken);
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| AppError::internal("Failed to create user", e))?;

    let user = state
        .users
        .create(NewUser {
            username: payload.username.trim().to_string(),
            email: payload.email,
            password_hash,
        })
        .await
        .map_err(store_failure("Failed to create user"))?;

    info!(user_id = user.id, email = %user.email, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(mut payload): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<UserView>> {
    payload.email = normalize_email(&payload.email);
    require_non_blank("username", &payload.username)?;
    require_email(&payload.email)?;
    if let Some(password) = &payload.password {
        require_password(password)?;
    }

    if state
        .users
        .find_by_id(id)
        .await
        .map_err(store_failure("Failed to update user"))?
        .is_none()
    {
        return Err(AppError::UserNotFound);
    }

    // Email may only be shared with the user being updated
    let owner = state
        .users
        .find_by_email(&payload.email)
        .await
        .map_err(store_failure("Failed to update user"))?;
    if owner.is_some_and(|u| u.id != id) {
        warn!(email = %payload.email, user_id = id, "email belongs to another user");
        return Err(AppError::EmailTaken);
    }

    let password_hash = payload
        .password
        .as_deref()
        .map(hash_password)
        .transpose()
        .map_err(|e| AppError::internal("Failed to update user", e))?;

    let user = state
        .users
        .update(
            id,
            UserChanges {
                username: payload.username.trim().to_string(),
                email: payload.email,
                password_hash,
            },
        )
        .await
        .map_err(store_failure("Failed to update user"))?
        .ok_or(AppError::UserNotFound)?;

    info!(user_id = user.id, "user updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    let deleted = state
        .users
        .delete(id)
        .await
        .map_err(store_failure("Failed to delete user"))?;
    if !deleted {
        return Err(AppError::UserNotFound);
    }
    info!(user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
