use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo::{Company, CompanyPatch, NewCompany};
use crate::{
    error::{AppError, AppResult},
    extract::ApiJson,
    state::AppState,
    validation::{require_email, require_non_blank},
};

pub fn company_routes() -> Router<AppState> {
    Router::new()
        .route("/companies", get(list_companies).post(create_company))
        .route(
            "/companies/:id",
            get(get_company).put(update_company).delete(delete_company),
        )
}

#[instrument(skip(state))]
pub async fn list_companies(State(state): State<AppState>) -> Json<Vec<Company>> {
    Json(state.companies.list().await)
}

#[instrument(skip(state))]
pub async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Company>> {
    state
        .companies
        .get(id)
        .await
        .map(Json)
        .ok_or(AppError::CompanyNotFound)
}

#[instrument(skip(state, body))]
pub async fn create_company(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewCompany>,
) -> AppResult<(StatusCode, Json<Company>)> {
    require_non_blank("name", &body.name)?;
    if let Some(email) = &body.email {
        require_email(email)?;
    }

    let company = state.companies.create(body).await;
    info!(company_id = %company.id, "company created");
    Ok((StatusCode::CREATED, Json(company)))
}

#[instrument(skip(state, body))]
pub async fn update_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<CompanyPatch>,
) -> AppResult<Json<Company>> {
    if let Some(name) = &body.name {
        require_non_blank("name", name)?;
    }
    if let Some(email) = &body.email {
        require_email(email)?;
    }

    state
        .companies
        .update(id, body)
        .await
        .map(Json)
        .ok_or(AppError::CompanyNotFound)
}

#[instrument(skip(state))]
pub async fn delete_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.companies.delete(id).await {
        info!(company_id = %id, "company deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::CompanyNotFound)
    }
}
