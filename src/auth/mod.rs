use crate::state::AppState;
use axum::Router;

pub mod claims;
mod dto;
pub mod duration;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
