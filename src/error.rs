use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Errors surfaced to HTTP clients.
///
/// Every variant maps to one fixed status code and renders the
/// `{"error": {"message", "statusCode"}}` envelope. Internal faults keep
/// their cause for logging only; the body carries the fixed message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid refresh token")]
    InvalidToken,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("User not found")]
    UserNotFound,

    #[error("Company not found")]
    CompanyNotFound,

    #[error("Route not found")]
    RouteNotFound(String),

    #[error("User with this email already exists")]
    EmailTaken,

    #[error("{0}")]
    Validation(String),

    #[error("Rate limit exceeded, retry in 1 minute")]
    RateLimited { retry_after: u64 },

    #[error("{message}")]
    Internal {
        message: &'static str,
        cause: anyhow::Error,
    },
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    message: String,
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl AppError {
    pub fn internal(message: &'static str, cause: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message,
            cause: cause.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::UserNotFound | AppError::CompanyNotFound | AppError::RouteNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::EmailTaken | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Internal { message, cause } = &self {
            error!(error = %format_args!("{cause:#}"), "{message}");
        }

        let path = match &self {
            AppError::RouteNotFound(path) => Some(path.clone()),
            _ => None,
        };
        let retry_after = match &self {
            AppError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                message: self.to_string(),
                status_code: status.as_u16(),
                path,
                retry_after,
            },
        };

        let mut res = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            res.headers_mut().insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        res
    }
}
