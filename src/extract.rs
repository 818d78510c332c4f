use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use crate::error::AppError;

/// `Json` body extractor whose rejections render the API error envelope.
///
/// Missing fields, wrong types, bad syntax and a missing content type all
/// become a 400 `Validation` error instead of axum's plain-text reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection, "rejected request body");
                Err(AppError::Validation(rejection.body_text()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, StatusCode},
        response::IntoResponse,
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RefreshBody {
        refresh_token: String,
    }

    fn request(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    async fn reject(req: Request) -> (StatusCode, serde_json::Value) {
        let err = ApiJson::<RefreshBody>::from_request(req, &())
            .await
            .expect_err("body should be rejected");
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn accepts_a_well_formed_body() {
        let ApiJson(body) = ApiJson::<RefreshBody>::from_request(
            request(Some("application/json"), r#"{"refreshToken":"abc"}"#),
            &(),
        )
        .await
        .expect("valid body");
        assert_eq!(body.refresh_token, "abc");
    }

    #[tokio::test]
    async fn missing_field_is_a_400_envelope() {
        let (status, body) = reject(request(Some("application/json"), "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["statusCode"], 400);
        assert!(body["error"]["message"]
            .as_str()
            .expect("message")
            .contains("refreshToken"));
    }

    #[tokio::test]
    async fn wrong_type_and_bad_syntax_are_400() {
        let (status, _) = reject(request(Some("application/json"), r#"{"refreshToken":7}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = reject(request(Some("application/json"), "{nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_content_type_is_400() {
        let (status, body) = reject(request(None, r#"{"refreshToken":"abc"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["statusCode"], 400);
    }
}
