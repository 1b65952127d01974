//! Maps `anyhow::Error` to a JSON error body + status code for every route.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<sqlx::Error>().is_some_and(|e| matches!(e, sqlx::Error::RowNotFound)) {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = json!({
            "error": self.0.to_string(),
            "code": status.as_u16(),
        });

        tracing::error!(error = %self.0, status = %status, "request failed");
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
