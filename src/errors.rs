use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Authorization failures surfaced at the HTTP boundary.
///
/// The evaluator itself returns booleans only; these errors exist for the
/// guard and the extractors. Denial is terminal and side-effect free.
#[derive(thiserror::Error, Debug)]
pub enum AuthzError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("authorization misconfiguration: {0}")]
    Misconfiguration(String),
}

impl AuthzError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn misconfiguration(message: impl Into<String>) -> Self {
        Self::Misconfiguration(message.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthzError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthzError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthzError::Misconfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error = match &self {
            AuthzError::Unauthorized(_) => "unauthorized",
            AuthzError::Forbidden(_) => "forbidden",
            AuthzError::Misconfiguration(_) => "misconfiguration",
        };

        let payload = ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
        };

        (status, Json(payload)).into_response()
    }
}
