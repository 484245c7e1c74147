use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::NotifyError;
use serde::Serialize;

/// Standardized JSON response envelope. Every endpoint, success or failure,
/// returns this shape.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

/// Error details in the response envelope.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ApiError {
    /// HTTP status code, duplicated in the body for clients that only
    /// look at the payload.
    pub code: u16,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: status.as_u16(),
                message: message.into(),
            }),
        }
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Unauthorized(String),
    NotFound(String),
    RateLimited,
    /// Channel provider failure. The provider's message is stored on the
    /// record and logged, never echoed to API clients.
    Provider,
    Internal(String),
}

impl AppError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate limit exceeded".to_string(),
            ),
            AppError::Provider => (
                StatusCode::BAD_GATEWAY,
                "notification delivery failed".to_string(),
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ApiResponse::error(status, message))).into_response()
    }
}

impl From<NotifyError> for AppError {
    fn from(err: NotifyError) -> Self {
        // Dispatch on the error kind, never on message text.
        match err {
            NotifyError::Validation(msg) => AppError::Validation(msg),
            NotifyError::NotFound { .. } => AppError::NotFound(err.to_string()),
            NotifyError::Unauthorized(msg) => AppError::Unauthorized(msg),
            NotifyError::Provider { .. } => {
                tracing::error!("Provider failure: {err}");
                AppError::Provider
            }
            NotifyError::Store(_)
            | NotifyError::Queue(_)
            | NotifyError::Render(_)
            | NotifyError::RateLimit(_) => AppError::Internal(err.to_string()),
        }
    }
}
