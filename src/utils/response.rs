use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Envelope for successful responses. `data` stays null for message-only
/// bodies so clients can always read the same three keys.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    fn with_data(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
        }
    }
}

impl ApiResponse<()> {
    fn message_only(message: String) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message),
        }
    }
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

impl ApiErrorResponse {
    fn new(code: &str, message: String, details: Option<Value>) -> Self {
        Self {
            success: false,
            error: ApiErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        }
    }
}

pub fn success<T>(data: T, message: impl Into<String>) -> impl IntoResponse
where
    T: Serialize,
{
    (
        StatusCode::OK,
        Json(ApiResponse::with_data(data, message.into())),
    )
}

pub fn created<T>(data: T, message: impl Into<String>) -> impl IntoResponse
where
    T: Serialize,
{
    (
        StatusCode::CREATED,
        Json(ApiResponse::with_data(data, message.into())),
    )
}

pub fn empty_success(message: impl Into<String>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse::message_only(message.into())),
    )
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    (
        status,
        Json(ApiErrorResponse::new(code, message.into(), details)),
    )
        .into_response()
}
