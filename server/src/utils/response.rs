use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn success<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::OK, Json(data)).into_response()
}

pub fn created(message: impl Into<String>, id: impl Into<String>) -> Response {
    let body = MessageResponse {
        message: message.into(),
        id: Some(id.into()),
    };
    (StatusCode::CREATED, Json(body)).into_response()
}

pub fn message(message: impl Into<String>) -> Response {
    let body = MessageResponse {
        message: message.into(),
        id: None,
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error(message: impl Into<String>, status: StatusCode) -> Response {
    let body = ErrorResponse {
        error: message.into(),
    };
    (status, Json(body)).into_response()
}
