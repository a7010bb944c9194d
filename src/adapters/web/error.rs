//! JSON error responses for the web API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::StockdashError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<StockdashError> for WebError {
    fn from(err: StockdashError) -> Self {
        let status = status_from_error(&err);
        let message = match err {
            // The backend's own message is what the dashboard shows.
            StockdashError::BackendStatus { message, .. } => message,
            StockdashError::InvalidParameter { name, reason } if name == "message" => reason,
            other => other.to_string(),
        };
        Self::new(status, message)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn status_from_error(err: &StockdashError) -> StatusCode {
    match err {
        StockdashError::InvalidTicker { .. }
        | StockdashError::InvalidPeriod { .. }
        | StockdashError::InvalidInterval { .. }
        | StockdashError::InvalidIndicator { .. }
        | StockdashError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
        StockdashError::NoData { .. } => StatusCode::NOT_FOUND,
        StockdashError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        StockdashError::BackendStatus { status, .. } => StatusCode::from_u16(*status)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::BAD_GATEWAY),
        StockdashError::Backend { .. } => StatusCode::BAD_GATEWAY,
        StockdashError::ConfigParse { .. }
        | StockdashError::ConfigMissing { .. }
        | StockdashError::ConfigInvalid { .. }
        | StockdashError::Database { .. }
        | StockdashError::DatabaseQuery { .. }
        | StockdashError::Csv { .. }
        | StockdashError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
