use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("invalid vehicle type: {0}")]
    InvalidVehicleType(String),

    #[error("booking already taken")]
    BookingAlreadyTaken,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid or expired pickup code")]
    InvalidCode,

    #[error("invalid rating: {0}")]
    InvalidRating(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BookingNotFound(_) | AppError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidVehicleType(_)
            | AppError::InvalidState(_)
            | AppError::InvalidCode
            | AppError::InvalidRating(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::BookingAlreadyTaken => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
