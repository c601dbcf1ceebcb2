use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::ArborError;
use crate::wire::ExceptionReturn;

/// An [`ArborError`] rendered as an exception body.
#[derive(Debug)]
pub struct ApiError(pub ArborError);

impl From<ArborError> for ApiError {
    fn from(err: ArborError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ArborError::NotFound(_) => StatusCode::NOT_FOUND,
            ArborError::IllegalState(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::BAD_REQUEST {
            tracing::debug!("Rejected request: {}", self.0);
        }
        (status, Json(ExceptionReturn::from(&self.0))).into_response()
    }
}
