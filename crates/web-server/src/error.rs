use analytics::AnalyticsError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reporting::ReportingError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Reporting(#[from] ReportingError),
    #[error("{0}")]
    BadRequest(#[from] AnalyticsError),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
}

/// Converts our custom `AppError` into an HTTP response.
///
/// Every error body is `{"error": "<message>"}`. Fetch failures keep the
/// underlying message and never carry partial data.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Reporting(ReportingError::Database(db_err)) => {
                tracing::error!(error = %db_err, "Data fetch failed.");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Reporting(ReportingError::Analytics(err)) | AppError::BadRequest(err) => {
                tracing::warn!(error = %err, "Rejected request.");
                match err {
                    AnalyticsError::InvalidStartMonth(_) | AnalyticsError::Overflow(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_REQUEST,
                }
            }
            AppError::InvalidInput(message) => {
                tracing::warn!(%message, "Rejected request.");
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
