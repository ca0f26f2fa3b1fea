//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use energyhub_domain::error::EnergyHubError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`EnergyHubError`] to an HTTP response with appropriate status code.
pub struct ApiError(EnergyHubError);

impl From<EnergyHubError> for ApiError {
    fn from(err: EnergyHubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            EnergyHubError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            EnergyHubError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            EnergyHubError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
