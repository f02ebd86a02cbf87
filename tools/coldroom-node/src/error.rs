use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coldroom_common::MarketError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`MarketError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub MarketError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MarketError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MarketError::InvalidTransition { .. } => StatusCode::CONFLICT,
            MarketError::NotFound { .. } => StatusCode::NOT_FOUND,
            MarketError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            MarketError::Unauthorized => StatusCode::UNAUTHORIZED,
            MarketError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        } else {
            tracing::debug!(%status, "{}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
