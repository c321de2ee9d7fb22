//! Error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fleet_core::ErrorBody;

/// A failed request, rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A setting the route needs is missing.
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// Upstream or storage failure. Details are logged, not returned.
    #[error("Internal server error")]
    Internal(#[from] color_eyre::eyre::Report),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(report) => tracing::error!(error = ?report, "request failed"),
            Self::Config(missing) => tracing::error!(missing = %missing, "route not configured"),
            other => tracing::debug!(error = %other, "request rejected"),
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// The configured dependency of a route, or a configuration error naming
/// the settings it needs.
pub(crate) fn configured<'a, T>(dependency: &'a Option<T>, settings: &str) -> Result<&'a T, ApiError> {
    dependency
        .as_ref()
        .ok_or_else(|| ApiError::Config(format!("Missing {settings}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Config("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err = ApiError::from(color_eyre::eyre::eyre!("graph returned 503: secret body"));
        assert_eq!(err.to_string(), "Internal server error");
    }
}
