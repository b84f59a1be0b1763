use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// The model text could not be parsed even after every repair strategy ran
    #[error("Model returned output that could not be parsed as JSON, even after repair")]
    UnparsableOutput { raw: String, repaired: String },

    /// The model text parsed, but not into the structure the caller needs
    #[error("Model returned an invalid shape: {0}")]
    InvalidShape(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable identifier for the error kind, surfaced to API clients
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UnparsableOutput { .. } => "unparsable_output",
            AppError::InvalidShape(_) => "invalid_shape",
            AppError::HttpClient(_) | AppError::ExternalApi(_) => "external_api",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_)
            | AppError::UnparsableOutput { .. }
            | AppError::InvalidShape(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparsable_and_invalid_shape_are_distinct_kinds() {
        let unparsable = AppError::UnparsableOutput {
            raw: "nope".to_string(),
            repaired: "nope".to_string(),
        };
        let shape = AppError::InvalidShape("not an array".to_string());
        assert_eq!(unparsable.kind(), "unparsable_output");
        assert_eq!(shape.kind(), "invalid_shape");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::InvalidInput("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("x".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InvalidShape("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
