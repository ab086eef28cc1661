use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::Result as StoreResult;
use crate::license::LicenseError;

/// Error body shared by every endpoint: `{ error, errors?, details? }`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// API error that converts to a proper HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub errors: Vec<String>,
    pub details: Option<String>,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: Vec::new(),
            details: None,
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// A 400 listing every field that failed validation.
    #[must_use]
    pub fn invalid_fields(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            errors,
            ..Self::bad_request(message)
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    #[must_use]
    pub fn with_details(mut self, details: impl ToString) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                details = self.details.as_deref().unwrap_or(""),
                "{}",
                self.message
            );
        }

        let body = ErrorBody {
            error: self.message,
            errors: self.errors,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<LicenseError> for ApiError {
    fn from(e: LicenseError) -> Self {
        match e {
            LicenseError::DuplicateSerial | LicenseError::InvalidDate(_) => {
                ApiError::bad_request(e.to_string())
            }
            LicenseError::SerialExhausted => ApiError::internal(e.to_string()),
            LicenseError::Store(inner) => {
                ApiError::internal("Internal Server Error").with_details(inner)
            }
        }
    }
}

/// Extension trait for converting store results to API errors with a custom message.
pub trait StoreResultExt<T> {
    fn api_err(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn api_err(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::internal(message).with_details(e))
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}

/// `Json<T>` whose rejections become `400 {"error":"Invalid payload"}`.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!("Rejected request body: {rejection}");
                Err(ApiError::bad_request("Invalid payload"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::bad_request("Nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, serde_json::json!({ "error": "Nope" }));
    }

    #[tokio::test]
    async fn test_field_errors_are_listed() {
        let response = ApiError::invalid_fields(
            "Invalid event",
            vec!["date must be in YYYY-MM-DD format".to_string()],
        )
        .into_response();

        let body = body_json(response).await;
        assert_eq!(body["errors"][0], "date must be in YYYY-MM-DD format");
    }

    #[tokio::test]
    async fn test_license_errors_map_to_status() {
        let duplicate: ApiError = LicenseError::DuplicateSerial.into();
        assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
        assert_eq!(duplicate.message, "Serial number already exists");

        let exhausted: ApiError = LicenseError::SerialExhausted.into();
        assert_eq!(exhausted.status, StatusCode::INTERNAL_SERVER_ERROR);

        let store: ApiError = LicenseError::Store(Error::NotFound).into();
        assert_eq!(store.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.details.as_deref(), Some("not found"));
    }
}
