use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, StatusCode};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ai::AiError;
use crate::object_store::ObjectStoreError;
use crate::storage::StoreError;

// ============================================================================
// Error body
// ============================================================================

/// Every failure response is `{"error": "<message>"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing input
    Validation(String),
    NotFound(String),
    PayloadTooLarge(String),
    /// A third-party service failed
    Upstream(String),
    /// Local I/O or store failure
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ApiError::Upstream(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(m)
            | ApiError::NotFound(m)
            | ApiError::PayloadTooLarge(m)
            | ApiError::Upstream(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        match &self {
            ApiError::Upstream(msg) => {
                tracing::warn!(status = status.as_u16(), error = %msg, "Upstream call failed")
            }
            ApiError::Internal(msg) => {
                tracing::error!(status = status.as_u16(), error = %msg, "Request failed")
            }
            _ => {}
        }

        let body = ErrorBody {
            error: self.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        ApiError::upstream(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Auth(_) | StoreError::Firestore(_) => ApiError::upstream(e.to_string()),
            _ => ApiError::internal(e.to_string()),
        }
    }
}

impl From<ObjectStoreError> for ApiError {
    fn from(e: ObjectStoreError) -> Self {
        match e {
            ObjectStoreError::NotFound(_) => ApiError::not_found("file not found"),
            ObjectStoreError::InvalidKey(_) => ApiError::bad_request(e.to_string()),
            ObjectStoreError::Io(_) => ApiError::internal(e.to_string()),
            ObjectStoreError::Auth(_) | ObjectStoreError::Backend(_) => {
                ApiError::upstream(e.to_string())
            }
        }
    }
}

// ============================================================================
// Custom extractors (reject with ApiError)
// ============================================================================

/// Drop-in replacement for `axum::Json` that rejects with an `{"error"}` body.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    return Err(ApiError::payload_too_large("Request body too large"));
                }
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid request body: {}", err.body_text())
                    }
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing Content-Type: application/json header".into()
                    }
                    _ => "Failed to read request body".into(),
                };
                Err(ApiError::bad_request(message))
            }
        }
    }
}

/// Routes that take either an uploaded file or a JSON body.
/// The variant follows the request's `Content-Type`.
pub enum FileOrJson<T> {
    Multipart(Multipart),
    Json(T),
    /// Neither multipart nor JSON
    Empty,
}

#[axum::async_trait]
impl<S, T> FromRequest<S> for FileOrJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await.map_err(|e| {
                ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
            })?;
            return Ok(FileOrJson::Multipart(multipart));
        }

        let essence = content_type.split(';').next().unwrap_or_default().trim();
        if essence == "application/json" || essence.ends_with("+json") {
            let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
            return Ok(FileOrJson::Json(value));
        }

        Ok(FileOrJson::Empty)
    }
}
