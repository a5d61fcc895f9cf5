use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Client sent something outside the accepted vocabulary. `details` is an
    /// extra field merged into the body, e.g. `("valid_types", [...])`.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        details: Option<(&'static str, Value)>,
    },

    #[error("authorization required")]
    Unauthorized,

    #[error("invalid api key")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("storage not configured")]
    StorageUnavailable,

    #[error("{context}: {message}")]
    Internal {
        context: &'static str,
        message: String,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(
        message: impl Into<String>,
        key: &'static str,
        value: impl Into<Value>,
    ) -> Self {
        AppError::Validation {
            message: message.into(),
            details: Some((key, value.into())),
        }
    }

    /// Adapter for `map_err`: wraps any displayable failure as a 500 carrying
    /// the handler-specific context and the underlying message.
    pub fn internal<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> AppError {
        move |e| AppError::Internal {
            context,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        let status = match self {
            AppError::Validation { message, details } => {
                body.insert("error".into(), Value::String(message));
                if let Some((key, value)) = details {
                    body.insert(key.into(), value);
                }
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => {
                body.insert("error".into(), json!("Authorization required"));
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => {
                body.insert("error".into(), json!("Invalid API key"));
                StatusCode::FORBIDDEN
            }
            AppError::NotFound => {
                body.insert("error".into(), json!("Not found"));
                StatusCode::NOT_FOUND
            }
            AppError::StorageUnavailable => {
                body.insert("error".into(), json!("Statistics storage not configured"));
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Internal { context, message } => {
                tracing::error!(error = %message, context, "request failed");
                body.insert("error".into(), json!(context));
                body.insert("message".into(), Value::String(message));
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        body.insert("success".into(), Value::Bool(false));

        (status, axum::Json(Value::Object(body))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// JSON extractor that logs deserialization errors before returning them as 400s.
/// Drop-in replacement for `axum::Json<T>`.
pub struct LoggedJson<T>(pub T);

impl<S, T> FromRequest<S> for LoggedJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(
        req: axum::extract::Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let path = req.uri().path().to_string();
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(LoggedJson(value)),
            Err(rejection) => {
                tracing::warn!(
                    path = %path,
                    error = %rejection,
                    "JSON parse error (client sent malformed payload)"
                );
                Err(AppError::validation(rejection.body_text()))
            }
        }
    }
}

/// JSON extractor for telemetry endpoints: an empty or malformed body decodes
/// to `T::default()` instead of rejecting the request. Field types are not
/// forgiven here; mark optional fields with [`lenient`] so one mistyped field
/// does not discard the others.
/// Content-Type is not checked, so `navigator.sendBeacon` payloads work.
pub struct LenientJson<T>(pub T);

impl<S, T> FromRequest<S> for LenientJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(
        req: axum::extract::Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let path = req.uri().path().to_string();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(LenientJson(T::default()));
        }

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(LenientJson(value)),
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "ignoring malformed JSON body");
                Ok(LenientJson(T::default()))
            }
        }
    }
}

/// `deserialize_with` helper: a present field of the wrong type becomes `None`.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
