use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Discriminant written as the `type` field of every error body.
pub const REQUEST_ERROR_KIND: &str = "RequestError";

/// Uniform failure value carried through every pipeline stage and rendered
/// verbatim as the response body.
///
/// The status is always a client or server error; anything else handed to
/// [`RequestError::new`] is reported as 500.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{status} {message}")]
pub struct RequestError {
    status: StatusCode,
    message: String,
    context: Value,
}

impl RequestError {
    pub fn new(message: impl Into<String>, context: Value, status: StatusCode) -> Self {
        let status = if status.is_client_error() || status.is_server_error() {
            status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self { status, message: message.into(), context }
    }

    /// Body failed structural decoding.
    pub fn bad_request(context: Value) -> Self {
        Self::new("Bad Request", context, StatusCode::BAD_REQUEST)
    }

    pub fn conflict(message: impl Into<String>, context: Value) -> Self {
        Self::new(message, context, StatusCode::BAD_REQUEST)
    }

    pub fn not_found(message: impl Into<String>, context: Value) -> Self {
        Self::new(message, context, StatusCode::NOT_FOUND)
    }

    pub fn unauthorized(message: impl Into<String>, context: Value) -> Self {
        Self::new(message, context, StatusCode::UNAUTHORIZED)
    }

    /// Unexpected fault. The context must not carry internal detail.
    pub fn internal(context: Value) -> Self {
        Self::new("Internal Error", context, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> &'static str { REQUEST_ERROR_KIND }
    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }
    pub fn context(&self) -> &Value { &self.context }

    /// Wire representation: `{type, status, message, context}`.
    pub fn to_body(&self) -> Value {
        json!({
            "type": REQUEST_ERROR_KIND,
            "status": self.status.as_u16(),
            "message": self.message,
            "context": self.context,
        })
    }
}
