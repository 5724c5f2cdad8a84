//! Folding an [`Outcome`] into the status/body pair handed to the transport.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::decode::Decode;
use crate::effect::Outcome;
use crate::errors::RequestError;

/// Transport-facing result of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<RequestError> for Reply {
    fn from(err: RequestError) -> Self {
        Self { status: err.status(), body: err.to_body() }
    }
}

/// Pass a success value through the response schema `R`, keeping only the
/// fields `R` declares.
pub fn project<R, T>(value: &T) -> Outcome<R>
where
    R: Decode,
    T: Serialize,
{
    let raw = serde_json::to_value(value).map_err(|e| {
        error!(error = %e, "response value not serializable");
        RequestError::internal(json!({ "stage": "response" }))
    })?;
    R::decode(&raw).map_err(|e| {
        error!(detail = %e.draw(), "response value does not match its schema");
        RequestError::internal(json!({ "stage": "response" }))
    })
}

/// `Err(e)` → `e.status` with `e` as body; `Ok(v)` → 200 with `v` projected
/// through `R`.
pub fn map_outcome<R, T>(outcome: Outcome<T>) -> Reply
where
    R: Decode + Serialize,
    T: Serialize,
{
    let body = outcome
        .and_then(|value| project::<R, T>(&value))
        .and_then(|projected| {
            serde_json::to_value(&projected).map_err(|e| {
                error!(error = %e, "projected body not serializable");
                RequestError::internal(json!({ "stage": "response" }))
            })
        });
    match body {
        Ok(body) => Reply { status: StatusCode::OK, body },
        Err(err) => err.into(),
    }
}
