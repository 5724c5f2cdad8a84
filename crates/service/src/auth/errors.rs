use axum::http::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::errors::RequestError;

/// Failures raised by the password and token steps.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("blocking task failed: {0}")]
    Worker(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::InvalidCredentials => 1004,
            AuthError::Hash(_) => 1101,
            AuthError::Token(_) => 1102,
            AuthError::Worker(_) => 1103,
        }
    }

    /// Pipeline step the failure came from.
    pub fn step(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "verify_password",
            AuthError::Hash(_) => "hash_password",
            AuthError::Token(_) => "issue_token",
            AuthError::Worker(_) => "blocking_pool",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for RequestError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                RequestError::unauthorized("Invalid credentials", json!({ "code": err.code() }))
            }
            other => {
                // detail stays in the log
                error!(code = other.code(), step = other.step(), error = %other, "auth step failed");
                RequestError::internal(json!({ "code": other.code(), "step": other.step() }))
            }
        }
    }
}
