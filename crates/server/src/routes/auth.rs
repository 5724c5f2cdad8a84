use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde_json::{json, Value};
use tracing::debug;

use service::auth::AuthService;
use service::response::Reply;

#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<AuthService>,
}

impl ServerState {
    pub fn new(auth: AuthService) -> Self {
        Self { auth: Arc::new(auth) }
    }
}

/// Request bodies that are not valid JSON are treated as `{}` so the
/// decoder reports every required field as missing.
fn parse_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        debug!(error = %e, len = body.len(), "body is not json; decoding as empty object");
        json!({})
    })
}

pub async fn register(State(state): State<ServerState>, headers: HeaderMap, body: Bytes) -> Reply {
    state.auth.handle_register(parse_body(&body), headers).await
}

pub async fn login(State(state): State<ServerState>, headers: HeaderMap, body: Bytes) -> Reply {
    state.auth.handle_login(parse_body(&body), headers).await
}
