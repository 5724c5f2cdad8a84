use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::HeaderMap;
use futures::FutureExt;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use super::domain::{LoginResponse, LoginSession, RegisterResponse, UserSummary};
use super::password::Hasher;
use super::pipeline;
use super::repository::AuthClient;
use super::token::TokenIssuer;
use crate::effect::{Effect, Outcome};
use crate::errors::RequestError;
use crate::response::{map_outcome, Reply};

/// Auth service configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub hasher: Hasher,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self { jwt_secret: jwt_secret.into(), token_ttl_secs: 12 * 60 * 60, hasher: Hasher::default() }
    }

    pub fn with_token_ttl(mut self, secs: u64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
        self
    }
}

/// Register/login entry points independent of the web framework.
pub struct AuthService {
    client: Arc<dyn AuthClient>,
    hasher: Hasher,
    issuer: TokenIssuer,
}

impl AuthService {
    pub fn new(client: Arc<dyn AuthClient>, cfg: AuthConfig) -> Self {
        let issuer = TokenIssuer::new(&cfg.jwt_secret, cfg.token_ttl_secs);
        Self { client, hasher: cfg.hasher, issuer }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Run the register pipeline on an already parsed (or empty) body.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthConfig, AuthService, Hasher, InMemoryAuthClient, UserStore};
    /// use std::sync::Arc;
    /// let client = Arc::new(InMemoryAuthClient::new(Arc::new(UserStore::new())));
    /// let svc = AuthService::new(client, AuthConfig::new("secret").with_hasher(Hasher::with_params(8, 1, 1).unwrap()));
    /// let body = serde_json::json!({"username": "bob", "password": "p", "email": "b@x.com"});
    /// let user = tokio_test::block_on(svc.register(&body, Default::default())).unwrap();
    /// assert_eq!(user.role, "user");
    /// ```
    #[instrument(skip_all, fields(endpoint = "register"))]
    pub async fn register(&self, raw: &Value, headers: HeaderMap) -> Outcome<UserSummary> {
        let effect = pipeline::register(raw, headers, self.client.clone(), self.hasher.clone());
        let outcome = guarded(effect.run(())).await;
        match &outcome {
            Ok(user) => info!(user_id = %user.id, username = %user.username, "register succeeded"),
            Err(e) => warn!(status = e.status().as_u16(), message = %e.message(), "register failed"),
        }
        outcome
    }

    /// Run the login pipeline; success carries a signed token.
    #[instrument(skip_all, fields(endpoint = "login"))]
    pub async fn login(&self, raw: &Value, headers: HeaderMap) -> Outcome<LoginSession> {
        let effect = pipeline::login(raw, headers, self.client.clone(), self.hasher.clone(), self.issuer.clone());
        let outcome = guarded(effect.run(())).await;
        match &outcome {
            Ok(session) => info!(user_id = %session.user.id, username = %session.user.username, "login succeeded"),
            Err(e) => warn!(status = e.status().as_u16(), message = %e.message(), "login failed"),
        }
        outcome
    }

    pub async fn handle_register(&self, raw: Value, headers: HeaderMap) -> Reply {
        map_outcome::<RegisterResponse, _>(self.register(&raw, headers).await)
    }

    pub async fn handle_login(&self, raw: Value, headers: HeaderMap) -> Reply {
        map_outcome::<LoginResponse, _>(self.login(&raw, headers).await)
    }
}

/// Convert a panic anywhere in the chain into a 500.
async fn guarded<T>(fut: impl Future<Output = Outcome<T>>) -> Outcome<T> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            error!(panic = %panic_message(payload.as_ref()), "pipeline panicked");
            Err(RequestError::internal(json!({})))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
