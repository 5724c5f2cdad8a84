use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::domain::{Credentials, LookupInput, RegisterInput, User, UserSummary};
use crate::auth::repository::{unknown_username, username_taken, AuthClient};
use crate::effect::Outcome;

/// Username-keyed user map shared by every request.
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, username: &str) -> Option<User> {
        self.users.read().await.get(username).cloned()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

/// Process-lifetime backend over an injected [`UserStore`].
#[derive(Debug, Clone)]
pub struct InMemoryAuthClient {
    store: Arc<UserStore>,
    default_role: String,
}

impl InMemoryAuthClient {
    pub fn new(store: Arc<UserStore>) -> Self {
        Self { store, default_role: "user".into() }
    }

    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }
}

fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(common::REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

#[async_trait]
impl AuthClient for InMemoryAuthClient {
    async fn register(&self, input: RegisterInput) -> Outcome<UserSummary> {
        let RegisterInput { command, headers } = input;
        // check and insert under one guard
        let mut users = self.store.users.write().await;
        if users.contains_key(&command.username) {
            debug!(username = %command.username, request_id = %request_id(&headers), "username taken");
            return Err(username_taken(&command));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: command.username,
            password: command.password,
            email: command.email,
            role: self.default_role.clone(),
        };
        let summary = user.summary();
        users.insert(user.username.clone(), user);
        info!(user_id = %summary.id, username = %summary.username, request_id = %request_id(&headers), "user_registered");
        Ok(summary)
    }

    async fn lookup_by_username(&self, input: LookupInput) -> Outcome<UserSummary> {
        let username = input.command.username;
        self.store
            .get(&username)
            .await
            .map(|user| user.summary())
            .ok_or_else(|| unknown_username(&username))
    }

    async fn credentials(&self, user: &UserSummary) -> Outcome<Credentials> {
        match self.store.get(&user.username).await {
            Some(stored) if stored.id == user.id => Ok(Credentials {
                user_id: stored.id,
                password_hash: stored.password,
            }),
            _ => Err(unknown_username(&user.username)),
        }
    }
}
