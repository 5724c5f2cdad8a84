use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::domain::{Credentials, LookupInput, RegisterCommand, RegisterInput, UserSummary};
use crate::effect::{from_fn, Effect, Outcome};
use crate::errors::RequestError;

/// Backend the auth pipeline delegates storage to.
///
/// Implementations report domain failures as `Err(RequestError)`:
/// - `register` on an existing username: 400, message naming the username
/// - `lookup_by_username` / `credentials` on an unknown user: 404 `Unknown username`
///
/// `register` must make the existence check and the insert atomic.
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn register(&self, input: RegisterInput) -> Outcome<UserSummary>;
    async fn lookup_by_username(&self, input: LookupInput) -> Outcome<UserSummary>;
    async fn credentials(&self, user: &UserSummary) -> Outcome<Credentials>;
}

/// 400 reported for a username that already has a record.
pub fn username_taken(command: &RegisterCommand) -> RequestError {
    RequestError::conflict(format!("User {} exists!", command.username), command.context())
}

/// 404 reported for a username with no record.
pub fn unknown_username(username: &str) -> RequestError {
    RequestError::not_found("Unknown username", json!({ "username": username }))
}

/// `client.register` as a pipeline step.
pub fn register_effect(client: Arc<dyn AuthClient>) -> impl Effect<RegisterInput, Output = UserSummary> {
    from_fn(move |input: RegisterInput| async move { client.register(input).await })
}

/// `client.lookup_by_username` as a pipeline step.
pub fn lookup_effect(client: Arc<dyn AuthClient>) -> impl Effect<LookupInput, Output = UserSummary> {
    from_fn(move |input: LookupInput| async move { client.lookup_by_username(input).await })
}

/// Call-counting wrapper for tests
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct CountingAuthClient {
        inner: Arc<dyn AuthClient>,
        calls: AtomicUsize,
    }

    impl CountingAuthClient {
        pub fn new(inner: Arc<dyn AuthClient>) -> Self {
            Self { inner, calls: AtomicUsize::new(0) }
        }

        /// Number of backend operations invoked so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn bump(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl AuthClient for CountingAuthClient {
        async fn register(&self, input: RegisterInput) -> Outcome<UserSummary> {
            self.bump();
            self.inner.register(input).await
        }

        async fn lookup_by_username(&self, input: LookupInput) -> Outcome<UserSummary> {
            self.bump();
            self.inner.lookup_by_username(input).await
        }

        async fn credentials(&self, user: &UserSummary) -> Outcome<Credentials> {
            self.bump();
            self.inner.credentials(user).await
        }
    }
}
