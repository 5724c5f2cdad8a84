//! Per-endpoint effect chains.
//!
//! Register: decode → envelope → username availability check → hash password
//! → `client.register`.
//! Login: decode → envelope → `client.lookup_by_username` → verify password
//! → issue token.
//!
//! Nothing runs until the returned effect is run; a decode failure is lifted
//! as `Err` so no later step, and no backend call, happens.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::domain::{LoginCommand, LoginSession, LookupCommand, LookupInput, RegisterCommand, RegisterInput, UserSummary};
use super::errors::AuthError;
use super::password::Hasher;
use super::repository::{lookup_effect, register_effect, username_taken, AuthClient};
use super::token::TokenIssuer;
use crate::decode::Decode;
use crate::effect::{carry, compose, from_fn, from_outcome, Effect, Outcome};
use crate::errors::RequestError;

/// Decode a request body, turning violations into a 400.
pub fn decode_command<C: Decode>(raw: &Value) -> Outcome<C> {
    C::decode(raw).map_err(|e| {
        debug!(detail = %e.draw(), "request body rejected");
        RequestError::bad_request(e.to_context())
    })
}

pub fn register(
    raw: &Value,
    headers: HeaderMap,
    client: Arc<dyn AuthClient>,
    hasher: Hasher,
) -> impl Effect<(), Output = UserSummary> {
    let input = decode_command::<RegisterCommand>(raw).map(|command| RegisterInput { command, headers });
    compose(from_outcome(input), ensure_available(client.clone()))
        .then(hash_password(hasher))
        .then(register_effect(client))
}

pub fn login(
    raw: &Value,
    headers: HeaderMap,
    client: Arc<dyn AuthClient>,
    hasher: Hasher,
    issuer: TokenIssuer,
) -> impl Effect<(), Output = LoginSession> {
    let attempt = decode_command::<LoginCommand>(raw).map(|command| command.into_attempt(headers));
    compose(from_outcome(attempt), carry(lookup_effect(client.clone())))
        .then(verify_password(client, hasher))
        .then(issue_token(issuer))
}

/// Reject a taken username before paying for a hash. `client.register` still
/// makes the final, atomic decision.
pub fn ensure_available(client: Arc<dyn AuthClient>) -> impl Effect<RegisterInput, Output = RegisterInput> {
    from_fn(move |input: RegisterInput| availability_step(client, input))
}

async fn availability_step(client: Arc<dyn AuthClient>, input: RegisterInput) -> Outcome<RegisterInput> {
    let lookup = LookupInput {
        command: LookupCommand { username: input.command.username.clone() },
        headers: input.headers.clone(),
    };
    match client.lookup_by_username(lookup).await {
        Ok(_) => Err(username_taken(&input.command)),
        Err(e) if e.status() == StatusCode::NOT_FOUND => Ok(input),
        Err(e) => Err(e),
    }
}

/// Replace the plaintext password in the envelope with its hash.
pub fn hash_password(hasher: Hasher) -> impl Effect<RegisterInput, Output = RegisterInput> {
    from_fn(move |input: RegisterInput| hash_step(hasher, input))
}

async fn hash_step(hasher: Hasher, mut input: RegisterInput) -> Outcome<RegisterInput> {
    let password = std::mem::take(&mut input.command.password);
    input.command.password = hasher.hash_blocking(password).await?;
    Ok(input)
}

/// Check the supplied password against the stored hash; 401 on mismatch.
pub fn verify_password(
    client: Arc<dyn AuthClient>,
    hasher: Hasher,
) -> impl Effect<(UserSummary, String), Output = UserSummary> {
    from_fn(move |(user, password): (UserSummary, String)| verify_step(client, hasher, user, password))
}

async fn verify_step(
    client: Arc<dyn AuthClient>,
    hasher: Hasher,
    user: UserSummary,
    password: String,
) -> Outcome<UserSummary> {
    let credentials = client.credentials(&user).await?;
    if hasher.verify_blocking(password, credentials.password_hash).await? {
        Ok(user)
    } else {
        debug!(username = %user.username, "password mismatch");
        Err(AuthError::InvalidCredentials.into())
    }
}

pub fn issue_token(issuer: TokenIssuer) -> impl Effect<UserSummary, Output = LoginSession> {
    from_fn(move |user: UserSummary| {
        let outcome = issuer
            .issue(&user)
            .map(|token| LoginSession { user, token })
            .map_err(RequestError::from);
        std::future::ready(outcome)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::memory::{InMemoryAuthClient, UserStore};
    use serde_json::json;

    fn cheap() -> Hasher {
        Hasher::with_params(8, 1, 1).unwrap()
    }

    fn client() -> (Arc<UserStore>, Arc<dyn AuthClient>) {
        let store = Arc::new(UserStore::new());
        (store.clone(), Arc::new(InMemoryAuthClient::new(store)))
    }

    #[tokio::test]
    async fn register_stores_a_hash_not_the_password() {
        let (store, client) = client();
        let raw = json!({"username": "bob", "password": "p", "email": "b@x.com"});
        let user = register(&raw, HeaderMap::new(), client, cheap()).run(()).await.unwrap();
        assert_eq!(user.username, "bob");
        let stored = store.get("bob").await.unwrap();
        assert_ne!(stored.password, "p");
        assert!(cheap().verify("p", &stored.password).unwrap());
    }

    #[tokio::test]
    async fn login_issues_token_for_registered_user() {
        let (_, client) = client();
        let issuer = TokenIssuer::new("secret", 60);
        let raw = json!({"username": "bob", "password": "p", "email": "b@x.com"});
        register(&raw, HeaderMap::new(), client.clone(), cheap()).run(()).await.unwrap();

        let raw = json!({"username": "bob", "password": "p"});
        let session = login(&raw, HeaderMap::new(), client, cheap(), issuer.clone()).run(()).await.unwrap();
        assert_eq!(session.user.username, "bob");
        assert_eq!(issuer.decode(&session.token).unwrap().sub, "bob");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (_, client) = client();
        let raw = json!({"username": "bob", "password": "p", "email": "b@x.com"});
        register(&raw, HeaderMap::new(), client.clone(), cheap()).run(()).await.unwrap();

        let raw = json!({"username": "bob", "password": "nope"});
        let err = login(&raw, HeaderMap::new(), client, cheap(), TokenIssuer::new("s", 60))
            .run(())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn taken_username_is_rejected_before_hashing() {
        let (store, client) = client();
        let raw = json!({"username": "bob", "password": "p", "email": "b@x.com"});
        register(&raw, HeaderMap::new(), client.clone(), cheap()).run(()).await.unwrap();
        let original = store.get("bob").await.unwrap();

        let input = RegisterInput {
            command: RegisterCommand { username: "bob".into(), password: "q".into(), email: "o@x.com".into() },
            headers: HeaderMap::new(),
        };
        let err = ensure_available(client).run(input).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "User bob exists!");
        assert_eq!(store.get("bob").await.unwrap(), original);
    }

    #[test]
    fn decode_failure_is_bad_request() {
        let err = decode_command::<LoginCommand>(&json!({"username": 3})).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Bad Request");
        assert_eq!(err.context()["errors"].as_array().unwrap().len(), 2);
    }
}
