//! User records kept by a GraphQL user service (Hasura) reached over HTTP.
//!
//! Each backend call is one POST of `{query, variables}` carrying the admin
//! secret. The request id of the inbound call is forwarded. Dropping the
//! returned future drops the in-flight HTTP request.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::domain::{Credentials, LookupInput, RegisterInput, UserSummary};
use crate::auth::repository::{unknown_username, username_taken, AuthClient};
use crate::effect::Outcome;
use crate::errors::RequestError;

pub const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

/// Error code the service reports for a unique-key violation.
const CONSTRAINT_VIOLATION: &str = "constraint-violation";

const CREATE_USER: &str = r#"mutation CreateUser($object: users_insert_input!) {
  insert_users_one(object: $object) { id username role }
}"#;

const USER_BY_NAME: &str = r#"query UserByName($username: String!) {
  users(where: {username: {_eq: $username}}, limit: 1) { id username role }
}"#;

const CREDENTIALS: &str = r#"query Credentials($id: uuid!) {
  users_by_pk(id: $id) { id username password_hash }
}"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
    #[serde(default)]
    extensions: Value,
}

impl GraphqlError {
    fn code(&self) -> Option<&str> {
        self.extensions.get("code").and_then(Value::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: Uuid,
    username: String,
    role: String,
}

impl From<RemoteUser> for UserSummary {
    fn from(u: RemoteUser) -> Self {
        UserSummary { id: u.id, username: u.username, role: u.role }
    }
}

#[derive(Debug, Deserialize)]
struct CreateUserData {
    insert_users_one: Option<RemoteUser>,
}

#[derive(Debug, Deserialize)]
struct UsersData {
    users: Vec<RemoteUser>,
}

#[derive(Debug, Deserialize)]
struct CredentialsRow {
    id: Uuid,
    username: String,
    password_hash: String,
}

#[derive(Debug, Deserialize)]
struct CredentialsData {
    users_by_pk: Option<CredentialsRow>,
}

fn backend_failure(operation: &'static str, err: &dyn fmt::Display) -> RequestError {
    error!(operation, error = %err, "user service request failed");
    RequestError::internal(json!({ "stage": "backend", "operation": operation }))
}

fn graphql_failure(operation: &'static str, errors: &[GraphqlError]) -> RequestError {
    let joined = errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ");
    backend_failure(operation, &joined)
}

#[derive(Clone)]
pub struct RemoteAuthClient {
    http: reqwest::Client,
    url: String,
    admin_secret: String,
    default_role: String,
}

impl fmt::Debug for RemoteAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteAuthClient")
            .field("url", &self.url)
            .field("admin_secret", &"<redacted>")
            .field("default_role", &self.default_role)
            .finish()
    }
}

impl RemoteAuthClient {
    pub fn new(url: impl Into<String>, admin_secret: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url: url.into(), admin_secret: admin_secret.into(), default_role: "user".into() })
    }

    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &str,
        variables: Value,
        headers: Option<&HeaderMap>,
    ) -> Outcome<GraphqlResponse<T>> {
        let mut req = self
            .http
            .post(&self.url)
            .header(ADMIN_SECRET_HEADER, &self.admin_secret)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(id) = headers.and_then(|h| h.get(common::REQUEST_ID_HEADER)) {
            req = req.header(common::REQUEST_ID_HEADER, id.clone());
        }

        let resp = req.send().await.map_err(|e| backend_failure(operation, &e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(backend_failure(operation, &format!("unexpected status {status}")));
        }
        resp.json::<GraphqlResponse<T>>()
            .await
            .map_err(|e| backend_failure(operation, &e))
    }
}

#[async_trait]
impl AuthClient for RemoteAuthClient {
    async fn register(&self, input: RegisterInput) -> Outcome<UserSummary> {
        let RegisterInput { command, headers } = input;
        let variables = json!({
            "object": {
                "username": command.username,
                "email": command.email,
                "password_hash": command.password,
                "role": self.default_role,
            }
        });
        let resp: GraphqlResponse<CreateUserData> =
            self.execute("create_user", CREATE_USER, variables, Some(&headers)).await?;

        if resp.errors.iter().any(|e| e.code() == Some(CONSTRAINT_VIOLATION)) {
            debug!(username = %command.username, "username taken");
            return Err(username_taken(&command));
        }
        if !resp.errors.is_empty() {
            return Err(graphql_failure("create_user", &resp.errors));
        }
        let user: UserSummary = resp
            .data
            .and_then(|d| d.insert_users_one)
            .ok_or_else(|| backend_failure("create_user", &"no user returned"))?
            .into();
        info!(user_id = %user.id, username = %user.username, "user_registered");
        Ok(user)
    }

    async fn lookup_by_username(&self, input: LookupInput) -> Outcome<UserSummary> {
        let username = input.command.username;
        let variables = json!({ "username": username });
        let resp: GraphqlResponse<UsersData> =
            self.execute("user_by_name", USER_BY_NAME, variables, Some(&input.headers)).await?;
        if !resp.errors.is_empty() {
            return Err(graphql_failure("user_by_name", &resp.errors));
        }
        resp.data
            .and_then(|d| d.users.into_iter().next())
            .map(UserSummary::from)
            .ok_or_else(|| unknown_username(&username))
    }

    async fn credentials(&self, user: &UserSummary) -> Outcome<Credentials> {
        let resp: GraphqlResponse<CredentialsData> =
            self.execute("credentials", CREDENTIALS, json!({ "id": user.id }), None).await?;
        if !resp.errors.is_empty() {
            return Err(graphql_failure("credentials", &resp.errors));
        }
        match resp.data.and_then(|d| d.users_by_pk) {
            Some(row) if row.username == user.username => {
                Ok(Credentials { user_id: row.id, password_hash: row.password_hash })
            }
            _ => Err(unknown_username(&user.username)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_violation_is_recognised() {
        let resp: GraphqlResponse<CreateUserData> = serde_json::from_value(json!({
            "errors": [{
                "message": "Uniqueness violation",
                "extensions": {"code": "constraint-violation", "path": "$.selectionSet.insert_users_one"}
            }]
        }))
        .unwrap();
        assert!(resp.data.is_none());
        assert_eq!(resp.errors[0].code(), Some(CONSTRAINT_VIOLATION));
    }

    #[test]
    fn users_decode_into_summaries() {
        let id = Uuid::new_v4();
        let resp: GraphqlResponse<UsersData> = serde_json::from_value(json!({
            "data": {"users": [{"id": id, "username": "bob", "role": "user"}]}
        }))
        .unwrap();
        let user: UserSummary = resp.data.unwrap().users.into_iter().next().unwrap().into();
        assert_eq!(user, UserSummary { id, username: "bob".into(), role: "user".into() });
    }

    #[test]
    fn debug_hides_admin_secret() {
        let client = RemoteAuthClient::new("http://127.0.0.1:1/v1/graphql", "hunter2", Duration::from_secs(1)).unwrap();
        assert!(!format!("{client:?}").contains("hunter2"));
    }

    #[test]
    fn failures_become_internal_errors() {
        let err = graphql_failure("user_by_name", &[GraphqlError { message: "db down".into(), extensions: Value::Null }]);
        assert_eq!(err.message(), "Internal Error");
        assert_eq!(err.context()["operation"], "user_by_name");
        assert!(!err.to_body().to_string().contains("db down"));
    }
}
