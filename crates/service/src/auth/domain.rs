use std::fmt;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::decode::{Decode, FieldKind, Schema};

/// Registration body.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCommand {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl Decode for RegisterCommand {
    const SCHEMA: Schema = Schema::new(&[
        ("username", FieldKind::String),
        ("password", FieldKind::String),
        ("email", FieldKind::String),
    ]);
}

impl RegisterCommand {
    /// Error context for this command; the password is left out.
    pub fn context(&self) -> Value {
        json!({ "username": self.username, "email": self.email })
    }
}

impl fmt::Debug for RegisterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterCommand")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// Login body.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCommand {
    pub username: String,
    pub password: String,
}

impl Decode for LoginCommand {
    const SCHEMA: Schema = Schema::new(&[
        ("username", FieldKind::String),
        ("password", FieldKind::String),
    ]);
}

impl LoginCommand {
    /// Split into the backend lookup and the password kept for verification.
    pub fn into_attempt(self, headers: HeaderMap) -> (LookupInput, String) {
        let lookup = LookupInput {
            command: LookupCommand { username: self.username },
            headers,
        };
        (lookup, self.password)
    }
}

impl fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCommand")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Lookup request handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupCommand {
    pub username: String,
}

/// Stored user. `password` is a PHC hash string, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: String,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary { id: self.id, username: self.username.clone(), role: self.role.clone() }
    }
}

/// What the backend returns for register and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub role: String,
}

/// Hash handed to the verification step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
}

/// Backend envelope for registration.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub command: RegisterCommand,
    pub headers: HeaderMap,
}

/// Backend envelope for lookup by username.
#[derive(Debug, Clone)]
pub struct LookupInput {
    pub command: LookupCommand,
    pub headers: HeaderMap,
}

/// Successful login before projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginSession {
    #[serde(flatten)]
    pub user: UserSummary,
    pub token: String,
}

/// Response schema for `/auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: String,
    pub username: String,
    pub role: String,
}

impl Decode for RegisterResponse {
    const SCHEMA: Schema = Schema::new(&[
        ("id", FieldKind::String),
        ("username", FieldKind::String),
        ("role", FieldKind::String),
    ]);
}

/// Response schema for `/auth/login`. Email is not part of a user summary, so it is not returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: String,
    pub username: String,
    pub role: String,
    pub token: String,
}

impl Decode for LoginResponse {
    const SCHEMA: Schema = Schema::new(&[
        ("id", FieldKind::String),
        ("username", FieldKind::String),
        ("role", FieldKind::String),
        ("token", FieldKind::String),
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_passwords() {
        let cmd = RegisterCommand { username: "bob".into(), password: "hunter2".into(), email: "b@x.com".into() };
        assert!(!format!("{cmd:?}").contains("hunter2"));
        let login = LoginCommand { username: "bob".into(), password: "hunter2".into() };
        assert!(!format!("{login:?}").contains("hunter2"));
    }

    #[test]
    fn context_omits_password() {
        let cmd = RegisterCommand { username: "bob".into(), password: "hunter2".into(), email: "b@x.com".into() };
        assert_eq!(cmd.context(), json!({"username": "bob", "email": "b@x.com"}));
    }

    #[test]
    fn session_serializes_flat() {
        let id = Uuid::new_v4();
        let session = LoginSession {
            user: UserSummary { id, username: "bob".into(), role: "user".into() },
            token: "t".into(),
        };
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value, json!({"id": id.to_string(), "username": "bob", "role": "user", "token": "t"}));
    }

    #[test]
    fn login_splits_into_lookup_and_password() {
        let login = LoginCommand { username: "bob".into(), password: "pw".into() };
        let (lookup, password) = login.into_attempt(HeaderMap::new());
        assert_eq!(lookup.command.username, "bob");
        assert_eq!(password, "pw");
    }
}
