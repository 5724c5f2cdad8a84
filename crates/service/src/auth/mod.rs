//! Auth module: domain types, backend contract, password/token steps and the
//! register/login pipelines.

pub mod domain;
pub mod errors;
pub mod password;
pub mod pipeline;
pub mod repo;
pub mod repository;
pub mod service;
pub mod token;

pub use password::Hasher;
pub use repo::memory::{InMemoryAuthClient, UserStore};
pub use repo::remote::RemoteAuthClient;
pub use repository::AuthClient;
pub use service::{AuthConfig, AuthService};
