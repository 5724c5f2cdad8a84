//! Concrete [`AuthClient`](super::repository::AuthClient) backends.

pub mod memory;
pub mod remote;
