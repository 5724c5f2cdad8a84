//! Typed request pipeline for the auth front end.
//! - `decode`: untyped JSON → typed command or structured violations.
//! - `effect`: single-shot async steps and their short-circuiting composition.
//! - `auth`: backend contract, in-memory backend and the register/login chains.
//! - `response`: outcome → status/body with schema projection.

pub mod auth;
pub mod decode;
pub mod effect;
pub mod errors;
pub mod response;
