//! Shared plumbing for the auth front end: health payloads, header names and
//! tracing setup.

pub mod types;

pub mod utils {
    pub mod logging;
}

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the handler latency, e.g. `12ms`.
pub const RESPONSE_TIME_HEADER: &str = "x-response-time";
