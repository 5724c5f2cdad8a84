//! Request correlation and latency headers.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::info;
use uuid::Uuid;

use common::{REQUEST_ID_HEADER, RESPONSE_TIME_HEADER};

/// Ensure every request carries an `x-request-id`, generating one when the
/// caller did not, and echo it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let name = HeaderName::from_static(REQUEST_ID_HEADER);
    let id = match req.headers().get(&name) {
        Some(v) => v.clone(),
        None => {
            let generated = HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("-"));
            req.headers_mut().insert(name.clone(), generated.clone());
            generated
        }
    };
    let mut resp = next.run(req).await;
    resp.headers_mut().insert(name, id);
    resp
}

/// Stamp `x-response-time` on the response and log the request line.
pub async fn response_time(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let start = Instant::now();
    let mut resp = next.run(req).await;
    let elapsed = start.elapsed().as_millis();
    if let Ok(v) = HeaderValue::from_str(&format!("{elapsed}ms")) {
        resp.headers_mut().insert(HeaderName::from_static(RESPONSE_TIME_HEADER), v);
    }
    info!(%method, %path, %request_id, status = resp.status().as_u16(), elapsed_ms = elapsed as u64, "request handled");
    resp
}
