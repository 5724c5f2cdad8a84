use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use server::routes::ServerState;
use server::startup::build_app;
use service::auth::{AuthConfig, AuthService, Hasher, InMemoryAuthClient, UserStore};

fn app() -> Router {
    let client = InMemoryAuthClient::new(Arc::new(UserStore::new()));
    let cfg = AuthConfig::new("test-secret").with_hasher(Hasher::with_params(8, 1, 1).unwrap());
    build_app(ServerState::new(AuthService::new(Arc::new(client), cfg)))
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    post(uri, serde_json::to_vec(&body).unwrap())
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_is_ok() {
    let app = app();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn register_then_login() {
    let app = app();
    let (status, registered) = send(
        &app,
        post_json("/auth/register", json!({"username": "bob", "password": "p", "email": "b@x.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registered["username"], "bob");
    assert_eq!(registered["role"], "user");
    assert!(registered.get("password").is_none());

    let (status, session) = send(&app, post_json("/auth/login", json!({"username": "bob", "password": "p"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["id"], registered["id"]);
    assert!(!session["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_register_is_bad_request() {
    let app = app();
    let body = json!({"username": "alice", "password": "p", "email": "a@x.com"});
    send(&app, post_json("/auth/register", body.clone())).await;
    let (status, err) = send(&app, post_json("/auth/register", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["type"], "RequestError");
    assert_eq!(err["message"], "User alice exists!");
    assert_eq!(err["context"]["email"], "a@x.com");
}

#[tokio::test]
async fn unparseable_body_reports_every_missing_field() {
    let app = app();
    let (status, err) = send(&app, post("/auth/register", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["message"], "Bad Request");
    let fields: Vec<&str> = err["context"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["username", "password", "email"]);
}

#[tokio::test]
async fn login_unknown_and_wrong_password() {
    let app = app();
    let (status, err) = send(&app, post_json("/auth/login", json!({"username": "ghost", "password": "p"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["message"], "Unknown username");

    send(&app, post_json("/auth/register", json!({"username": "bob", "password": "p", "email": "b@x.com"}))).await;
    let (status, err) = send(&app, post_json("/auth/login", json!({"username": "bob", "password": "x"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["message"], "Invalid credentials");
}

#[tokio::test]
async fn request_id_is_generated_or_echoed() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let generated = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
    assert!(resp.headers().get("x-response-time").unwrap().to_str().unwrap().ends_with("ms"));

    let req = Request::builder().uri("/health").header("x-request-id", "abc-123").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "abc-123");
}

#[tokio::test]
async fn get_on_auth_route_is_rejected() {
    let app = app();
    let resp = app.oneshot(Request::builder().uri("/auth/login").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

struct CountInfo(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for CountInfo {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::INFO {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn one_info_line_per_request() {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(CountInfo(count.clone()));
    tracing::subscriber::with_default(subscriber, || {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let resp = app()
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        });
    });
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
