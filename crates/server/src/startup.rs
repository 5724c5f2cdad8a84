use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::{AppConfig, BackendKind};
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, ServerState};
use service::auth::{AuthClient, AuthConfig, AuthService, InMemoryAuthClient, RemoteAuthClient, UserStore};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

fn build_client(cfg: &AppConfig) -> Result<Arc<dyn AuthClient>, StartupError> {
    let role = cfg.auth.default_role.clone();
    match cfg.backend.kind {
        BackendKind::Memory => {
            info!("user records kept in memory");
            Ok(Arc::new(InMemoryAuthClient::new(Arc::new(UserStore::new())).with_default_role(role)))
        }
        BackendKind::Remote => {
            let timeout = Duration::from_secs(cfg.backend.timeout_secs);
            let client = RemoteAuthClient::new(cfg.backend.url.clone(), cfg.backend.admin_secret.clone(), timeout)
                .map_err(|e| StartupError::InvalidConfig(format!("backend client: {e}")))?;
            info!(url = %cfg.backend.url, "user records kept by the remote user service");
            Ok(Arc::new(client.with_default_role(role)))
        }
    }
}

/// Wire the configured backend and the auth pipelines.
pub fn build_state(cfg: &AppConfig) -> Result<ServerState, StartupError> {
    if cfg.auth.dev {
        warn!("auth.dev is set; never run this configuration in production");
    }
    let client = build_client(cfg)?;
    let auth_cfg = AuthConfig::new(cfg.auth.jwt_secret.clone()).with_token_ttl(cfg.auth.token_ttl_secs);
    Ok(ServerState::new(AuthService::new(client, auth_cfg)))
}

pub fn build_app(state: ServerState) -> Router {
    routes::build_router(state, build_cors())
}

/// Public entry: load config, build the app and serve until the listener fails.
pub async fn run() -> Result<(), StartupError> {
    dotenv().ok();
    init_logging_from_env();

    let cfg = AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let app = build_app(build_state(&cfg)?);

    let addr = bind_addr(&cfg)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr: addr.to_string(), source })?;
    info!(%addr, "auth front end listening");
    axum::serve(listener, app).await.map_err(anyhow::Error::from)?;
    Ok(())
}
