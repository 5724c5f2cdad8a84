use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

/// Secret used only when `auth.dev = true` and no secret is configured.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8000, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_role")]
    pub default_role: String,
    /// Local development: allow signing with [`DEV_JWT_SECRET`].
    #[serde(default)]
    pub dev: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl(),
            default_role: default_role(),
            dev: false,
        }
    }
}

fn default_token_ttl() -> u64 { 12 * 60 * 60 }
fn default_role() -> String { "user".into() }

/// Where user records live.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-lifetime map.
    #[default]
    Memory,
    /// GraphQL user service reached over HTTP.
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub admin_secret: String,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Memory,
            url: String::new(),
            admin_secret: String::new(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

fn default_backend_timeout() -> u64 { 10 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults plus
    /// environment variables when the file is missing.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.apply_env();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Environment variables override values read from the file.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(w) = std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        self.auth.normalize_from_env();
        self.backend.normalize_from_env();
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.auth.normalize()?;
        self.auth.validate()?;
        self.backend.validate()?;
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

fn env_flag(name: &str) -> Option<bool> {
    match std::env::var(name).ok()?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.trim().is_empty() {
                self.jwt_secret = secret;
            }
        }
        if let Some(ttl) = std::env::var("TOKEN_TTL_SECS").ok().and_then(|v| v.parse::<u64>().ok()) {
            self.token_ttl_secs = ttl;
        }
        if let Some(dev) = env_flag("AUTH_DEV") {
            self.dev = dev;
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            if !self.dev {
                return Err(anyhow!("auth.jwt_secret is empty; set it in config.toml or JWT_SECRET"));
            }
            self.jwt_secret = DEV_JWT_SECRET.to_string();
        }
        self.default_role = self.default_role.trim().to_string();
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.dev && self.jwt_secret == DEV_JWT_SECRET {
            return Err(anyhow!("auth.jwt_secret must not be the development default outside dev mode"));
        }
        if self.token_ttl_secs == 0 {
            return Err(anyhow!("auth.token_ttl_secs must be a positive number of seconds"));
        }
        if self.default_role.is_empty() {
            return Err(anyhow!("auth.default_role must not be empty"));
        }
        Ok(())
    }
}

impl BackendConfig {
    pub fn normalize_from_env(&mut self) {
        match std::env::var("AUTH_BACKEND").as_deref() {
            Ok("remote") => self.kind = BackendKind::Remote,
            Ok("memory") => self.kind = BackendKind::Memory,
            _ => {}
        }
        if let Ok(url) = std::env::var("HASURA_URL") {
            self.url = url;
        }
        if let Ok(secret) = std::env::var("HASURA_SECRET") {
            self.admin_secret = secret;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.kind != BackendKind::Remote {
            return Ok(());
        }
        let url = self.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!("backend.url must be an http(s) URL when backend.kind = \"remote\""));
        }
        if self.admin_secret.trim().is_empty() {
            return Err(anyhow!("backend.admin_secret is empty; set it in config.toml or HASURA_SECRET"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("backend.timeout_secs must be positive"));
        }
        Ok(())
    }
}
