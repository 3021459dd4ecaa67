// Configuration types module
// Mirrors the sections of config.toml

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub performance: PerformanceConfig,
    pub middleware: MiddlewareConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads; runtime default when unset
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Diagnostics file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Value of the `Server` response header
    pub server_name: String,
    /// Upper bound for buffered JSON bodies, in bytes
    pub max_body_size: usize,
    /// Per-request deadline; 0 disables it
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Idle or slow connections are closed after this many seconds; 0 disables it
    pub connection_timeout_secs: u64,
    #[serde(default)]
    pub max_connections: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MiddlewareConfig {
    pub security_headers: bool,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub session: SessionConfig,
    /// Directory served by the static file middleware; disabled when unset
    #[serde(default)]
    pub static_dir: Option<String>,
    pub index_files: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origin: String,
    pub methods: String,
    pub headers: String,
    pub credentials: bool,
    #[serde(default)]
    pub expose_headers: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window_secs: u64,
    pub max: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub enabled: bool,
    pub cookie_name: String,
    /// Idle lifetime of a session; sessions never expire when unset
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

/// Argon2id cost of the demo's stored passwords
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
}
