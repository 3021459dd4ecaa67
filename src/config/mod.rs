// Configuration module entry point
// Layered loading: optional file, then SWITCHYARD__* environment, then defaults

mod types;

use std::net::SocketAddr;
use std::time::Duration;

pub use types::{
    AuthConfig, Config, CorsConfig, HttpConfig, LoggingConfig, MiddlewareConfig,
    PerformanceConfig, RateLimitConfig, ServerConfig, SessionConfig,
};

use crate::error::ServerError;
use crate::routing::DispatchLimits;

/// Default config file, resolved with any supported extension
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Prefix of environment overrides, e.g. `SWITCHYARD__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "SWITCHYARD";

impl Config {
    /// Load configuration from the default file name
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from `config_path` (extension optional, file optional)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("middleware.index_files"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("http.server_name", "switchyard/0.1")?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("http.request_timeout_secs", 30)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout_secs", 60)?
            .set_default("middleware.security_headers", true)?
            .set_default("middleware.cors.enabled", true)?
            .set_default("middleware.cors.origin", "*")?
            .set_default("middleware.cors.methods", "GET,POST,PUT,DELETE,PATCH,OPTIONS")?
            .set_default("middleware.cors.headers", "Content-Type,Authorization")?
            .set_default("middleware.cors.credentials", false)?
            .set_default("middleware.cors.expose_headers", "")?
            .set_default("middleware.rate_limit.enabled", true)?
            .set_default("middleware.rate_limit.window_secs", 60)?
            .set_default("middleware.rate_limit.max", 60)?
            .set_default("middleware.session.enabled", true)?
            .set_default("middleware.session.cookie_name", "sid")?
            .set_default("middleware.index_files", vec!["index.html"])?
            .set_default("auth.hash_memory_kib", 19_456)?
            .set_default("auth.hash_iterations", 2)?
            .set_default("auth.hash_parallelism", 1)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| ServerError::Address { addr, source })
    }

    /// Bounds applied to every request dispatched by the application router
    pub const fn dispatch_limits(&self) -> DispatchLimits {
        DispatchLimits {
            max_body_size: self.http.max_body_size,
            request_timeout: seconds(self.http.request_timeout_secs),
        }
    }

    pub const fn connection_timeout(&self) -> Option<Duration> {
        seconds(self.performance.connection_timeout_secs)
    }
}

/// Zero means "no limit"
const fn seconds(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_config(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{name}-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load_from("/nonexistent/switchyard-config").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.access_log_format, "combined");
        assert_eq!(config.middleware.cors.origin, "*");
        assert_eq!(config.middleware.rate_limit.max, 60);
        assert_eq!(config.middleware.session.cookie_name, "sid");
        assert_eq!(config.middleware.index_files, ["index.html"]);
        assert!(config.middleware.static_dir.is_none());
        assert_eq!(
            config.dispatch_limits(),
            DispatchLimits {
                max_body_size: 1_048_576,
                request_timeout: Some(Duration::from_secs(30)),
            }
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = write_temp_config(
            "switchyard-override",
            r#"
[server]
host = "0.0.0.0"
port = 9090
workers = 2

[http]
request_timeout_secs = 0

[middleware]
static_dir = "public"

[middleware.rate_limit]
max = 5
"#,
        );
        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.server.workers, Some(2));
        assert_eq!(config.socket_addr().unwrap().port(), 9090);
        assert_eq!(config.middleware.rate_limit.max, 5);
        assert_eq!(config.middleware.rate_limit.window_secs, 60);
        assert_eq!(config.middleware.static_dir.as_deref(), Some("public"));
        assert_eq!(config.dispatch_limits().request_timeout, None);
        assert_eq!(config.auth.hash_iterations, 2);
    }

    #[test]
    fn test_invalid_host_is_reported() {
        let mut config = Config::load_from("/nonexistent/switchyard-config").unwrap();
        config.server.host = "not an ip".to_string();
        assert!(matches!(
            config.socket_addr(),
            Err(ServerError::Address { .. })
        ));
    }
}
