//! Configuration data model.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default HTTP port the service listens on.
pub const DEFAULT_HTTP_PORT: u16 = 5001;
/// Default upload ceiling applied to request bodies (32 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;
/// Default directory holding the bundled per-target resources.
pub const DEFAULT_RESOURCES_DIR: &str = "bin";
/// Default log level when none is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Deployment mode of the service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    /// Local development: permissive CORS and verbose defaults.
    Development,
    /// Normal operational mode.
    #[default]
    Production,
}

impl FromStr for AppMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::invalid(
                crate::loader::env_keys::MODE,
                s,
                "must be 'development' or 'production'",
            )),
        }
    }
}

impl AppMode {
    /// Render the mode as its lowercase string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    /// Whether cross-origin requests are allowed from any origin.
    #[must_use]
    pub const fn permissive_cors(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Requested log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatChoice {
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
    /// Pretty for debug builds, JSON otherwise.
    #[default]
    Auto,
}

impl FromStr for LogFormatChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "auto" | "" => Ok(Self::Auto),
            _ => Err(ConfigError::invalid(
                crate::loader::env_keys::LOG_FORMAT,
                s,
                "must be 'json', 'pretty', or 'auto'",
            )),
        }
    }
}

/// Fully validated server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    /// Interface the HTTP listener binds to.
    pub bind_addr: IpAddr,
    /// Port the HTTP listener binds to.
    pub http_port: u16,
    /// Deployment mode.
    pub mode: AppMode,
    /// Root of the bundled per-target resources (`<root>/<target>/...`).
    pub resources_dir: PathBuf,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
    /// Upper bound on a single SDK tool invocation, if any.
    pub tool_timeout: Option<Duration>,
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormatChoice,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: DEFAULT_HTTP_PORT,
            mode: AppMode::default(),
            resources_dir: PathBuf::from(DEFAULT_RESOURCES_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            tool_timeout: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormatChoice::default(),
        }
    }
}

impl ServerConfig {
    /// Socket address the HTTP listener should bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}
