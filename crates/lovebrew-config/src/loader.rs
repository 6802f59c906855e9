//! Environment-backed configuration loader.

use tracing::debug;

use crate::error::ConfigResult;
use crate::model::ServerConfig;
use crate::validate::{
    parse_ip, parse_non_empty, parse_path, parse_port, parse_positive_usize, parse_timeout_secs,
};

/// Prefix shared by every configuration variable.
pub const ENV_PREFIX: &str = "LOVEBREW_";

/// Environment variable names understood by the loader.
pub mod env_keys {
    /// Listener interface.
    pub const BIND_ADDR: &str = "LOVEBREW_BIND_ADDR";
    /// Listener port.
    pub const HTTP_PORT: &str = "LOVEBREW_HTTP_PORT";
    /// Deployment mode.
    pub const MODE: &str = "LOVEBREW_MODE";
    /// Bundled resources root.
    pub const RESOURCES_DIR: &str = "LOVEBREW_RESOURCES_DIR";
    /// Request body ceiling.
    pub const MAX_UPLOAD_BYTES: &str = "LOVEBREW_MAX_UPLOAD_BYTES";
    /// Per-tool timeout in seconds.
    pub const TOOL_TIMEOUT_SECS: &str = "LOVEBREW_TOOL_TIMEOUT_SECS";
    /// Log level.
    pub const LOG_LEVEL: &str = "LOVEBREW_LOG_LEVEL";
    /// Log format.
    pub const LOG_FORMAT: &str = "LOVEBREW_LOG_FORMAT";
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when any variable is present but invalid.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to their defaults; set keys must parse.
    ///
    /// # Errors
    ///
    /// Returns an error when any variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(env_keys::BIND_ADDR) {
            config.bind_addr = parse_ip(env_keys::BIND_ADDR, &raw)?;
        }
        if let Some(raw) = lookup(env_keys::HTTP_PORT) {
            config.http_port = parse_port(env_keys::HTTP_PORT, &raw)?;
        }
        if let Some(raw) = lookup(env_keys::MODE) {
            config.mode = raw.parse()?;
        }
        if let Some(raw) = lookup(env_keys::RESOURCES_DIR) {
            config.resources_dir = parse_path(env_keys::RESOURCES_DIR, &raw)?;
        }
        if let Some(raw) = lookup(env_keys::MAX_UPLOAD_BYTES) {
            config.max_upload_bytes = parse_positive_usize(env_keys::MAX_UPLOAD_BYTES, &raw)?;
        }
        if let Some(raw) = lookup(env_keys::TOOL_TIMEOUT_SECS) {
            config.tool_timeout = Some(parse_timeout_secs(env_keys::TOOL_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = lookup(env_keys::LOG_LEVEL) {
            config.log_level = parse_non_empty(env_keys::LOG_LEVEL, &raw)?;
        }
        if let Some(raw) = lookup(env_keys::LOG_FORMAT) {
            config.log_format = raw.parse()?;
        }

        debug!(
            mode = config.mode.as_str(),
            port = config.http_port,
            resources = %config.resources_dir.display(),
            "configuration loaded"
        );
        Ok(config)
    }
}
