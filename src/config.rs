//! Server configuration.
//!
//! Values come from built-in defaults, then an optional YAML file, then
//! environment variables. Later sources win.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable naming a YAML config file.
pub const CONFIG_PATH_VAR: &str = "RAWFRAME_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Interface to bind.
    pub host: String,
    /// Port to bind; 0 picks a free port.
    pub port: u16,
    /// Upper bound on a buffered request, headers and body together.
    pub max_request_bytes: usize,
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_request_bytes: 8 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// `path` (typically the first CLI argument) takes precedence over
    /// `RAWFRAME_CONFIG` when both name a file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var(CONFIG_PATH_VAR).ok();
        let path = path.map(Path::to_path_buf).or(from_env.map(PathBuf::from));

        let base = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };

        base.with_env(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Applies `HOST`, `PORT`, `RAWFRAME_MAX_REQUEST_BYTES` and `LOG_LEVEL`
    /// overrides looked up through `var`.
    pub fn with_env<F>(mut self, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(port) = var("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { key: "PORT", value: port })?;
        }
        if let Some(max) = var("RAWFRAME_MAX_REQUEST_BYTES") {
            self.max_request_bytes = max.trim().parse().map_err(|_| ConfigError::Env {
                key: "RAWFRAME_MAX_REQUEST_BYTES",
                value: max,
            })?;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = level;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_request_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
