use std::path::PathBuf;

/// Failures that prevent the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read bound address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value for {key}: {value}")]
    Env { key: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}
