use thiserror::Error;

/// Failures while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Read(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Endpoint definitions that cannot be turned into routes. Any of these aborts startup.
#[derive(Debug, Error, PartialEq)]
pub enum BindError {
    #[error("Invalid method \"{method}\" for endpoint {path}")]
    InvalidMethod { method: String, path: String },
    #[error("Invalid status {status} for endpoint {path}")]
    InvalidStatus { status: u16, path: String },
    #[error("Invalid path \"{path}\": route paths must start with '/'")]
    InvalidPath { path: String },
}
