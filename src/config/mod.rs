use std::fmt;
use std::path::Path;
use std::str::FromStr;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
/// The HTTP method an endpoint accepts
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "get",
            HttpMethod::POST => "post",
            HttpMethod::PUT => "put",
            HttpMethod::PATCH => "patch",
            HttpMethod::DELETE => "delete",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    /// Methods are matched case-insensitively; the error carries the normalized (lowercase) input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = s.to_lowercase();
        match method.as_str() {
            "get" => Ok(HttpMethod::GET),
            "post" => Ok(HttpMethod::POST),
            "put" => Ok(HttpMethod::PUT),
            "patch" => Ok(HttpMethod::PATCH),
            "delete" => Ok(HttpMethod::DELETE),
            _ => Err(method),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy, JsonSchema)]
#[serde(rename_all = "lowercase")]
/// The log level that the server should use
pub enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy, JsonSchema)]
#[serde(rename_all = "lowercase")]
/// How log lines are rendered
pub enum LogFormat {
    Pretty,
    Compact,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, JsonSchema)]
pub struct Config {
    /// The list of endpoints that the server should expose
    pub endpoints: Vec<EndpointSpec>,
    /// Basic logging configuration
    pub logging: Option<Logging>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, JsonSchema)]
pub struct EndpointSpec {
    /// The route template, e.g. `/items/` or `/items/:id`
    pub path: String,
    #[serde(default = "default_endpoint_method")]
    /// The method that the endpoint should accept; validated case-insensitively at startup
    pub method: String,
    #[serde(default = "default_endpoint_status")]
    /// The status code returned when the request succeeds
    pub status: u16,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, JsonSchema)]
pub struct Logging {
    #[serde(default = "default_logging_format")]
    /// The format that the logs should be output in
    pub format: LogFormat,
    #[serde(default = "default_logging_level")]
    /// The log level that the server should use
    pub level: LogLevel,
}

fn default_endpoint_method() -> String {
    "GET".to_string()
}
fn default_endpoint_status() -> u16 {
    200
}
fn default_logging_format() -> LogFormat {
    LogFormat::Pretty
}
fn default_logging_level() -> LogLevel {
    LogLevel::INFO
}

/// Reads a mock configuration from disk. YAML is used for `.yaml`/`.yml` files, JSON otherwise.
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );

    if is_yaml {
        Ok(serde_yaml::from_str(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}

pub fn generate_schema() -> Result<String, serde_json::Error> {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema)
}
