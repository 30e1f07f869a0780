// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub fetch: FetchConfig,
    pub normalizer: NormalizerConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level written: error, warn, info or debug
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// Where downloaded artifacts live and what they are called
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub artifact_dir: PathBuf,
    pub input_file_name: String,
    pub output_file_name: String,
    /// Give every request its own `<artifact_dir>/<request-id>/` workspace.
    /// When false all requests share `<artifact_dir>/` and race on one file.
    pub unique_per_request: bool,
}

/// Outbound download settings
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Reject bodies that do not start with `%PDF`
    pub require_pdf_magic: bool,
}

/// External normalization tool
#[derive(Debug, Deserialize, Clone)]
pub struct NormalizerConfig {
    pub program: PathBuf,
    /// Fail the request when the tool cannot be spawned, exits non-zero or
    /// runs out of time
    pub required: bool,
    /// Kill the tool after this many seconds; 0 disables the limit
    pub timeout_secs: u64,
}
