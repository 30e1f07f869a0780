// Configuration module entry point
// Loads layered configuration and owns the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, FetchConfig, StorageConfig};

/// Default config file, resolved without extension by the `config` crate
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Prefix for environment overrides, e.g. `PDFNORM_SERVER__PORT=8080`
const ENV_PREFIX: &str = "PDFNORM";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Missing files are fine; defaults cover every key
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::load_layered(config_path, environment())
    }

    fn load_layered(
        config_path: &str,
        env: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(env)
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 60)?
            .set_default("performance.write_timeout", 60)?
            .set_default("http.server_name", "pdfnorm-server")?
            .set_default("http.max_body_size", 65_536)? // 64KB of JSON is plenty
            .set_default("storage.artifact_dir", "build")?
            .set_default("storage.input_file_name", "downloaded.pdf")?
            .set_default("storage.output_file_name", "normed.pdf")?
            .set_default("storage.unique_per_request", true)?
            .set_default("fetch.timeout_secs", 30)?
            .set_default("fetch.connect_timeout_secs", 10)?
            .set_default("fetch.require_pdf_magic", false)?
            .set_default("normalizer.program", "/app/build/normCPP")?
            .set_default("normalizer.required", true)?
            .set_default("normalizer.timeout_secs", 120)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// `PDFNORM_` then `__` between nested keys
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

/// Pick the config path from `-c <path>` / `--config <path>`, falling back to
/// [`DEFAULT_CONFIG_PATH`]
pub fn config_path_from_args<I>(args: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "-c" || arg == "--config" {
            if let Some(path) = args.next() {
                return path;
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}
