// Application state module
// Shared, read-only runtime state handed to every connection

use std::sync::Arc;
use std::time::Duration;

use super::types::Config;
use crate::fetch::Fetcher;
use crate::normalize::{CommandNormalizer, Normalizer};
use crate::storage::ArtifactStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub fetcher: Fetcher,
    pub artifacts: ArtifactStore,
    pub normalizer: Arc<dyn Normalizer>,
}

impl AppState {
    /// Build state with the command-backed normalizer from config
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let limit = match config.normalizer.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let normalizer =
            Arc::new(CommandNormalizer::new(config.normalizer.program.clone()).with_timeout(limit));
        Self::with_normalizer(config, normalizer)
    }

    pub fn with_normalizer(
        config: &Config,
        normalizer: Arc<dyn Normalizer>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            config: config.clone(),
            fetcher: Fetcher::new(&config.fetch, &config.http.server_name)?,
            artifacts: ArtifactStore::new(&config.storage),
            normalizer,
        })
    }
}
