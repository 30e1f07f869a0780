//! Outbound download of the requested document
//!
//! One GET per request through a shared, pooled client. The whole body is
//! buffered before anything is written to disk.

use std::time::Duration;

use hyper::body::Bytes;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Leading bytes of every PDF file
const PDF_MAGIC: &[u8] = b"%PDF";

pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Build the shared client with the configured timeouts.
    /// Redirects follow the client's default policy.
    pub fn new(config: &FetchConfig, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Download `url` into memory. Non-2xx statuses are errors.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        Ok(response.bytes().await?)
    }
}

/// Whether `body` starts with the PDF header
pub fn looks_like_pdf(body: &[u8]) -> bool {
    body.starts_with(PDF_MAGIC)
}
