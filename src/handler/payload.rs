//! `POST /download_pdf` payload validation

use serde_json::Value;

use crate::error::ServiceError;

/// A validated download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
}

/// Parse the JSON body and pull out a non-empty string `url`.
///
/// Empty bodies, invalid JSON, non-objects, and a missing, null, non-string
/// or blank `url` are all the same client error. The URL itself is not
/// checked here; a bad one fails when it is fetched.
pub fn parse_download_request(body: &[u8]) -> Result<DownloadRequest, ServiceError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ServiceError::MissingUrl)?;

    match value.get("url").and_then(Value::as_str) {
        Some(url) if !url.trim().is_empty() => Ok(DownloadRequest {
            url: url.to_string(),
        }),
        _ => Err(ServiceError::MissingUrl),
    }
}
