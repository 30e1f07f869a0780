//! Error types for the download pipeline
//!
//! [`ServiceError`] is what a request can fail with; it knows its HTTP status
//! and renders as `{"error": "<message>"}`. The fetch and normalization steps
//! keep their own enums so logs can say which kind of failure happened while
//! the response carries the underlying message.

use std::error::Error as StdError;
use std::path::PathBuf;

use hyper::StatusCode;
use thiserror::Error;

/// Message returned when the payload has no usable `url` field
pub const MISSING_URL_MESSAGE: &str = "Missing URL";

/// Every way `POST /download_pdf` can fail
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{}", MISSING_URL_MESSAGE)]
    MissingUrl,

    #[error("Request body too large (max {max} bytes)")]
    PayloadTooLarge { max: u64 },

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Downloaded content is not a PDF")]
    NotAPdf,

    #[error("Failed to store download at '{}': {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Normalization failed: {0}")]
    Normalize(#[from] NormalizeError),
}

impl ServiceError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingUrl | Self::BodyRead(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotAPdf => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Fetch(_) | Self::Storage { .. } | Self::Normalize(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label for log lines
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingUrl => "missing_url",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::BodyRead(_) => "body_read",
            Self::Fetch(e) => e.kind(),
            Self::NotAPdf => "not_a_pdf",
            Self::Storage { .. } => "storage",
            Self::Normalize(_) => "normalize",
        }
    }
}

/// Outbound download failures, classified from the HTTP client error.
///
/// Display is the client's own message followed by its source chain, so the
/// caller sees e.g. the OS "Connection refused" text verbatim.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{}", render_chain(.0))]
    InvalidUrl(#[source] reqwest::Error),

    #[error("{}", render_chain(.0))]
    Timeout(#[source] reqwest::Error),

    #[error("{}", render_chain(.0))]
    Connect(#[source] reqwest::Error),

    #[error("{}", render_chain(.0))]
    Status(#[source] reqwest::Error),

    #[error("{}", render_chain(.0))]
    Transport(#[source] reqwest::Error),
}

impl FetchError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "fetch_invalid_url",
            Self::Timeout(_) => "fetch_timeout",
            Self::Connect(_) => "fetch_connect",
            Self::Status(_) => "fetch_status",
            Self::Transport(_) => "fetch_transport",
        }
    }

    /// Upstream status for `Status` errors
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(e) => e.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // builder errors first (never sent), then timeout before connect:
        // a connect timeout also reports is_connect()
        if err.is_builder() {
            Self::InvalidUrl(err)
        } else if err.is_timeout() {
            Self::Timeout(err)
        } else if err.is_status() {
            Self::Status(err)
        } else if err.is_connect() {
            Self::Connect(err)
        } else {
            Self::Transport(err)
        }
    }
}

/// Failures of the external normalization tool
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("could not start '{}': {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' exited with {}{}", .program.display(), describe_code(.code), describe_stderr(.stderr))]
    Failed {
        program: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{}' did not finish within {secs}s and was killed", .program.display())]
    Timeout { program: PathBuf, secs: u64 },
}

#[allow(clippy::ref_option)]
fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("code {c}"))
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Join an error with all of its sources, skipping repeated messages
pub fn render_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
