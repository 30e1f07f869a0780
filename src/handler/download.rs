//! `POST /download_pdf`
//!
//! Linear pipeline: validate payload, fetch, prepare the workspace, persist,
//! normalize. Every failure maps to a JSON error response.

use std::error::Error as StdError;
use std::path::PathBuf;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::HeaderValue;
use hyper::{Request, Response};

use super::payload::parse_download_request;
use crate::config::AppState;
use crate::error::ServiceError;
use crate::fetch::looks_like_pdf;
use crate::http;
use crate::logger;
use crate::request_id::{RequestId, REQUEST_ID_HEADER};

pub const SUCCESS_MESSAGE: &str = "PDF downloaded and processed successfully";

/// What a successful run produced
#[derive(Debug)]
pub struct DownloadOutcome {
    /// Where the downloaded bytes were written
    pub artifact: PathBuf,
    /// Where the normalizer was told to write
    pub normalized_path: PathBuf,
    pub bytes: usize,
    /// False when an optional normalizer failed
    pub normalized: bool,
}

/// Handle the HTTP request: read the body, run the pipeline, build the
/// response. Always answers; the request id goes in `X-Request-Id`.
pub async fn handle_download<B>(req: Request<B>, state: &AppState) -> (Response<Full<Bytes>>, RequestId)
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let request_id = RequestId::new();
    let max_body_size = state.config.http.max_body_size;

    let result = match read_body(req.into_body(), max_body_size).await {
        Ok(body) => download_pdf(state, &request_id, &body).await,
        Err(e) => Err(e),
    };

    let mut response = match result {
        Ok(outcome) => {
            logger::log_info(&format!(
                "[{request_id}] Stored {} bytes at {} (normalized: {}, output: {})",
                outcome.bytes,
                outcome.artifact.display(),
                outcome.normalized,
                outcome.normalized_path.display()
            ));
            http::build_message_response(SUCCESS_MESSAGE)
        }
        Err(e) => {
            log_failure(&request_id, &e);
            http::build_error_response(&e)
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    (response, request_id)
}

/// Run the pipeline for an already-read request body
pub async fn download_pdf(
    state: &AppState,
    request_id: &RequestId,
    body: &[u8],
) -> Result<DownloadOutcome, ServiceError> {
    let request = parse_download_request(body)?;

    logger::log_debug(&format!("[{request_id}] Fetching {}", request.url));
    let bytes = state.fetcher.fetch(&request.url).await?;

    if state.config.fetch.require_pdf_magic && !looks_like_pdf(&bytes) {
        return Err(ServiceError::NotAPdf);
    }

    // only a usable download gets a directory
    let workspace = state.artifacts.workspace_for(request_id);
    workspace
        .prepare()
        .await
        .map_err(|source| ServiceError::Storage {
            path: workspace.dir().to_path_buf(),
            source,
        })?;

    let artifact = workspace
        .write_input(&bytes)
        .await
        .map_err(|source| ServiceError::Storage {
            path: workspace.input_path(),
            source,
        })?;

    logger::log_debug(&format!(
        "[{request_id}] Normalizing {} -> {} in {}",
        workspace.input_name(),
        workspace.output_name(),
        workspace.dir().display()
    ));
    let normalized = match state
        .normalizer
        .normalize(workspace.dir(), workspace.input_name(), workspace.output_name())
        .await
    {
        Ok(()) => true,
        Err(e) if !state.config.normalizer.required => {
            logger::log_warning(&format!("[{request_id}] Normalization failed (ignored): {e}"));
            false
        }
        Err(e) => return Err(e.into()),
    };

    Ok(DownloadOutcome {
        artifact,
        normalized_path: workspace.output_path(),
        bytes: bytes.len(),
        normalized,
    })
}

/// Collect the body, refusing anything over `max` bytes
async fn read_body<B>(body: B, max: u64) -> Result<Bytes, ServiceError>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let limit = usize::try_from(max).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ServiceError::PayloadTooLarge { max }),
        Err(e) => Err(ServiceError::BodyRead(e.to_string())),
    }
}

fn log_failure(request_id: &RequestId, err: &ServiceError) {
    let mut message = format!("[{request_id}] {} ({}): {err}", err.status(), err.kind());
    if let ServiceError::Fetch(fetch) = err {
        if let Some(upstream) = fetch.upstream_status() {
            message.push_str(&format!(" [upstream {upstream}]"));
        }
    }
    if err.status().is_server_error() {
        logger::log_error(&message);
    } else {
        logger::log_warning(&message);
    }
}
