//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method and path matching,
//! common response headers, and access logging.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue, REFERER, SERVER, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode, Version};

use super::download;
use crate::config::AppState;
use crate::error::ServiceError;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::request_id::RequestId;

pub const INDEX_PATH: &str = "/";
pub const DOWNLOAD_PATH: &str = "/download_pdf";

const INDEX_BODY: &str = "Hello, World!";

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: &AppState,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let started = Instant::now();
    let mut entry = access_entry(&req, peer_addr);

    let (mut response, request_id) = route_request(req, state).await;

    if let Ok(value) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, value);
    }

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.elapsed = started.elapsed();
        entry.request_id = request_id.map(|id| id.to_string());
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Dispatch on method and path. Returns the request id when the download
/// pipeline ran.
async fn route_request<B>(
    req: Request<B>,
    state: &AppState,
) -> (Response<Full<Bytes>>, Option<RequestId>)
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match (req.method(), req.uri().path()) {
        (&Method::GET | &Method::HEAD, INDEX_PATH) => {
            (http::build_text_response(StatusCode::OK, INDEX_BODY), None)
        }
        (_, INDEX_PATH) => (http::build_405_response("GET, HEAD"), None),
        (&Method::POST, DOWNLOAD_PATH) => {
            if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
                return (resp, None);
            }
            let (resp, id) = download::handle_download(req, state).await;
            (resp, Some(id))
        }
        (_, DOWNLOAD_PATH) => (http::build_405_response("POST"), None),
        _ => (http::build_404_response(), None),
    }
}

/// Validate Content-Length header against max body size
/// Returns Some(413 response) if too large, None otherwise
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_error_response(&ServiceError::PayloadTooLarge {
                    max: max_body_size,
                }))
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
