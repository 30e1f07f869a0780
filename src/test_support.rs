//! Shared fixtures for unit tests: a throwaway upstream HTTP server, a
//! recording normalizer and state builders.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use crate::config::{AppState, Config};
use crate::error::NormalizeError;
use crate::normalize::Normalizer;

/// Upstream server answering request `n` with `responses[n]`; the last
/// response repeats once the list runs out.
pub struct Upstream {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl Upstream {
    pub async fn start(status: StatusCode, body: Vec<u8>) -> Self {
        Self::start_sequence(vec![(status, body)]).await
    }

    pub async fn start_sequence(responses: Vec<(StatusCode, Vec<u8>)>) -> Self {
        Self::spawn(responses, Duration::ZERO).await
    }

    /// Like [`Upstream::start`], but every response waits `delay` first
    pub async fn start_delayed(status: StatusCode, body: Vec<u8>, delay: Duration) -> Self {
        Self::spawn(vec![(status, body)], delay).await
    }

    async fn spawn(responses: Vec<(StatusCode, Vec<u8>)>, delay: Duration) -> Self {
        assert!(!responses.is_empty());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let responses = Arc::new(responses);
        let hits = Arc::new(AtomicUsize::new(0));

        let server_hits = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let responses = Arc::clone(&responses);
                let hits = Arc::clone(&server_hits);
                tokio::spawn(async move {
                    let service = service_fn(move |_req: Request<Incoming>| {
                        let n = hits.fetch_add(1, Ordering::SeqCst);
                        let (status, body) = responses[n.min(responses.len() - 1)].clone();
                        async move {
                            tokio::time::sleep(delay).await;
                            let mut resp = Response::new(Full::new(Bytes::from(body)));
                            *resp.status_mut() = status;
                            Ok::<_, Infallible>(resp)
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// A URL whose server accepts, reads the request, then hangs up without
/// answering
pub async fn hangup_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            drop(stream);
        }
    });
    format!("http://{addr}/file.pdf")
}

/// A URL nothing listens on: bind an ephemeral port, then release it
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

/// One recorded normalizer invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeCall {
    pub working_dir: PathBuf,
    pub input: String,
    pub output: String,
    /// Input file contents at call time
    pub input_bytes: Vec<u8>,
}

/// Normalizer double that records calls, optionally sleeps, and optionally
/// fails
#[derive(Default)]
pub struct RecordingNormalizer {
    fail: bool,
    delay: Duration,
    calls: Mutex<Vec<NormalizeCall>>,
}

impl RecordingNormalizer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<NormalizeCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Normalizer for RecordingNormalizer {
    async fn normalize(
        &self,
        working_dir: &Path,
        input: &str,
        output: &str,
    ) -> Result<(), NormalizeError> {
        tokio::time::sleep(self.delay).await;
        let input_bytes = std::fs::read(working_dir.join(input)).unwrap_or_default();
        self.calls.lock().unwrap().push(NormalizeCall {
            working_dir: working_dir.to_path_buf(),
            input: input.to_string(),
            output: output.to_string(),
            input_bytes,
        });
        if self.fail {
            Err(NormalizeError::Failed {
                program: PathBuf::from("recording-normalizer"),
                code: Some(2),
                stderr: "Error: could not parse document".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Default config with artifacts under `artifact_dir` and short timeouts
pub fn test_config(artifact_dir: &Path) -> Config {
    let mut config = Config::load_from("does-not-exist/pdfnorm").unwrap();
    config.storage.artifact_dir = artifact_dir.to_path_buf();
    config.fetch.timeout_secs = 5;
    config.fetch.connect_timeout_secs = 2;
    config.logging.access_log = false;
    config
}

pub fn test_state(config: &Config, normalizer: Arc<dyn Normalizer>) -> Arc<AppState> {
    Arc::new(AppState::with_normalizer(config, normalizer).unwrap())
}
