// Server loop module
// Accepts connections until a shutdown is requested, then drains

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the accept loop.
///
/// Returns once `shutdown` is notified and in-flight connections have
/// finished, or `drain_timeout` has elapsed, whichever comes first.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<config::AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
    drain_timeout: Duration,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = shutdown.notified() => {
                break;
            }
        }
    }

    drop(listener);
    drain_connections(&active_connections, drain_timeout).await;
}

/// Wait for the active connection count to reach zero
async fn drain_connections(active_connections: &AtomicUsize, drain_timeout: Duration) {
    let deadline = tokio::time::Instant::now() + drain_timeout;

    loop {
        let remaining = active_connections.load(Ordering::SeqCst);
        if remaining == 0 {
            logger::log_info("All connections closed");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Drain timeout after {}s, abandoning {remaining} connection(s)",
                drain_timeout.as_secs()
            ));
            return;
        }
        logger::log_debug(&format!("Waiting for {remaining} connection(s) to finish"));
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
