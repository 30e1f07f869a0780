//! Request handler module
//!
//! Routing, payload validation and the download pipeline.

pub mod download;
pub mod payload;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
