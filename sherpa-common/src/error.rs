//! Common error types for Sherpa Studio

use thiserror::Error;

/// Common result type for Sherpa Studio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy shared by the client and the dashboard.
///
/// All of these are absorbed at the boundary where they occur and turned
/// into an empty/neutral result plus a log line; none terminate a session.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad credentials or unreachable server; surfaces as "not logged in"
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Project/annotator/label fetch failed; surfaces as an empty list
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Remote annotate call failed; surfaces as a "no result" panel
    #[error("Annotation failed: {0}")]
    Annotation(String),

    /// HTTP transport error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
