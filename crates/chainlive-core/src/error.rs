//! Error types for the chainlive pipeline.

use thiserror::Error;

/// Errors that can occur while following the chain.
///
/// Malformed block fields never surface here: the summarizer recovers them
/// locally with documented defaults.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Connection-level failure talking to the upstream node (socket dropped,
    /// TLS failure, connect refused).
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The upstream answered with something the chain-sync protocol does not allow.
    #[error("Protocol error in '{method}': {reason}")]
    Protocol { method: String, reason: String },

    /// None of the requested points is on the upstream chain any more.
    #[error("No intersection with the upstream chain: {0}")]
    NoIntersection(String),

    #[error("Handler error in '{handler}': {reason}")]
    Handler { handler: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Returns `true` if a fresh connection is likely to succeed.
    ///
    /// The consumer never retries by itself; whoever owns the connection
    /// decides whether to reconnect.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::NoIntersection(_))
    }
}
