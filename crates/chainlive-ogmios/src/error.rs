//! Transport-level error types.

use chainlive_core::error::PipelineError;
use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur while talking to Ogmios.
#[derive(Debug, Error)]
pub enum TransportError {
    /// WebSocket connection/send/receive error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// JSON-RPC error returned by Ogmios.
    #[error("RPC error in '{method}': {error}")]
    Rpc { method: String, error: JsonRpcError },

    /// None of the requested points is on the chain any more.
    #[error("No intersection found: {0}")]
    IntersectionNotFound(String),

    /// The result did not have the shape the method promises.
    #[error("Unexpected '{method}' response: {reason}")]
    UnexpectedResponse { method: String, reason: String },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The connection closed while a request was outstanding.
    #[error("Connection closed by upstream")]
    Closed,
}

impl TransportError {
    /// Returns `true` if reconnecting is likely to help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::WebSocket(_) | Self::Closed | Self::IntersectionNotFound(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(e.to_string())
    }
}

impl From<TransportError> for PipelineError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::WebSocket(_) | TransportError::Closed => {
                PipelineError::Upstream(e.to_string())
            }
            TransportError::Rpc { method, error } => PipelineError::Protocol {
                method,
                reason: error.to_string(),
            },
            TransportError::IntersectionNotFound(reason) => PipelineError::NoIntersection(reason),
            TransportError::UnexpectedResponse { method, reason } => {
                PipelineError::Protocol { method, reason }
            }
            TransportError::Deserialization(e) => PipelineError::Protocol {
                method: "response".into(),
                reason: e.to_string(),
            },
        }
    }
}
