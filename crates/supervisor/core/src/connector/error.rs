use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to a chain node.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The endpoint could not be parsed into a URL.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// The configured endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The request failed in transport or returned an error response.
    #[error("rpc request failed: {0}")]
    Transport(String),

    /// The node did not answer in time.
    #[error("rpc request timed out after {0:?}")]
    Timeout(Duration),

    /// The node served a chain other than the one it was bound to.
    #[error("chain id mismatch, expected {expected}, got {got}")]
    ChainIdMismatch {
        /// Chain the client was created for.
        expected: u64,
        /// Chain the node reported.
        got: u64,
    },
}

impl ClientError {
    /// Returns `true` if retrying the same request may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}
