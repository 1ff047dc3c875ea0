use crate::connector::ClientError;
use alloy_primitives::ChainId;
use supervisor_storage::StorageError;
use thiserror::Error;

/// Errors of a [`ChainMonitor`](super::ChainMonitor) and its ingestion task.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// `start` was called on a running monitor.
    #[error("chain monitor {0} already started")]
    AlreadyStarted(ChainId),

    /// `stop` was called on a monitor that is not running.
    #[error("chain monitor {0} is not running")]
    NotRunning(ChainId),

    /// The chain node failed to answer.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The log database rejected a read or write.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The anchor block is no longer part of the canonical chain.
    #[error("chain {chain_id} no longer contains anchor block {anchor}")]
    IncompatibleHistory {
        /// Chain that diverged.
        chain_id: ChainId,
        /// Number of the first recorded block.
        anchor: u64,
    },

    /// The ingestion task panicked or was aborted.
    #[error("ingestion task of chain {0} terminated abnormally")]
    TaskPanicked(ChainId),
}

impl MonitorError {
    /// Returns `true` if the ingestion loop should retry instead of terminating.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Client(err) => err.is_transient(),
            _ => false,
        }
    }
}
