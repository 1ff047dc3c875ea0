//! [`SupervisorBackend`](crate::SupervisorBackend) errors.

use crate::{connector::ClientError, monitor::MonitorError};
use alloy_primitives::ChainId;
use std::{fmt, path::PathBuf};
use supervisor_storage::StorageError;
use thiserror::Error;

/// Custom error type for the Supervisor core logic.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No chain endpoints are configured.
    #[error("no chain endpoints configured")]
    NoChains,

    /// Connecting to an endpoint or resolving its chain id failed.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// The configured endpoint.
        endpoint: String,
        /// The underlying client error.
        #[source]
        source: ClientError,
    },

    /// Two endpoints serve the same chain.
    #[error("chain {0} is configured more than once")]
    DuplicateChain(ChainId),

    /// The database directory of a chain could not be prepared.
    #[error("failed to prepare data directory {path}: {source}")]
    DataDir {
        /// The directory that was being created.
        path: PathBuf,
        /// The underlying io error.
        #[source]
        source: std::io::Error,
    },

    /// A log database operation failed.
    #[error("storage error on chain {chain_id}: {source}")]
    Storage {
        /// Chain whose database failed.
        chain_id: ChainId,
        /// The underlying storage error.
        #[source]
        source: StorageError,
    },

    /// A chain monitor failed.
    #[error("chain monitor error on chain {chain_id}: {source}")]
    Monitor {
        /// Chain whose monitor failed.
        chain_id: ChainId,
        /// The underlying monitor error.
        #[source]
        source: MonitorError,
    },

    /// `start` was called while running.
    #[error("supervisor already started")]
    AlreadyStarted,

    /// `stop` was called while stopped.
    #[error("supervisor already stopped")]
    AlreadyStopped,

    /// The backend released its databases and cannot be started again.
    #[error("supervisor is closed")]
    Closed,

    /// One or more teardown steps failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// A single failed teardown step.
#[derive(Debug, Error)]
pub enum ShutdownStepError {
    /// Stopping a chain monitor failed.
    #[error("stopping monitor of chain {chain_id}: {source}")]
    Monitor {
        /// Chain of the monitor.
        chain_id: ChainId,
        /// The monitor error.
        #[source]
        source: MonitorError,
    },

    /// Closing a log database failed.
    #[error("closing database of chain {chain_id}: {source}")]
    Storage {
        /// Chain of the database.
        chain_id: ChainId,
        /// The storage error.
        #[source]
        source: StorageError,
    },
}

/// Every failure collected while tearing the backend down.
#[derive(Debug, Error)]
pub struct ShutdownError(pub Vec<ShutdownStepError>);

impl ShutdownError {
    /// Returns the individual failures in the order they occurred.
    pub fn errors(&self) -> &[ShutdownStepError] {
        &self.0
    }
}

impl fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} shutdown step(s) failed", self.0.len())?;
        for err in &self.0 {
            write!(f, "; {err}")?;
        }
        Ok(())
    }
}
