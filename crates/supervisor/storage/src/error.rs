use alloy_primitives::B256;
use reth_db::DatabaseError;
use thiserror::Error;

/// Errors that may occur while interacting with the log database.
///
/// [`StorageError::SequenceGap`], [`StorageError::HashMismatch`] and
/// [`StorageError::ConflictError`] point at a bug in the writer and should not occur under
/// correct ingestion. [`StorageError::EntryNotFound`] and
/// [`StorageError::DatabaseNotInitialised`] are expected absence.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Represents a database error that occurred while interacting with storage.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Represents an error that occurred while initializing the database.
    #[error(transparent)]
    DatabaseInit(#[from] eyre::Report),

    /// The lock guarding the database handle was poisoned.
    #[error("lock poisoned")]
    LockPoisoned,

    /// The expected entry was not found in the database.
    #[error(transparent)]
    EntryNotFound(#[from] EntryNotFoundError),

    /// The requested head reference has not been recorded yet.
    #[error("data not yet available")]
    FutureData,

    /// The database holds no blocks yet.
    #[error("database not initialized")]
    DatabaseNotInitialised,

    /// Incoming data conflicts with what is already stored.
    #[error("conflicting data")]
    ConflictError,

    /// The appended block does not directly follow the latest stored block.
    #[error("block sequence gap: expected block {expected}, got {got}")]
    SequenceGap {
        /// The only block number that may be appended next.
        expected: u64,
        /// The block number that was offered.
        got: u64,
    },

    /// The appended block does not link to the latest stored block.
    #[error("parent hash mismatch: expected {expected}, got {got}")]
    HashMismatch {
        /// Hash of the latest stored block.
        expected: B256,
        /// Parent hash carried by the incoming block.
        got: B256,
    },

    /// The database has been closed.
    #[error("database closed")]
    Closed,
}

impl StorageError {
    /// Returns `true` if the error signals absent data rather than a failure.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound(_) | Self::DatabaseNotInitialised | Self::FutureData)
    }
}

impl PartialEq for StorageError {
    fn eq(&self, other: &Self) -> bool {
        use StorageError::*;
        match (self, other) {
            (Database(a), Database(b)) => a == b,
            (DatabaseInit(a), DatabaseInit(b)) => format!("{a}") == format!("{b}"),
            (EntryNotFound(a), EntryNotFound(b)) => a == b,
            (
                SequenceGap { expected: e1, got: g1 },
                SequenceGap { expected: e2, got: g2 },
            ) => e1 == e2 && g1 == g2,
            (
                HashMismatch { expected: e1, got: g1 },
                HashMismatch { expected: e2, got: g2 },
            ) => e1 == e2 && g1 == g2,
            (LockPoisoned, LockPoisoned) |
            (FutureData, FutureData) |
            (DatabaseNotInitialised, DatabaseNotInitialised) |
            (ConflictError, ConflictError) |
            (Closed, Closed) => true,
            _ => false,
        }
    }
}

impl Eq for StorageError {}

/// Entry not found error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryNotFoundError {
    /// Expected block not found.
    #[error("block not found, number: {0}")]
    BlockNotFound(u64),

    /// Expected log not found.
    #[error("log not found at block {block_number} index {log_index}")]
    LogNotFound {
        /// Block number.
        block_number: u64,
        /// Log index within the block.
        log_index: u32,
    },

    /// No checkpoint at or below the requested block.
    #[error("no checkpoint at or below block {0}")]
    CheckpointNotFound(u64),
}
