use crate::{StorageError, models::SafetyHeadRefKey};
use std::fmt::Debug;
use supervisor_types::{BlockInfo, ChainHeads, Log};

/// Provides an interface for reading the logs and blocks recorded for one chain.
///
/// Implementations are expected to provide persistent and thread-safe access, and every
/// call observes a consistent snapshot.
pub trait LogStorageReader: Debug {
    /// Returns the latest block recorded in storage.
    ///
    /// Fails with [`StorageError::DatabaseNotInitialised`] if nothing was recorded yet.
    fn get_latest_block(&self) -> Result<BlockInfo, StorageError>;

    /// Returns the block recorded at `block_number`.
    fn get_block(&self, block_number: u64) -> Result<BlockInfo, StorageError>;

    /// Returns the log at `log_index` within block `block_number`.
    fn get_log(&self, block_number: u64, log_index: u32) -> Result<Log, StorageError>;

    /// Returns all logs of block `block_number` ordered by index.
    fn get_logs(&self, block_number: u64) -> Result<Vec<Log>, StorageError>;

    /// Returns the latest checkpoint at or below `block_number`.
    ///
    /// Querying with [`u64::MAX`] yields the most recent checkpoint.
    fn closest_block_info(&self, block_number: u64) -> Result<BlockInfo, StorageError>;
}

/// Provides an interface for appending blocks and their logs.
pub trait LogStorageWriter: Send + Sync + Debug {
    /// Records the designated start block of an empty store, together with its logs.
    ///
    /// The anchor is always checkpointed. Calling this again with the same anchor is a no-op.
    fn initialise_log_storage(&self, block: BlockInfo, logs: Vec<Log>) -> Result<(), StorageError>;

    /// Appends the next block and its logs.
    ///
    /// # Errors
    /// * [`StorageError::SequenceGap`] unless `block.number` directly follows the latest block.
    /// * [`StorageError::HashMismatch`] if `block.parent_hash` is not the latest block's hash.
    /// * [`StorageError::DatabaseNotInitialised`] if the store has no anchor yet.
    fn store_block_logs(&self, block: &BlockInfo, logs: Vec<Log>) -> Result<(), StorageError>;
}

/// Combines [`LogStorageReader`] and [`LogStorageWriter`].
pub trait LogStorage: LogStorageReader + LogStorageWriter {}

impl<T: LogStorageReader + LogStorageWriter> LogStorage for T {}

/// Provides access to the head references reported by the chain.
pub trait HeadRefStorageReader: Debug {
    /// Returns the recorded head for `key`, or [`StorageError::FutureData`] if none.
    fn get_safety_head_ref(&self, key: SafetyHeadRefKey) -> Result<BlockInfo, StorageError>;

    /// Returns all reference points of the chain from a single snapshot.
    fn get_chain_heads(&self) -> Result<ChainHeads, StorageError>;
}

/// Moves head references forward.
pub trait HeadRefStorageWriter: Debug {
    /// Records `block` as the head for `key`.
    ///
    /// The block must already be recorded with the same hash, otherwise
    /// [`StorageError::ConflictError`] is returned. Older blocks than the current head are
    /// ignored.
    fn update_safety_head_ref(
        &self,
        key: SafetyHeadRefKey,
        block: &BlockInfo,
    ) -> Result<(), StorageError>;
}

/// Combines [`HeadRefStorageReader`] and [`HeadRefStorageWriter`].
pub trait HeadRefStorage: HeadRefStorageReader + HeadRefStorageWriter {}

impl<T: HeadRefStorageReader + HeadRefStorageWriter> HeadRefStorage for T {}

/// Lookups that read an entry together with the chain heads used to classify it.
pub trait SafetySnapshotReader: Debug {
    /// Returns the block at `block_number` and the chain heads.
    fn block_with_heads(&self, block_number: u64) -> Result<(BlockInfo, ChainHeads), StorageError>;

    /// Returns the log at `(block_number, log_index)`, its block and the chain heads.
    fn log_with_heads(
        &self,
        block_number: u64,
        log_index: u32,
    ) -> Result<(BlockInfo, Log, ChainHeads), StorageError>;
}

/// Truncates storage back to a prior block.
pub trait StorageRewinder {
    /// Removes every record for blocks above `to`, atomically.
    ///
    /// Afterwards `to` is the latest block and the latest checkpoint, and safety heads ahead
    /// of it are pulled back. A target at or above the latest block changes nothing; a target
    /// below the anchor empties the store.
    fn rewind(&self, to: u64) -> Result<(), StorageError>;
}

/// Everything a chain monitor needs from its database.
pub trait ChainStorage:
    LogStorage + HeadRefStorage + StorageRewinder + Send + Sync + 'static
{
}

impl<T: LogStorage + HeadRefStorage + StorageRewinder + Send + Sync + 'static> ChainStorage for T {}
