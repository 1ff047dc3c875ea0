//! Main database access structure and transaction contexts.

use crate::{
    error::StorageError,
    models::SafetyHeadRefKey,
    providers::{CheckpointProvider, LogProvider, SafetyHeadRefProvider},
    traits::{
        HeadRefStorageReader, HeadRefStorageWriter, LogStorageReader, LogStorageWriter,
        SafetySnapshotReader, StorageRewinder,
    },
};
use alloy_primitives::ChainId;
use reth_db::{
    DatabaseEnv,
    mdbx::{DatabaseArguments, init_db_for},
};
use reth_db_api::{database::Database, transaction::DbTx};
use std::{path::Path, sync::RwLock};
use supervisor_types::{BlockInfo, ChainHeads, Log};
use tracing::{info, warn};

/// Blocks between two periodic checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 16;

type Tx = <DatabaseEnv as Database>::TX;
type TxMut = <DatabaseEnv as Database>::TXMut;

/// Manages the database environment for a single chain.
/// Provides transactional access to data via providers.
///
/// The environment sits behind a lock so that [`ChainDb::close`] waits for in-flight
/// transactions and every later call fails with [`StorageError::Closed`].
#[derive(Debug)]
pub struct ChainDb {
    chain_id: ChainId,
    checkpoint_interval: u64,

    env: RwLock<Option<DatabaseEnv>>,
}

impl ChainDb {
    /// Creates or opens a database environment at the given path.
    pub fn new(chain_id: ChainId, path: &Path) -> Result<Self, StorageError> {
        let env = init_db_for::<_, crate::models::Tables>(path, DatabaseArguments::default())?;
        info!(
            target: "supervisor::storage",
            chain_id,
            path = %path.display(),
            "Opened log database"
        );
        Ok(Self {
            chain_id,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            env: RwLock::new(Some(env)),
        })
    }

    /// Sets the number of blocks between two periodic checkpoints. Zero is treated as one.
    pub fn with_checkpoint_interval(mut self, interval: u64) -> Self {
        self.checkpoint_interval = interval.max(1);
        self
    }

    /// Returns the chain this database belongs to.
    pub const fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Releases the underlying storage handle.
    ///
    /// Waits for in-flight transactions. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), StorageError> {
        let mut guard = self.env.write().map_err(|_| StorageError::LockPoisoned)?;
        if let Some(env) = guard.take() {
            drop(env);
            info!(target: "supervisor::storage", chain_id = self.chain_id, "Closed log database");
        }
        Ok(())
    }

    /// Returns `true` once [`ChainDb::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.env.read().map(|env| env.is_none()).unwrap_or(true)
    }

    const fn is_checkpoint(&self, block_number: u64) -> bool {
        block_number % self.checkpoint_interval == 0
    }

    fn view<T>(&self, f: impl FnOnce(&Tx) -> Result<T, StorageError>) -> Result<T, StorageError> {
        let guard = self.env.read().map_err(|_| StorageError::LockPoisoned)?;
        let env = guard.as_ref().ok_or(StorageError::Closed)?;
        env.view(f)?
    }

    /// Runs `f` in a write transaction that commits only if `f` succeeds.
    fn update<T>(&self, f: impl FnOnce(&TxMut) -> Result<T, StorageError>) -> Result<T, StorageError> {
        let guard = self.env.read().map_err(|_| StorageError::LockPoisoned)?;
        let env = guard.as_ref().ok_or(StorageError::Closed)?;

        let tx = env.tx_mut()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.abort();
                Err(err)
            }
        }
    }

    fn read_heads(&self, tx: &Tx) -> Result<ChainHeads, StorageError> {
        let heads = SafetyHeadRefProvider::new(tx, self.chain_id);
        Ok(ChainHeads {
            latest: LogProvider::new(tx, self.chain_id).get_latest_block()?,
            checkpoint: CheckpointProvider::new(tx, self.chain_id).latest()?,
            safe: heads.find_safety_head_ref(SafetyHeadRefKey::Safe)?,
            finalized: heads.find_safety_head_ref(SafetyHeadRefKey::Finalized)?,
        })
    }
}

impl LogStorageReader for ChainDb {
    fn get_latest_block(&self) -> Result<BlockInfo, StorageError> {
        self.view(|tx| LogProvider::new(tx, self.chain_id).get_latest_block())
    }

    fn get_block(&self, block_number: u64) -> Result<BlockInfo, StorageError> {
        self.view(|tx| LogProvider::new(tx, self.chain_id).get_block(block_number))
    }

    fn get_log(&self, block_number: u64, log_index: u32) -> Result<Log, StorageError> {
        self.view(|tx| LogProvider::new(tx, self.chain_id).get_log(block_number, log_index))
    }

    fn get_logs(&self, block_number: u64) -> Result<Vec<Log>, StorageError> {
        self.view(|tx| LogProvider::new(tx, self.chain_id).get_logs(block_number))
    }

    fn closest_block_info(&self, block_number: u64) -> Result<BlockInfo, StorageError> {
        self.view(|tx| CheckpointProvider::new(tx, self.chain_id).closest_at_or_below(block_number))
    }
}

impl LogStorageWriter for ChainDb {
    fn initialise_log_storage(&self, block: BlockInfo, logs: Vec<Log>) -> Result<(), StorageError> {
        self.update(|tx| {
            LogProvider::new(tx, self.chain_id).initialise(&block, logs)?;
            let checkpoints = CheckpointProvider::new(tx, self.chain_id);
            checkpoints.restore_pending(&block)?;
            checkpoints.record(&block)
        })
    }

    fn store_block_logs(&self, block: &BlockInfo, logs: Vec<Log>) -> Result<(), StorageError> {
        self.update(|tx| {
            LogProvider::new(tx, self.chain_id).store_block_logs(block, logs)?;
            let checkpoints = CheckpointProvider::new(tx, self.chain_id);
            // a block checkpointed before a rewind stays checkpointed when appended again
            let restored = checkpoints.restore_pending(block)?;
            if !restored && self.is_checkpoint(block.number) {
                checkpoints.record(block)?;
            }
            Ok(())
        })
    }
}

impl HeadRefStorageReader for ChainDb {
    fn get_safety_head_ref(&self, key: SafetyHeadRefKey) -> Result<BlockInfo, StorageError> {
        self.view(|tx| SafetyHeadRefProvider::new(tx, self.chain_id).get_safety_head_ref(key))
    }

    fn get_chain_heads(&self) -> Result<ChainHeads, StorageError> {
        self.view(|tx| self.read_heads(tx))
    }
}

impl HeadRefStorageWriter for ChainDb {
    fn update_safety_head_ref(
        &self,
        key: SafetyHeadRefKey,
        block: &BlockInfo,
    ) -> Result<(), StorageError> {
        self.update(|tx| {
            let stored = LogProvider::new(tx, self.chain_id).get_block(block.number)?;
            if stored.hash != block.hash {
                warn!(
                    target: "supervisor::storage",
                    chain_id = self.chain_id,
                    %stored,
                    incoming = %block,
                    %key,
                    "Head reference does not match stored block"
                );
                return Err(StorageError::ConflictError);
            }
            SafetyHeadRefProvider::new(tx, self.chain_id).update_safety_head_ref(key, block)
        })
    }
}

impl SafetySnapshotReader for ChainDb {
    fn block_with_heads(&self, block_number: u64) -> Result<(BlockInfo, ChainHeads), StorageError> {
        self.view(|tx| {
            let block = LogProvider::new(tx, self.chain_id).get_block(block_number)?;
            Ok((block, self.read_heads(tx)?))
        })
    }

    fn log_with_heads(
        &self,
        block_number: u64,
        log_index: u32,
    ) -> Result<(BlockInfo, Log, ChainHeads), StorageError> {
        self.view(|tx| {
            let provider = LogProvider::new(tx, self.chain_id);
            let log = provider.get_log(block_number, log_index)?;
            let block = provider.get_block(block_number)?;
            Ok((block, log, self.read_heads(tx)?))
        })
    }
}

impl StorageRewinder for ChainDb {
    fn rewind(&self, to: u64) -> Result<(), StorageError> {
        self.update(|tx| {
            let logs = LogProvider::new(tx, self.chain_id);
            let latest = match logs.get_latest_block() {
                Ok(block) => block,
                Err(StorageError::DatabaseNotInitialised) => return Ok(()),
                Err(err) => return Err(err),
            };
            if to > latest.number {
                return Ok(());
            }

            let removed = logs.rewind_to(to)?;

            let checkpoints = CheckpointProvider::new(tx, self.chain_id);
            checkpoints.truncate_after(to)?;

            let heads = SafetyHeadRefProvider::new(tx, self.chain_id);
            match logs.get_block(to) {
                Ok(tip) => {
                    checkpoints.record(&tip)?;
                    for key in SafetyHeadRefKey::ALL {
                        heads.reset_safety_head_ref_if_ahead(key, &tip)?;
                    }
                }
                // rewound below the anchor
                Err(StorageError::EntryNotFound(_)) => {
                    for key in SafetyHeadRefKey::ALL {
                        heads.remove_safety_head_ref(key)?;
                    }
                }
                Err(err) => return Err(err),
            }

            info!(
                target: "supervisor::storage",
                chain_id = self.chain_id,
                to,
                removed,
                "Rewound log database"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntryNotFoundError;
    use alloy_primitives::{Address, B256};
    use std::{sync::Arc, thread};
    use supervisor_types::SafetyLevel;
    use tempfile::TempDir;

    const CHAIN_ID: ChainId = 10;

    fn hash(number: u64) -> B256 {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&(number + 1).to_be_bytes());
        B256::from(bytes)
    }

    fn block(number: u64) -> BlockInfo {
        let parent_hash = if number == 0 { B256::ZERO } else { hash(number - 1) };
        BlockInfo::new(hash(number), number, parent_hash, 1_000 + number * 2)
    }

    fn logs(number: u64) -> Vec<Log> {
        vec![Log::new(0, Address::from([0x42; 20]), B256::from([number as u8; 32]))]
    }

    fn open(dir: &TempDir, interval: u64) -> ChainDb {
        ChainDb::new(CHAIN_ID, dir.path()).unwrap().with_checkpoint_interval(interval)
    }

    fn filled(dir: &TempDir, interval: u64, last: u64) -> ChainDb {
        let db = open(dir, interval);
        db.initialise_log_storage(block(0), logs(0)).unwrap();
        for n in 1..=last {
            db.store_block_logs(&block(n), logs(n)).unwrap();
        }
        db
    }

    #[test]
    fn test_append_enforces_sequence_and_linkage() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 3);

        assert_eq!(
            db.store_block_logs(&block(5), vec![]),
            Err(StorageError::SequenceGap { expected: 4, got: 5 })
        );

        let forked = BlockInfo::new(B256::from([0xff; 32]), 4, B256::from([0xee; 32]), 0);
        assert_eq!(
            db.store_block_logs(&forked, logs(4)),
            Err(StorageError::HashMismatch { expected: hash(3), got: forked.parent_hash })
        );
        assert_eq!(db.get_latest_block().unwrap(), block(3));
        assert!(db.get_logs(4).unwrap().is_empty());
    }

    #[test]
    fn test_periodic_checkpoints() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 10);

        assert_eq!(db.closest_block_info(u64::MAX).unwrap(), block(8));
        assert_eq!(db.closest_block_info(7).unwrap(), block(4));
        assert_eq!(db.closest_block_info(3).unwrap(), block(0));
    }

    #[test]
    fn test_empty_store_has_no_checkpoint() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir, 4);

        assert_eq!(
            db.closest_block_info(u64::MAX),
            Err(EntryNotFoundError::CheckpointNotFound(u64::MAX).into())
        );
        assert_eq!(db.store_block_logs(&block(0), vec![]), Err(StorageError::DatabaseNotInitialised));
    }

    #[test]
    fn test_rewind_then_closest_returns_target() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 10);

        for k in (0..=10).rev() {
            db.rewind(k).unwrap();
            assert_eq!(db.closest_block_info(u64::MAX).unwrap(), block(k), "rewind to {k}");
            assert_eq!(db.get_latest_block().unwrap(), block(k));
        }
    }

    #[test]
    fn test_rewind_then_only_next_block_appends() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 10);

        db.rewind(6).unwrap();
        assert!(db.get_logs(7).unwrap().is_empty());
        assert_eq!(
            db.store_block_logs(&block(8), logs(8)),
            Err(StorageError::SequenceGap { expected: 7, got: 8 })
        );
        db.store_block_logs(&block(7), logs(7)).unwrap();
        assert_eq!(db.get_latest_block().unwrap(), block(7));
    }

    #[test]
    fn test_rewind_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 5);

        db.rewind(9).unwrap();
        assert_eq!(db.get_latest_block().unwrap(), block(5));
        assert_eq!(db.closest_block_info(u64::MAX).unwrap(), block(4));

        db.rewind(3).unwrap();
        db.rewind(3).unwrap();
        assert_eq!(db.get_latest_block().unwrap(), block(3));
    }

    #[test]
    fn test_rewind_target_stays_checkpointed_after_resume() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 10);

        db.rewind(9).unwrap();
        db.store_block_logs(&block(10), logs(10)).unwrap();
        assert_eq!(db.get_chain_heads().unwrap().safety_level(9), SafetyLevel::CrossUnsafe);

        // resuming before the latest checkpoint
        db.rewind(8).unwrap();
        assert_eq!(db.closest_block_info(u64::MAX).unwrap(), block(8));

        db.store_block_logs(&block(9), logs(9)).unwrap();
        db.store_block_logs(&block(10), logs(10)).unwrap();
        assert_eq!(db.closest_block_info(u64::MAX).unwrap(), block(9));
        assert_eq!(db.get_chain_heads().unwrap().safety_level(9), SafetyLevel::CrossUnsafe);
    }

    #[test]
    fn test_rewound_checkpoint_of_replaced_block_is_dropped() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 10);
        db.rewind(9).unwrap();
        db.rewind(8).unwrap();

        let replaced = BlockInfo { hash: B256::from([0xcd; 32]), ..block(9) };
        db.store_block_logs(&replaced, logs(9)).unwrap();
        assert_eq!(db.closest_block_info(u64::MAX).unwrap(), block(8));
        assert_eq!(db.get_chain_heads().unwrap().safety_level(9), SafetyLevel::Unsafe);
    }

    #[test]
    fn test_rewind_pulls_back_heads() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 10);
        db.update_safety_head_ref(SafetyHeadRefKey::Safe, &block(9)).unwrap();
        db.update_safety_head_ref(SafetyHeadRefKey::Finalized, &block(3)).unwrap();

        db.rewind(5).unwrap();
        let heads = db.get_chain_heads().unwrap();
        assert_eq!(heads.latest, block(5));
        assert_eq!(heads.checkpoint, Some(block(5)));
        assert_eq!(heads.safe, Some(block(5)));
        assert_eq!(heads.finalized, Some(block(3)));
    }

    #[test]
    fn test_update_head_requires_matching_block() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 3);

        let wrong = BlockInfo { hash: B256::from([0xab; 32]), ..block(2) };
        assert_eq!(
            db.update_safety_head_ref(SafetyHeadRefKey::Safe, &wrong),
            Err(StorageError::ConflictError)
        );
        assert!(db.update_safety_head_ref(SafetyHeadRefKey::Safe, &block(7)).unwrap_err().is_not_found());
        assert_eq!(db.get_safety_head_ref(SafetyHeadRefKey::Safe), Err(StorageError::FutureData));
    }

    #[test]
    fn test_snapshot_lookups() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 6);
        db.update_safety_head_ref(SafetyHeadRefKey::Safe, &block(2)).unwrap();

        let (found, log, heads) = db.log_with_heads(5, 0).unwrap();
        assert_eq!(found, block(5));
        assert_eq!(log, logs(5)[0]);
        assert_eq!(heads.safety_level(5), SafetyLevel::Unsafe);
        assert_eq!(heads.safety_level(4), SafetyLevel::CrossUnsafe);
        assert_eq!(heads.safety_level(2), SafetyLevel::Safe);

        let (found, _) = db.block_with_heads(1).unwrap();
        assert_eq!(found, block(1));
        assert!(db.log_with_heads(5, 1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_close_rejects_later_calls() {
        let dir = TempDir::new().unwrap();
        let db = filled(&dir, 4, 2);

        db.close().unwrap();
        db.close().unwrap();
        assert!(db.is_closed());
        assert_eq!(db.get_latest_block(), Err(StorageError::Closed));
        assert_eq!(db.store_block_logs(&block(3), vec![]), Err(StorageError::Closed));
        assert_eq!(db.rewind(1), Err(StorageError::Closed));
    }

    #[test]
    fn test_reopen_keeps_committed_state() {
        let dir = TempDir::new().unwrap();
        {
            let db = filled(&dir, 4, 9);
            db.close().unwrap();
        }
        let db = open(&dir, 4);
        assert_eq!(db.get_latest_block().unwrap(), block(9));
        assert_eq!(db.closest_block_info(u64::MAX).unwrap(), block(8));
    }

    #[test]
    fn test_readers_never_see_partial_blocks() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(filled(&dir, 4, 0));

        let writer = {
            let db = db.clone();
            thread::spawn(move || {
                for n in 1..=200 {
                    db.store_block_logs(&block(n), logs(n)).unwrap();
                }
            })
        };

        let reader = {
            let db = db.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let heads = db.get_chain_heads().unwrap();
                    let latest = heads.latest.number;
                    let (stored, _) = db.block_with_heads(latest).unwrap();
                    assert_eq!(stored, block(latest));
                    assert_eq!(db.get_logs(latest).unwrap(), logs(latest));

                    let checkpoint = db.closest_block_info(u64::MAX).unwrap();
                    assert_eq!(checkpoint, block(checkpoint.number));
                    assert_eq!(db.get_block(checkpoint.number).unwrap(), checkpoint);
                    assert_eq!(db.get_logs(checkpoint.number).unwrap(), logs(checkpoint.number));
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(db.get_latest_block().unwrap(), block(200));
    }
}
