//! Reth's MDBX-backed [`LogProvider`] for per-chain log storage.
//!
//! Logs are stored in [`LogEntries`] under dup-sorted tables, with log index
//! used as the subkey. Block metadata is stored in [`BlockRefs`].

use crate::{
    error::{EntryNotFoundError, StorageError},
    models::{BlockRefs, LogEntries},
};
use alloy_primitives::ChainId;
use reth_db_api::{
    cursor::{DbCursorRO, DbCursorRW, DbDupCursorRO, DbDupCursorRW},
    transaction::{DbTx, DbTxMut},
};
use supervisor_types::{BlockInfo, Log};
use tracing::{debug, error, info, trace, warn};

const DEFAULT_LOG_INTERVAL: u64 = 100;

/// A log storage that wraps a transactional reference to the MDBX backend.
#[derive(Debug)]
pub(crate) struct LogProvider<'tx, TX> {
    tx: &'tx TX,
    chain_id: ChainId,
    #[doc(hidden)]
    observability_interval: u64,
}

impl<'tx, TX> LogProvider<'tx, TX> {
    pub(crate) const fn new(tx: &'tx TX, chain_id: ChainId) -> Self {
        Self::new_with_observability_interval(tx, chain_id, DEFAULT_LOG_INTERVAL)
    }

    pub(crate) const fn new_with_observability_interval(
        tx: &'tx TX,
        chain_id: ChainId,
        observability_interval: u64,
    ) -> Self {
        Self { tx, chain_id, observability_interval }
    }
}

impl<TX> LogProvider<'_, TX>
where
    TX: DbTxMut + DbTx,
{
    /// Records the anchor block of an empty store.
    ///
    /// Succeeds without writing if the same anchor is already the first stored block.
    pub(crate) fn initialise(&self, anchor: &BlockInfo, logs: Vec<Log>) -> Result<(), StorageError> {
        match self.get_first_block() {
            Ok(first) if first == *anchor => Ok(()),
            Ok(first) => {
                warn!(
                    target: "supervisor::storage",
                    chain_id = %self.chain_id,
                    %first,
                    incoming_anchor = %anchor,
                    "Store already anchored at a different block",
                );
                Err(StorageError::ConflictError)
            }
            Err(StorageError::DatabaseNotInitialised) => self.store_block_logs_internal(anchor, logs),
            Err(err) => Err(err),
        }
    }

    pub(crate) fn store_block_logs(&self, block: &BlockInfo, logs: Vec<Log>) -> Result<(), StorageError> {
        debug!(
            target: "supervisor::storage",
            chain_id = %self.chain_id,
            block_number = block.number,
            log_count = logs.len(),
            "Storing logs",
        );

        let latest_block = self.get_latest_block()?;

        let expected = latest_block.number + 1;
        if block.number != expected {
            warn!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                expected,
                incoming_block = %block,
                "Incoming block does not follow latest stored block"
            );
            return Err(StorageError::SequenceGap { expected, got: block.number });
        }

        if block.parent_hash != latest_block.hash {
            warn!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                %latest_block,
                incoming_block = %block,
                "Incoming block does not link to latest stored block"
            );
            return Err(StorageError::HashMismatch {
                expected: latest_block.hash,
                got: block.parent_hash,
            });
        }

        self.store_block_logs_internal(block, logs)
    }

    fn store_block_logs_internal(&self, block: &BlockInfo, logs: Vec<Log>) -> Result<(), StorageError> {
        self.tx.put::<BlockRefs>(block.number, (*block).into()).inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                block_number = block.number,
                %err,
                "Failed to insert block"
            );
        })?;

        let mut cursor = self.tx.cursor_dup_write::<LogEntries>().inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                %err,
                "Failed to get dup cursor"
            );
        })?;

        for log in logs {
            cursor.append_dup(block.number, log.into()).inspect_err(|err| {
                error!(
                    target: "supervisor::storage",
                    chain_id = %self.chain_id,
                    block_number = block.number,
                    %err,
                    "Failed to append logs"
                );
            })?;
        }
        Ok(())
    }

    /// Deletes every block and log above `to`.
    ///
    /// Returns the number of blocks removed.
    pub(crate) fn rewind_to(&self, to: u64) -> Result<u64, StorageError> {
        let latest_block = match self.get_latest_block() {
            Ok(block) => block.number,
            Err(StorageError::DatabaseNotInitialised) => return Ok(0),
            Err(err) => return Err(err),
        };

        if to >= latest_block {
            trace!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                to,
                latest_block,
                "Nothing to rewind"
            );
            return Ok(0);
        }

        info!(
            target: "supervisor::storage",
            chain_id = %self.chain_id,
            to,
            latest_block,
            "Starting rewind of log storage"
        );

        let total_blocks = latest_block - to;
        let mut processed_blocks = 0;

        let mut cursor = self.tx.cursor_write::<BlockRefs>()?;
        let mut walker = cursor.walk(Some(to + 1))?;

        while let Some(row) = walker.next() {
            let (key, _) = row?;
            walker.delete_current()?;
            self.tx.delete::<LogEntries>(key, None)?;

            processed_blocks += 1;

            if processed_blocks % self.observability_interval == 0 ||
                processed_blocks == total_blocks
            {
                let percentage = (processed_blocks as f64 / total_blocks as f64 * 100.0).min(100.0);
                info!(
                   target: "supervisor::storage",
                   chain_id = %self.chain_id,
                   block_number = %key,
                   percentage = %format!("{:.2}%", percentage),
                   processed_blocks,
                   total_blocks,
                   "Rewind progress"
                );
            }
        }

        Ok(processed_blocks)
    }
}

impl<TX> LogProvider<'_, TX>
where
    TX: DbTx,
{
    pub(crate) fn get_block(&self, block_number: u64) -> Result<BlockInfo, StorageError> {
        let block_option = self.tx.get::<BlockRefs>(block_number).inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                block_number,
                %err,
                "Failed to read block",
            );
        })?;

        let block = block_option.ok_or_else(|| {
            debug!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                block_number,
                "Block not found"
            );
            EntryNotFoundError::BlockNotFound(block_number)
        })?;
        Ok(block.into())
    }

    pub(crate) fn get_latest_block(&self) -> Result<BlockInfo, StorageError> {
        let mut cursor = self.tx.cursor_read::<BlockRefs>().inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                %err,
                "Failed to get cursor"
            );
        })?;

        let (_, block) = cursor.last()?.ok_or(StorageError::DatabaseNotInitialised)?;
        Ok(block.into())
    }

    pub(crate) fn get_first_block(&self) -> Result<BlockInfo, StorageError> {
        let mut cursor = self.tx.cursor_read::<BlockRefs>()?;
        let (_, block) = cursor.first()?.ok_or(StorageError::DatabaseNotInitialised)?;
        Ok(block.into())
    }

    pub(crate) fn get_log(&self, block_number: u64, log_index: u32) -> Result<Log, StorageError> {
        let mut cursor = self.tx.cursor_dup_read::<LogEntries>().inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                %err,
                "Failed to get cursor for LogEntries"
            );
        })?;

        // The cursor lands on the first duplicate with an index at or above `log_index`.
        let entry = cursor
            .seek_by_key_subkey(block_number, log_index)?
            .filter(|entry| entry.index == log_index)
            .ok_or_else(|| {
                debug!(
                    target: "supervisor::storage",
                    chain_id = %self.chain_id,
                    block_number,
                    log_index,
                    "Log not found"
                );
                EntryNotFoundError::LogNotFound { block_number, log_index }
            })?;

        Ok(Log::from(entry))
    }

    pub(crate) fn get_logs(&self, block_number: u64) -> Result<Vec<Log>, StorageError> {
        let mut cursor = self.tx.cursor_dup_read::<LogEntries>()?;
        let walker = cursor.walk_range(block_number..=block_number).inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                block_number,
                %err,
                "Failed to walk dup range",
            );
        })?;

        let mut logs = Vec::new();
        for row in walker {
            let (_, entry) = row?;
            logs.push(entry.into());
        }
        Ok(logs)
    }
}
