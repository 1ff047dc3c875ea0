//! Provider for checkpoint markers.
//!
//! A checkpoint is a block the store guarantees is fully and durably written. They are the
//! recovery anchors used after a restart.

use crate::{
    error::{EntryNotFoundError, StorageError},
    models::{Checkpoints, PendingCheckpoints},
};
use alloy_primitives::ChainId;
use derive_more::Constructor;
use reth_db_api::{
    cursor::{DbCursorRO, DbCursorRW},
    transaction::{DbTx, DbTxMut},
};
use supervisor_types::BlockInfo;
use tracing::{debug, error};

/// Checkpoint storage over a transactional reference.
#[derive(Debug, Constructor)]
pub(crate) struct CheckpointProvider<'tx, TX> {
    tx: &'tx TX,
    chain_id: ChainId,
}

impl<TX> CheckpointProvider<'_, TX>
where
    TX: DbTx,
{
    /// Returns the latest checkpoint with a number at or below `block_number`.
    pub(crate) fn closest_at_or_below(&self, block_number: u64) -> Result<BlockInfo, StorageError> {
        let mut cursor = self.tx.cursor_read::<Checkpoints>()?;

        let found = match cursor.seek(block_number)? {
            Some((number, checkpoint)) if number == block_number => Some(checkpoint),
            Some(_) => cursor.prev()?.map(|(_, checkpoint)| checkpoint),
            None => cursor.last()?.map(|(_, checkpoint)| checkpoint),
        };

        let checkpoint = found.ok_or_else(|| {
            debug!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                block_number,
                "No checkpoint at or below block"
            );
            EntryNotFoundError::CheckpointNotFound(block_number)
        })?;
        Ok(checkpoint.into())
    }

    /// Returns the most recent checkpoint, if any.
    pub(crate) fn latest(&self) -> Result<Option<BlockInfo>, StorageError> {
        let mut cursor = self.tx.cursor_read::<Checkpoints>()?;
        Ok(cursor.last()?.map(|(_, checkpoint)| checkpoint.into()))
    }
}

impl<TX> CheckpointProvider<'_, TX>
where
    TX: DbTxMut + DbTx,
{
    pub(crate) fn record(&self, block: &BlockInfo) -> Result<(), StorageError> {
        debug!(
            target: "supervisor::storage",
            chain_id = %self.chain_id,
            block_number = block.number,
            "Recording checkpoint"
        );
        self.tx.put::<Checkpoints>(block.number, (*block).into()).inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                block_number = block.number,
                %err,
                "Failed to record checkpoint"
            );
        })?;
        Ok(())
    }

    /// Removes every checkpoint above `block_number`.
    ///
    /// Each removed checkpoint is kept as pending, see [`Self::restore_pending`].
    pub(crate) fn truncate_after(&self, block_number: u64) -> Result<(), StorageError> {
        let Some(start) = block_number.checked_add(1) else { return Ok(()) };

        let mut cursor = self.tx.cursor_write::<Checkpoints>()?;
        let mut walker = cursor.walk(Some(start))?;
        while let Some(row) = walker.next() {
            let (number, checkpoint) = row?;
            self.tx.put::<PendingCheckpoints>(number, checkpoint)?;
            walker.delete_current()?;
        }
        Ok(())
    }

    /// Consumes the pending checkpoint at `block.number`, if any, and records it again when it
    /// names the same block. Returns `true` if the checkpoint was restored.
    pub(crate) fn restore_pending(&self, block: &BlockInfo) -> Result<bool, StorageError> {
        let Some(pending) = self.tx.get::<PendingCheckpoints>(block.number)? else {
            return Ok(false);
        };
        self.tx.delete::<PendingCheckpoints>(block.number, None)?;

        if pending.hash != block.hash {
            debug!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                block_number = block.number,
                "Dropping pending checkpoint of a replaced block"
            );
            return Ok(false);
        }
        self.record(block)?;
        Ok(true)
    }
}
