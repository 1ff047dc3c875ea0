//! Provider for the safe and finalized head references of a chain.
use crate::{
    StorageError,
    models::{SafetyHeadRefKey, SafetyHeadRefs},
};
use alloy_primitives::ChainId;
use derive_more::Constructor;
use reth_db_api::transaction::{DbTx, DbTxMut};
use supervisor_types::BlockInfo;
use tracing::{error, warn};

/// A Safety Head Reference storage that wraps transactional reference.
#[derive(Debug, Constructor)]
pub(crate) struct SafetyHeadRefProvider<'tx, TX> {
    tx: &'tx TX,
    chain_id: ChainId,
}

impl<TX> SafetyHeadRefProvider<'_, TX>
where
    TX: DbTx,
{
    pub(crate) fn find_safety_head_ref(
        &self,
        key: SafetyHeadRefKey,
    ) -> Result<Option<BlockInfo>, StorageError> {
        let result = self.tx.get::<SafetyHeadRefs>(key).inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                %key,
                %err,
                "Failed to seek head reference"
            );
        })?;
        Ok(result.map(Into::into))
    }

    pub(crate) fn get_safety_head_ref(&self, key: SafetyHeadRefKey) -> Result<BlockInfo, StorageError> {
        self.find_safety_head_ref(key)?.ok_or(StorageError::FutureData)
    }
}

impl<Tx> SafetyHeadRefProvider<'_, Tx>
where
    Tx: DbTxMut + DbTx,
{
    /// Moves the head reference forward. A block behind the current head is ignored.
    pub(crate) fn update_safety_head_ref(
        &self,
        key: SafetyHeadRefKey,
        incoming_head_ref: &BlockInfo,
    ) -> Result<(), StorageError> {
        if let Some(current_head_ref) = self.find_safety_head_ref(key)? {
            if current_head_ref.number > incoming_head_ref.number {
                warn!(
                    target: "supervisor::storage",
                    chain_id = %self.chain_id,
                    %current_head_ref,
                    %incoming_head_ref,
                    %key,
                    "Ignoring head reference older than the current one",
                );
                return Ok(());
            }
        }

        self.tx.put::<SafetyHeadRefs>(key, (*incoming_head_ref).into()).inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                %incoming_head_ref,
                %key,
                %err,
                "Failed to store head reference"
            )
        })?;
        Ok(())
    }

    /// Pulls the head reference back to `incoming_head_ref` if the stored one is ahead of it.
    pub(crate) fn reset_safety_head_ref_if_ahead(
        &self,
        key: SafetyHeadRefKey,
        incoming_head_ref: &BlockInfo,
    ) -> Result<(), StorageError> {
        match self.find_safety_head_ref(key)? {
            Some(current) if current.number > incoming_head_ref.number => {}
            _ => return Ok(()),
        }

        self.tx.put::<SafetyHeadRefs>(key, (*incoming_head_ref).into()).inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                %incoming_head_ref,
                %key,
                %err,
                "Failed to reset head reference"
            )
        })?;
        Ok(())
    }

    pub(crate) fn remove_safety_head_ref(&self, key: SafetyHeadRefKey) -> Result<(), StorageError> {
        self.tx.delete::<SafetyHeadRefs>(key, None).inspect_err(|err| {
            error!(
                target: "supervisor::storage",
                chain_id = %self.chain_id,
                %key,
                %err,
                "Failed to remove head reference"
            )
        })?;
        Ok(())
    }
}
