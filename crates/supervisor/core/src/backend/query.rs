//! Safety classification of messages and blocks.

use alloy_primitives::{B256, ChainId};
use auto_impl::auto_impl;
use std::fmt::Debug;
use supervisor_storage::{SafetySnapshotReader, StorageError};
use supervisor_types::{Identifier, SafetyLevel};
use tracing::{debug, warn};

/// Answers safety queries for the chains a supervisor follows.
///
/// Queries never fail: whenever a claim cannot be proven, the answer is
/// [`SafetyLevel::MOST_CONSERVATIVE`].
#[auto_impl(&, Arc)]
pub trait SafetyQuery: Debug + Send + Sync {
    /// Classifies the message emitted at `identifier` whose payload hashes to `payload_hash`.
    fn check_message(&self, identifier: &Identifier, payload_hash: B256) -> SafetyLevel;

    /// Classifies block `block_number` of `chain_id`, which the caller claims has `block_hash`.
    fn check_block(&self, chain_id: ChainId, block_hash: B256, block_number: u64) -> SafetyLevel;
}

fn log_lookup_failure(chain_id: ChainId, block_number: u64, err: &StorageError) {
    if err.is_not_found() {
        debug!(target: "supervisor::backend", chain_id, block_number, %err, "Entry not recorded");
    } else {
        warn!(target: "supervisor::backend", chain_id, block_number, %err, "Safety lookup failed");
    }
}

/// Classifies a message against one chain's log database.
pub(crate) fn classify_message<DB: SafetySnapshotReader + ?Sized>(
    db: &DB,
    identifier: &Identifier,
    payload_hash: B256,
) -> SafetyLevel {
    let (block, log, heads) =
        match db.log_with_heads(identifier.block_number, identifier.log_index) {
            Ok(found) => found,
            Err(err) => {
                log_lookup_failure(identifier.chain_id, identifier.block_number, &err);
                return SafetyLevel::MOST_CONSERVATIVE;
            }
        };

    if log.payload_hash != payload_hash {
        debug!(
            target: "supervisor::backend",
            %identifier,
            stored = %log.payload_hash,
            claimed = %payload_hash,
            "Payload hash mismatch"
        );
        return SafetyLevel::MOST_CONSERVATIVE;
    }

    if block.timestamp != identifier.timestamp {
        debug!(
            target: "supervisor::backend",
            %identifier,
            stored = block.timestamp,
            "Timestamp mismatch"
        );
        return SafetyLevel::MOST_CONSERVATIVE;
    }

    heads.safety_level(block.number)
}

/// Classifies a block against one chain's log database.
pub(crate) fn classify_block<DB: SafetySnapshotReader + ?Sized>(
    db: &DB,
    chain_id: ChainId,
    block_hash: B256,
    block_number: u64,
) -> SafetyLevel {
    let (block, heads) = match db.block_with_heads(block_number) {
        Ok(found) => found,
        Err(err) => {
            log_lookup_failure(chain_id, block_number, &err);
            return SafetyLevel::MOST_CONSERVATIVE;
        }
    };

    if block.hash != block_hash {
        debug!(
            target: "supervisor::backend",
            chain_id,
            block_number,
            stored = %block.hash,
            claimed = %block_hash,
            "Block is not canonical"
        );
        return SafetyLevel::MOST_CONSERVATIVE;
    }

    heads.safety_level(block.number)
}
