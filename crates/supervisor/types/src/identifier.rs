//! Message identifier.

use alloy_primitives::ChainId;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Names the origin of a cross-chain message: the log at `log_index` in block `block_number`
/// of chain `chain_id`, emitted at `timestamp`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{chain_id}:{block_number}:{log_index}@{timestamp}")]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    /// Chain the message was emitted on.
    #[serde(rename = "chainID", with = "alloy_serde::quantity")]
    pub chain_id: ChainId,
    /// Block number of the emitting block.
    #[serde(with = "alloy_serde::quantity")]
    pub block_number: u64,
    /// Index of the log within the block.
    #[serde(with = "alloy_serde::quantity")]
    pub log_index: u32,
    /// Timestamp of the emitting block.
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
}

impl Identifier {
    /// Creates a new [`Identifier`].
    pub const fn new(chain_id: ChainId, block_number: u64, log_index: u32, timestamp: u64) -> Self {
        Self { chain_id, block_number, log_index, timestamp }
    }
}
