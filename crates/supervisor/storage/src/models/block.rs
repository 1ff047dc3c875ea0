//! Block metadata stored per block number.

use alloy_primitives::B256;
use derive_more::Display;
use reth_codecs::Compact;
use serde::{Deserialize, Serialize};
use supervisor_types::BlockInfo;

/// Storage form of [`BlockInfo`].
///
/// Value of both [`crate::models::BlockRefs`] and [`crate::models::Checkpoints`], so that a
/// checkpoint can be returned without a second lookup.
#[derive(Debug, Clone, Display, PartialEq, Eq, Default, Serialize, Deserialize, Compact)]
#[display("number: {number}, hash: {hash}, parent_hash: {parent_hash}, timestamp: {timestamp}")]
pub struct BlockRef {
    /// The height of the block.
    pub number: u64,
    /// The hash of the block itself.
    pub hash: B256,
    /// The hash of the parent block.
    pub parent_hash: B256,
    /// The timestamp of the block (seconds since Unix epoch).
    pub timestamp: u64,
}

impl From<BlockInfo> for BlockRef {
    fn from(block: BlockInfo) -> Self {
        Self {
            number: block.number,
            hash: block.hash,
            parent_hash: block.parent_hash,
            timestamp: block.timestamp,
        }
    }
}

impl From<BlockRef> for BlockInfo {
    fn from(block: BlockRef) -> Self {
        Self::new(block.hash, block.number, block.parent_hash, block.timestamp)
    }
}
