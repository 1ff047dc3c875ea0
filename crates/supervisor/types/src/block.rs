//! Block reference type.

use alloy_primitives::B256;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifies one block on one chain, together with the link to its parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("BlockInfo {{ number: {number}, hash: {hash}, parent_hash: {parent_hash} }}")]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    /// The block hash.
    pub hash: B256,
    /// The block number.
    #[serde(with = "alloy_serde::quantity")]
    pub number: u64,
    /// The parent block hash.
    pub parent_hash: B256,
    /// The block timestamp.
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
}

impl BlockInfo {
    /// Creates a new [`BlockInfo`].
    pub const fn new(hash: B256, number: u64, parent_hash: B256, timestamp: u64) -> Self {
        Self { hash, number, parent_hash, timestamp }
    }

    /// Returns `true` if `self` is the direct parent of `child`.
    pub fn is_parent_of(&self, child: &Self) -> bool {
        self.number + 1 == child.number && self.hash == child.parent_hash
    }
}
