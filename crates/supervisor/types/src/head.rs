//! Heads of a single chain as tracked by its log database.

use crate::{BlockInfo, SafetyLevel};

/// Snapshot of the reference points used to classify blocks of one chain.
///
/// All fields are read from the same database transaction, so they are mutually consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainHeads {
    /// Latest ingested block.
    pub latest: BlockInfo,
    /// Most recent checkpoint, if any.
    pub checkpoint: Option<BlockInfo>,
    /// Latest block the chain reports as safe, if recorded.
    pub safe: Option<BlockInfo>,
    /// Latest block the chain reports as finalized, if recorded.
    pub finalized: Option<BlockInfo>,
}

impl ChainHeads {
    /// Derives the [`SafetyLevel`] of a recorded block at `block_number`.
    ///
    /// The caller is responsible for having matched the block against the stored hash.
    pub fn safety_level(&self, block_number: u64) -> SafetyLevel {
        let covers = |head: &Option<BlockInfo>| head.is_some_and(|h| block_number <= h.number);

        if block_number > self.latest.number {
            SafetyLevel::Unsafe
        } else if covers(&self.finalized) {
            SafetyLevel::Finalized
        } else if covers(&self.safe) {
            SafetyLevel::Safe
        } else if covers(&self.checkpoint) {
            SafetyLevel::CrossUnsafe
        } else {
            SafetyLevel::Unsafe
        }
    }
}
