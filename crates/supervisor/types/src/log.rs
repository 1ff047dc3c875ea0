use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// A reference entry for a log observed in an L2 block.
///
/// The log body itself is not kept. `payload_hash` commits to the topics and data, and
/// together with `origin` it is enough to re-derive the message hash a consumer claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Position of the log within its block.
    pub index: u32,
    /// Address of the contract that emitted the log.
    pub origin: Address,
    /// keccak256 over the concatenated topics and data.
    pub payload_hash: B256,
}

impl Log {
    /// Creates a new [`Log`].
    pub const fn new(index: u32, origin: Address, payload_hash: B256) -> Self {
        Self { index, origin, payload_hash }
    }
}
