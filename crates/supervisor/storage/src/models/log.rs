//! Models for storing logs in the database.
//!
//! Each log is uniquely identified by its block number and index within the block.
//! The table is dup-sorted, so all logs of one block live under a single key, ordered by
//! log index.

use alloy_primitives::{Address, B256};
use bytes::{Buf, BufMut};
use reth_codecs::Compact;
use serde::{Deserialize, Serialize};
use supervisor_types::Log;

/// Value stored in the [`crate::models::LogEntries`] dup-sorted table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogEntry {
    /// Index of the log within its block.
    pub index: u32,
    /// Address that emitted the log.
    pub origin: Address,
    /// keccak256 over the log topics and data.
    pub payload_hash: B256,
}

/// The `index` is written first, big-endian, because MDBX orders duplicates by their raw
/// bytes and the index doubles as the dup subkey.
///
/// Layout: `index: u32 | origin: [u8; 20] | payload_hash: [u8; 32]`.
impl Compact for LogEntry {
    fn to_compact<B>(&self, buf: &mut B) -> usize
    where
        B: BufMut + AsMut<[u8]>,
    {
        let start_len = buf.remaining_mut();

        buf.put_u32(self.index);
        buf.put_slice(self.origin.as_slice());
        buf.put_slice(self.payload_hash.as_slice());

        start_len - buf.remaining_mut()
    }

    fn from_compact(mut buf: &[u8], _len: usize) -> (Self, &[u8]) {
        let index = buf.get_u32();

        let origin = Address::from_slice(&buf[..20]);
        buf.advance(20);

        let payload_hash = B256::from_slice(&buf[..32]);
        buf.advance(32);

        (Self { index, origin, payload_hash }, buf)
    }
}

impl From<Log> for LogEntry {
    fn from(log: Log) -> Self {
        Self { index: log.index, origin: log.origin, payload_hash: log.payload_hash }
    }
}

impl From<LogEntry> for Log {
    fn from(entry: LogEntry) -> Self {
        Self::new(entry.index, entry.origin, entry.payload_hash)
    }
}
