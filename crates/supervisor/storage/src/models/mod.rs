//! Database table schemas of the log database.
//!
//! This module defines the value types, keys, and table layouts for everything
//! persisted per chain.
//!
//! The tables are registered using [`reth_db_api::table::TableInfo`] and grouped into a
//! [`reth_db_api::TableSet`] for database initialization via Reth's storage-api.

use reth_db_api::{
    TableSet, TableType, TableViewer,
    table::{DupSort, TableInfo},
    tables,
};
use std::fmt;

mod log;
pub use log::LogEntry;

mod block;
pub use block::BlockRef;

mod head_ref;
pub use head_ref::SafetyHeadRefKey;

/// Implements [`reth_db_api::table::Compress`] and [`reth_db_api::table::Decompress`] traits for
/// types that implement [`reth_codecs::Compact`].
macro_rules! impl_compression_for_compact {
    ($($name:ident),+) => {
        $(
            impl reth_db_api::table::Compress for $name {
                type Compressed = Vec<u8>;

                fn compress_to_buf<B: bytes::BufMut + AsMut<[u8]>>(&self, buf: &mut B) {
                    let _ = reth_codecs::Compact::to_compact(self, buf);
                }
            }

            impl reth_db_api::table::Decompress for $name {
                fn decompress(value: &[u8]) -> Result<$name, reth_db_api::DatabaseError> {
                    let (obj, _) = reth_codecs::Compact::from_compact(value, value.len());
                    Ok(obj)
                }
            }
        )+
    };
}

impl_compression_for_compact!(BlockRef, LogEntry);

tables! {
    /// A dup-sorted table that stores all logs emitted in a given block, sorted by their index.
    /// Keyed by block number, with log index as the subkey for DupSort.
    table LogEntries {
        type Key = u64;
        type Value = LogEntry;
        type SubKey = u32;
    }

    /// Block metadata by block number. Block numbers are contiguous from the anchor block
    /// to the latest ingested block.
    table BlockRefs {
        type Key = u64;
        type Value = BlockRef;
    }

    /// Blocks the database guarantees are fully written, keyed by block number.
    /// Used to answer "closest checkpoint at or below N" for crash recovery.
    table Checkpoints {
        type Key = u64;
        type Value = BlockRef;
    }

    /// Checkpoints removed by a rewind, keyed by block number. Restored when the same block is
    /// appended again.
    table PendingCheckpoints {
        type Key = u64;
        type Value = BlockRef;
    }

    /// Latest safe and finalized block reported by the chain.
    table SafetyHeadRefs {
        type Key = SafetyHeadRefKey;
        type Value = BlockRef;
    }
}
