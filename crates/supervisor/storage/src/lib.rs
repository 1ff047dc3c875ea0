//! Persistent log storage for the supervisor.
//!
//! This crate provides the append-only, per-chain log database, exposing
//! high-level APIs to write and query logs, block metadata and checkpoints.
//!
//! The storage system is built on top of [`reth-db`], using MDBX,
//! and defines schemas for:
//! - L2 log entries
//! - Block ancestry metadata
//! - Checkpoints used as recovery anchors
//! - The chain's safe and finalized heads
//!
//! ## Capabilities
//!
//! - Append blocks with their logs, enforcing contiguity and hash linkage
//! - Look up logs by block number and index
//! - Find the closest checkpoint at or below a block
//! - Rewind atomically during reorgs and crash recovery

pub mod models;
pub use models::SafetyHeadRefKey;

mod error;
pub use error::{EntryNotFoundError, StorageError};

mod providers;

mod chaindb;
pub use chaindb::{ChainDb, DEFAULT_CHECKPOINT_INTERVAL};

mod traits;
pub use traits::{
    ChainStorage, HeadRefStorage, HeadRefStorageReader, HeadRefStorageWriter, LogStorage,
    LogStorageReader, LogStorageWriter, SafetySnapshotReader, StorageRewinder,
};
