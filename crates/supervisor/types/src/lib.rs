//! Core types shared across supervisor components.
//!
//! This crate defines the block, log and message identifiers the supervisor records per
//! chain, and the [`SafetyLevel`] it reports back to callers.

mod block;
pub use block::BlockInfo;

pub mod head;
pub use head::ChainHeads;

mod identifier;
pub use identifier::Identifier;

mod log;
pub use log::Log;

mod safety;
pub use safety::SafetyLevel;

mod hex_string_u64;
pub use hex_string_u64::HexStringU64;
