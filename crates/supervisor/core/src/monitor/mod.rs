//! Per-chain ingestion of blocks and logs into the log database.

mod error;
pub use error::MonitorError;

mod chain_monitor;
pub use chain_monitor::ChainMonitor;

mod task;

mod util;
pub use util::{log_to_message_payload, log_to_payload_hash, logs_to_entries};
