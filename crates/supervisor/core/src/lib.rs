//! Core logic of the interop supervisor.
//!
//! The [`SupervisorBackend`] owns one [`ChainMonitor`] and one log database per followed
//! chain. Monitors keep their database in line with the chain's canonical blocks; the
//! backend classifies messages and blocks against those databases through [`SafetyQuery`].

pub mod error;
pub use error::{ShutdownError, ShutdownStepError, SupervisorError};

pub mod config;
pub use config::{Config, MonitorConfig, StorageConfig};

pub mod connector;
pub use connector::{ChainClient, ChainConnector, ClientError, RpcChainClient, RpcConnector};

pub mod monitor;
pub use monitor::{ChainMonitor, MonitorError};

mod backend;
pub use backend::{BackendState, SafetyQuery, SupervisorBackend};

pub mod rpc;

#[cfg(test)]
pub(crate) mod test_utils;
