//! JSON-RPC surface of the interop supervisor.
//!
//! Only the API definition lives here; the server implementation is provided by
//! `supervisor-core`.

#[cfg(feature = "jsonrpsee")]
pub mod jsonrpsee;
#[cfg(all(feature = "jsonrpsee", feature = "client"))]
pub use jsonrpsee::SupervisorApiClient;
#[cfg(feature = "jsonrpsee")]
pub use jsonrpsee::SupervisorApiServer;

pub use supervisor_types::{HexStringU64, Identifier, SafetyLevel};
