//! Supervisor RPC module

mod server;
pub use server::SupervisorRpc;
