//! This crate provides the runnable service layer for the supervisor.
//! It integrates the core logic with the RPC server.

mod service;

pub use service::Service;

mod actors;
pub use actors::{SupervisorActor, SupervisorRpcActor, SupervisorRpcActorError};
