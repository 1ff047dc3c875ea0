//! The supervisor backend: chain fleet ownership, lifecycle and safety queries.

mod query;
pub use query::SafetyQuery;

mod supervisor;
pub use supervisor::{BackendState, SupervisorBackend};
