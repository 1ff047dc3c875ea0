//! CLI flags of the supervisor binary.

mod supervisor;
pub use supervisor::SupervisorArgs;
