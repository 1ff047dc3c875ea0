//! [SupervisorActor] services for the supervisor.
//!
//! [SupervisorActor]: super::SupervisorActor

mod traits;
pub use traits::SupervisorActor;

mod rpc;
pub use rpc::{SupervisorRpcActor, SupervisorRpcActorError};
