//! Transaction-scoped providers over the log database tables.
//!
//! Each provider borrows one MDBX transaction, so a caller composing several of them inside
//! a single write transaction gets all-or-nothing semantics.
mod log_provider;
pub(crate) use log_provider::LogProvider;

mod checkpoint_provider;
pub(crate) use checkpoint_provider::CheckpointProvider;

mod head_ref_provider;
pub(crate) use head_ref_provider::SafetyHeadRefProvider;
