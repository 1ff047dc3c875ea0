//! The supervisor RPC API using `jsonrpsee`.

pub use jsonrpsee::{
    core::RpcResult,
    types::{ErrorCode, ErrorObjectOwned},
};

use alloy_primitives::{B256, U64};
use jsonrpsee::proc_macros::rpc;
use supervisor_types::{HexStringU64, Identifier, SafetyLevel};

/// Safety queries for cross-chain messages.
///
/// Both methods always answer with a [`SafetyLevel`]. Unknown chains, missing entries and
/// hash mismatches are reported as [`SafetyLevel::Unsafe`] instead of an error.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "supervisor"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "supervisor"))]
pub trait SupervisorApi {
    /// Classifies the message whose origin is `identifier` and whose payload hashes to
    /// `payload_hash`.
    #[method(name = "checkMessage")]
    async fn check_message(
        &self,
        identifier: Identifier,
        payload_hash: B256,
    ) -> RpcResult<SafetyLevel>;

    /// Classifies block `block_number` with hash `block_hash` on chain `chain_id`.
    #[method(name = "checkBlock")]
    async fn check_block(
        &self,
        chain_id: HexStringU64,
        block_hash: B256,
        block_number: U64,
    ) -> RpcResult<SafetyLevel>;
}
