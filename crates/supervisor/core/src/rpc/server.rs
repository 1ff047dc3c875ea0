//! Server-side implementation of the Supervisor RPC API.

use crate::SafetyQuery;
use alloy_primitives::{B256, ChainId, U64};
use async_trait::async_trait;
use jsonrpsee::core::RpcResult;
use std::sync::Arc;
use supervisor_rpc::SupervisorApiServer;
use supervisor_types::{HexStringU64, Identifier, SafetyLevel};
use tracing::trace;

/// The server-side implementation struct for the [`SupervisorApiServer`].
/// It holds a reference to the backend answering the queries.
#[derive(Debug)]
pub struct SupervisorRpc<T> {
    supervisor: Arc<T>,
}

impl<T> SupervisorRpc<T> {
    /// Creates a new [`SupervisorRpc`] instance.
    pub fn new(supervisor: Arc<T>) -> Self {
        trace!(target: "supervisor::rpc", "Creating new SupervisorRpc handler");
        Self { supervisor }
    }
}

#[async_trait]
impl<T> SupervisorApiServer for SupervisorRpc<T>
where
    T: SafetyQuery + 'static,
{
    async fn check_message(
        &self,
        identifier: Identifier,
        payload_hash: B256,
    ) -> RpcResult<SafetyLevel> {
        trace!(
            target: "supervisor::rpc",
            %identifier,
            %payload_hash,
            "Received check_message request"
        );
        Ok(self.supervisor.check_message(&identifier, payload_hash))
    }

    async fn check_block(
        &self,
        chain_id: HexStringU64,
        block_hash: B256,
        block_number: U64,
    ) -> RpcResult<SafetyLevel> {
        let chain_id = ChainId::from(chain_id);
        let block_number = block_number.to::<u64>();
        trace!(
            target: "supervisor::rpc",
            chain_id,
            %block_hash,
            block_number,
            "Received check_block request"
        );
        Ok(self.supervisor.check_block(chain_id, block_hash, block_number))
    }
}
