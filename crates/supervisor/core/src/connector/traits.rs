use super::ClientError;
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{B256, ChainId, Log};
use async_trait::async_trait;
use auto_impl::auto_impl;
use std::fmt::Debug;
use supervisor_types::BlockInfo;

/// Read access to one chain node.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait ChainClient: Send + Sync + Debug {
    /// Returns the chain id the node reports.
    async fn chain_id(&self) -> Result<ChainId, ClientError>;

    /// Returns the block identified by `block`, or `None` if the node does not have it yet.
    async fn block_ref(&self, block: BlockNumberOrTag) -> Result<Option<BlockInfo>, ClientError>;

    /// Returns every log emitted in the block with `block_hash`, in log index order.
    async fn fetch_logs(&self, block_hash: B256) -> Result<Vec<Log>, ClientError>;
}

/// Opens [`ChainClient`]s for configured endpoints.
#[async_trait]
pub trait ChainConnector: Send + Sync + Debug {
    /// The client type produced by this connector.
    type Client: ChainClient + 'static;

    /// Connects to `endpoint` and resolves the chain it serves.
    async fn connect(&self, endpoint: &str) -> Result<(Self::Client, ChainId), ClientError>;
}
