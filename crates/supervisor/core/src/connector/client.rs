//! JSON-RPC backed [`ChainClient`] and [`ChainConnector`].

use super::{ChainClient, ChainConnector, ClientError};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{B256, ChainId, Log, U64};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{Block, Filter, Header};
use async_trait::async_trait;
use std::time::Duration;
use supervisor_types::BlockInfo;
use tracing::{debug, info, warn};
use url::Url;

/// Upper bound for resolving the chain id of a freshly connected node.
pub const CHAIN_ID_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ChainClient`] over an alloy [`RpcClient`].
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    chain_id: ChainId,
    rpc_client: RpcClient,
}

impl RpcChainClient {
    /// Creates a client bound to `chain_id`.
    pub const fn new(chain_id: ChainId, rpc_client: RpcClient) -> Self {
        Self { chain_id, rpc_client }
    }
}

fn block_info(block: Block) -> BlockInfo {
    let Header {
        hash,
        inner: alloy_consensus::Header { number, parent_hash, timestamp, .. },
        ..
    } = block.header;
    BlockInfo::new(hash, number, parent_hash, timestamp)
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<ChainId, ClientError> {
        let chain_id = request_chain_id(&self.rpc_client).await?;
        if chain_id != self.chain_id {
            return Err(ClientError::ChainIdMismatch { expected: self.chain_id, got: chain_id });
        }
        Ok(chain_id)
    }

    async fn block_ref(&self, block: BlockNumberOrTag) -> Result<Option<BlockInfo>, ClientError> {
        let response = self
            .rpc_client
            .request::<_, Option<Block>>("eth_getBlockByNumber", (block, false))
            .await
            .map_err(|err| {
                debug!(
                    target: "supervisor::connector",
                    chain_id = self.chain_id,
                    %block,
                    %err,
                    "Failed to fetch block"
                );
                ClientError::Transport(err.to_string())
            })?;

        Ok(response.map(block_info))
    }

    async fn fetch_logs(&self, block_hash: B256) -> Result<Vec<Log>, ClientError> {
        let filter = Filter::new().at_block_hash(block_hash);
        let mut logs = self
            .rpc_client
            .request::<_, Vec<alloy_rpc_types_eth::Log>>("eth_getLogs", (filter,))
            .await
            .map_err(|err| {
                debug!(
                    target: "supervisor::connector",
                    chain_id = self.chain_id,
                    %block_hash,
                    %err,
                    "Failed to fetch logs"
                );
                ClientError::Transport(err.to_string())
            })?;

        logs.sort_by_key(|log| log.log_index);
        Ok(logs.into_iter().map(|log| log.inner).collect())
    }
}

async fn request_chain_id(rpc_client: &RpcClient) -> Result<ChainId, ClientError> {
    let chain_id = tokio::time::timeout(
        CHAIN_ID_TIMEOUT,
        rpc_client.request_noparams::<U64>("eth_chainId").into_future(),
    )
    .await
    .map_err(|_| ClientError::Timeout(CHAIN_ID_TIMEOUT))?
    .map_err(|err| ClientError::Transport(err.to_string()))?;

    Ok(chain_id.to::<u64>())
}

/// [`ChainConnector`] that opens HTTP JSON-RPC clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct RpcConnector;

impl RpcConnector {
    /// Wraps an already built [`RpcClient`], resolving its chain id.
    pub async fn resolve(rpc_client: RpcClient) -> Result<(RpcChainClient, ChainId), ClientError> {
        let chain_id = request_chain_id(&rpc_client).await?;
        Ok((RpcChainClient::new(chain_id, rpc_client), chain_id))
    }
}

#[async_trait]
impl ChainConnector for RpcConnector {
    type Client = RpcChainClient;

    async fn connect(&self, endpoint: &str) -> Result<(Self::Client, ChainId), ClientError> {
        let url = Url::parse(endpoint).map_err(|err| {
            warn!(target: "supervisor::connector", endpoint, %err, "Rejected chain endpoint");
            ClientError::InvalidEndpoint { endpoint: endpoint.to_string(), reason: err.to_string() }
        })?;

        let (client, chain_id) = Self::resolve(RpcClient::new_http(url)).await?;
        info!(target: "supervisor::connector", endpoint, chain_id, "Connected to chain node");
        Ok((client, chain_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes};
    use alloy_transport::mock::*;

    fn mock_client() -> (Asserter, RpcClient) {
        let asserter = Asserter::new();
        let transport = MockTransport::new(asserter.clone());
        (asserter, RpcClient::new(transport, false))
    }

    fn rpc_block(number: u64, hash: B256, parent_hash: B256) -> Block {
        Block {
            header: Header {
                hash,
                inner: alloy_consensus::Header {
                    number,
                    parent_hash,
                    timestamp: 1_000 + number,
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_resolve_reads_chain_id() {
        let (asserter, rpc_client) = mock_client();
        asserter.push_success(&U64::from(10));
        asserter.push_success(&U64::from(10));

        let (client, chain_id) = RpcConnector::resolve(rpc_client).await.unwrap();
        assert_eq!(chain_id, 10);
        assert_eq!(client.chain_id().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_endpoint() {
        let err = RpcConnector.connect("not a url").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidEndpoint { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_chain_id_mismatch() {
        let (asserter, rpc_client) = mock_client();
        asserter.push_success(&U64::from(11));

        let client = RpcChainClient::new(10, rpc_client);
        let err = client.chain_id().await.unwrap_err();
        assert_eq!(err, ClientError::ChainIdMismatch { expected: 10, got: 11 });
    }

    #[tokio::test]
    async fn test_block_ref_maps_header() {
        let (asserter, rpc_client) = mock_client();
        let hash = B256::from([1u8; 32]);
        let parent_hash = B256::from([2u8; 32]);
        asserter.push_success(&rpc_block(42, hash, parent_hash));

        let client = RpcChainClient::new(10, rpc_client);
        let block = client.block_ref(BlockNumberOrTag::Number(42)).await.unwrap().unwrap();

        assert_eq!(block, BlockInfo::new(hash, 42, parent_hash, 1_042));
    }

    #[tokio::test]
    async fn test_block_ref_missing_block() {
        let (asserter, rpc_client) = mock_client();
        asserter.push_success(&Option::<Block>::None);

        let client = RpcChainClient::new(10, rpc_client);
        let block = client.block_ref(BlockNumberOrTag::Number(43)).await.unwrap();
        assert!(block.is_none());
    }

    #[tokio::test]
    async fn test_block_ref_transport_failure_is_transient() {
        let (asserter, rpc_client) = mock_client();
        asserter.push_failure_msg("node unavailable");

        let client = RpcChainClient::new(10, rpc_client);
        let err = client.block_ref(BlockNumberOrTag::Latest).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fetch_logs_orders_by_index() {
        let (asserter, rpc_client) = mock_client();
        let block_hash = B256::from([7u8; 32]);
        let log = |index: u64, address: Address| alloy_rpc_types_eth::Log {
            inner: alloy_primitives::Log::new_unchecked(
                address,
                vec![B256::from([index as u8; 32])],
                Bytes::from_static(b"data"),
            ),
            block_hash: Some(block_hash),
            log_index: Some(index),
            ..Default::default()
        };
        let first = Address::repeat_byte(0x11);
        let second = Address::repeat_byte(0x22);
        asserter.push_success(&vec![log(1, second), log(0, first)]);

        let client = RpcChainClient::new(10, rpc_client);
        let logs = client.fetch_logs(block_hash).await.unwrap();

        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].address, first);
        assert_eq!(logs[1].address, second);
    }
}
