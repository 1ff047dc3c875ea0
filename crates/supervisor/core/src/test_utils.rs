//! Mocks and chain fixtures shared by the unit tests.

use crate::connector::{ChainClient, ChainConnector, ClientError};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, B256, Bytes, ChainId, Log, keccak256};
use async_trait::async_trait;
use mockall::mock;
use std::{
    sync::{Arc, RwLock},
    time::Duration,
};
use supervisor_types::BlockInfo;

mock!(
    #[derive(Debug)]
    pub Client {}

    #[async_trait]
    impl ChainClient for Client {
        async fn chain_id(&self) -> Result<ChainId, ClientError>;
        async fn block_ref(&self, block: BlockNumberOrTag) -> Result<Option<BlockInfo>, ClientError>;
        async fn fetch_logs(&self, block_hash: B256) -> Result<Vec<Log>, ClientError>;
    }
);

mock!(
    #[derive(Debug)]
    pub Connector {}

    #[async_trait]
    impl ChainConnector for Connector {
        type Client = MockClient;
        async fn connect(&self, endpoint: &str) -> Result<(MockClient, ChainId), ClientError>;
    }
);

/// A chain the mocked node serves; tests swap its content to simulate reorgs.
pub(crate) type Chain = Arc<RwLock<Vec<BlockInfo>>>;

pub(crate) fn hash(number: u64, fork: u8) -> B256 {
    let mut preimage = number.to_be_bytes().to_vec();
    preimage.push(fork);
    keccak256(preimage)
}

/// Builds blocks `0..len`, switching to `fork` hashes from `fork_from` on.
pub(crate) fn build_chain(len: u64, fork_from: u64, fork: u8) -> Vec<BlockInfo> {
    let mut blocks: Vec<BlockInfo> = Vec::new();
    for number in 0..len {
        let parent_hash = blocks.last().map(|parent| parent.hash).unwrap_or_default();
        let id = if number >= fork_from { fork } else { 0 };
        blocks.push(BlockInfo::new(hash(number, id), number, parent_hash, 1_000 + number));
    }
    blocks
}

pub(crate) fn shared_chain(blocks: Vec<BlockInfo>) -> Chain {
    Arc::new(RwLock::new(blocks))
}

/// The single log every fixture block carries.
pub(crate) fn fake_log(block_hash: B256) -> Log {
    Log::new_unchecked(Address::repeat_byte(0x42), vec![block_hash], Bytes::new())
}

/// A client serving `chain`. `safe` and `finalized` resolve to fixed depths below the tip.
pub(crate) fn client_for(chain_id: ChainId, chain: Chain) -> MockClient {
    let mut client = MockClient::new();
    client.expect_chain_id().returning(move || Ok(chain_id));
    client.expect_block_ref().returning(move |tag| {
        let blocks = chain.read().unwrap();
        let number = match tag {
            BlockNumberOrTag::Number(number) => number,
            BlockNumberOrTag::Safe => blocks.len().saturating_sub(3) as u64,
            BlockNumberOrTag::Finalized => blocks.len().saturating_sub(5) as u64,
            _ => blocks.len().saturating_sub(1) as u64,
        };
        Ok(blocks.get(number as usize).copied())
    });
    client.expect_fetch_logs().returning(|block_hash| Ok(vec![fake_log(block_hash)]));
    client
}

/// Polls `condition` until it holds, failing the test after ten seconds.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
