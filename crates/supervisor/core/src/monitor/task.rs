use super::{MonitorError, util::logs_to_entries};
use crate::{
    config::MonitorConfig,
    connector::{ChainClient, ClientError},
};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::ChainId;
use derive_more::Constructor;
use std::sync::Arc;
use supervisor_storage::{ChainStorage, SafetyHeadRefKey, StorageError};
use supervisor_types::BlockInfo;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Outcome of a single ingestion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Progress {
    /// The database moved: a block was appended, the anchor written or a reorg resolved.
    Advanced,
    /// The chain has nothing new for us.
    Idle,
}

/// Keeps the log database of one chain in line with the node's canonical chain.
#[derive(Debug, Constructor)]
pub(super) struct IngestTask<C, DB> {
    chain_id: ChainId,
    client: C,
    db: Arc<DB>,
    start_block: u64,
    config: MonitorConfig,
    cancel_token: CancellationToken,
}

impl<C, DB> IngestTask<C, DB>
where
    C: ChainClient,
    DB: ChainStorage,
{
    /// Runs until cancelled or until an unrecoverable error occurs.
    ///
    /// Storage calls are synchronous and never interrupted: cancellation only takes effect
    /// while the task waits on the node or sleeps.
    pub(super) async fn run(self) -> Result<(), MonitorError> {
        let mut backoff = self.config.retry_backoff();
        let mut verified = false;

        loop {
            let step = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                step = async {
                    if verified { self.step().await } else { self.verify_chain_id().await }
                } => step,
            };

            let pause = match step {
                Ok(Progress::Advanced) => {
                    verified = true;
                    backoff = self.config.retry_backoff();
                    continue;
                }
                Ok(Progress::Idle) => {
                    backoff = self.config.retry_backoff();
                    self.config.poll_interval
                }
                Err(err) if err.is_transient() => {
                    let delay = backoff.next().unwrap_or(self.config.max_retry_delay);
                    warn!(
                        target: "supervisor::chain_monitor",
                        chain_id = self.chain_id,
                        %err,
                        ?delay,
                        "Chain node request failed, retrying"
                    );
                    delay
                }
                Err(err) => {
                    error!(
                        target: "supervisor::chain_monitor",
                        chain_id = self.chain_id,
                        %err,
                        "Ingestion stopped on unrecoverable error"
                    );
                    return Err(err);
                }
            };

            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!(target: "supervisor::chain_monitor", chain_id = self.chain_id, "Ingestion loop exited");
        Ok(())
    }

    /// Checks that the node serves the chain this task writes for.
    async fn verify_chain_id(&self) -> Result<Progress, MonitorError> {
        let reported = self.client.chain_id().await?;
        if reported != self.chain_id {
            return Err(ClientError::ChainIdMismatch { expected: self.chain_id, got: reported }.into());
        }
        debug!(target: "supervisor::chain_monitor", chain_id = self.chain_id, "Node chain id verified");
        Ok(Progress::Advanced)
    }

    pub(super) async fn step(&self) -> Result<Progress, MonitorError> {
        let latest = match self.db.get_latest_block() {
            Ok(block) => block,
            Err(StorageError::DatabaseNotInitialised) => return self.initialise().await,
            Err(err) => return Err(err.into()),
        };

        if let Some(next) = self.client.block_ref(BlockNumberOrTag::Number(latest.number + 1)).await?
        {
            if !latest.is_parent_of(&next) {
                return self.resolve_reorg(latest).await;
            }
            self.append(next).await?;
            return Ok(Progress::Advanced);
        }

        // no successor yet, the tip itself may have been replaced
        match self.client.block_ref(BlockNumberOrTag::Number(latest.number)).await? {
            Some(canonical) if canonical.hash != latest.hash => self.resolve_reorg(latest).await,
            Some(_) => {
                self.refresh_heads(&latest).await?;
                Ok(Progress::Idle)
            }
            None if self.head_diverged(&latest).await? => self.resolve_reorg(latest).await,
            None => {
                debug!(
                    target: "supervisor::chain_monitor",
                    chain_id = self.chain_id,
                    block_number = latest.number,
                    "Node is behind the log database"
                );
                Ok(Progress::Idle)
            }
        }
    }

    /// Returns `true` if the node's head is below `latest` and differs from the stored block
    /// at its height, i.e. the node switched to a shorter branch.
    async fn head_diverged(&self, latest: &BlockInfo) -> Result<bool, MonitorError> {
        let Some(head) = self.client.block_ref(BlockNumberOrTag::Latest).await? else {
            return Ok(false);
        };
        if head.number >= latest.number {
            return Ok(false);
        }

        match self.db.get_block(head.number) {
            Ok(stored) => Ok(stored.hash != head.hash),
            // below the anchor
            Err(StorageError::EntryNotFound(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn initialise(&self) -> Result<Progress, MonitorError> {
        let Some(anchor) = self.client.block_ref(BlockNumberOrTag::Number(self.start_block)).await?
        else {
            debug!(
                target: "supervisor::chain_monitor",
                chain_id = self.chain_id,
                start_block = self.start_block,
                "Start block not available yet"
            );
            return Ok(Progress::Idle);
        };

        let logs = self.client.fetch_logs(anchor.hash).await?;
        self.db.initialise_log_storage(anchor, logs_to_entries(&logs))?;

        info!(
            target: "supervisor::chain_monitor",
            chain_id = self.chain_id,
            %anchor,
            "Initialised log database"
        );
        Ok(Progress::Advanced)
    }

    async fn append(&self, block: BlockInfo) -> Result<(), MonitorError> {
        let logs = self.client.fetch_logs(block.hash).await?;
        let entries = logs_to_entries(&logs);
        let log_count = entries.len();

        self.db.store_block_logs(&block, entries)?;

        trace!(
            target: "supervisor::chain_monitor",
            chain_id = self.chain_id,
            block_number = block.number,
            log_count,
            "Ingested block"
        );
        Ok(())
    }

    /// Walks back from `latest` until a stored block matches the canonical chain, then rewinds
    /// the database onto it.
    async fn resolve_reorg(&self, latest: BlockInfo) -> Result<Progress, MonitorError> {
        warn!(
            target: "supervisor::chain_monitor",
            chain_id = self.chain_id,
            block_number = latest.number,
            "Reorg detected, searching common ancestor"
        );

        let mut number = latest.number;
        loop {
            let stored = match self.db.get_block(number) {
                Ok(block) => block,
                Err(StorageError::EntryNotFound(_)) => {
                    return Err(MonitorError::IncompatibleHistory {
                        chain_id: self.chain_id,
                        anchor: number + 1,
                    });
                }
                Err(err) => return Err(err.into()),
            };

            let canonical = self.client.block_ref(BlockNumberOrTag::Number(number)).await?;
            if canonical.is_some_and(|block| block.hash == stored.hash) {
                self.db.rewind(number)?;
                info!(
                    target: "supervisor::chain_monitor",
                    chain_id = self.chain_id,
                    ancestor = number,
                    dropped = latest.number - number,
                    "Rewound log database to common ancestor"
                );
                return Ok(Progress::Advanced);
            }

            let Some(parent) = number.checked_sub(1) else {
                return Err(MonitorError::IncompatibleHistory {
                    chain_id: self.chain_id,
                    anchor: number,
                });
            };
            number = parent;
        }
    }

    /// Records the node's safe and finalized heads once they are ingested.
    async fn refresh_heads(&self, latest: &BlockInfo) -> Result<(), MonitorError> {
        let tags = [
            (SafetyHeadRefKey::Safe, BlockNumberOrTag::Safe),
            (SafetyHeadRefKey::Finalized, BlockNumberOrTag::Finalized),
        ];

        for (key, tag) in tags {
            let head = match self.client.block_ref(tag).await {
                Ok(Some(head)) if head.number <= latest.number => head,
                Ok(_) => continue,
                Err(err) => {
                    debug!(
                        target: "supervisor::chain_monitor",
                        chain_id = self.chain_id,
                        %key,
                        %err,
                        "Skipping head refresh"
                    );
                    continue;
                }
            };

            match self.db.update_safety_head_ref(key, &head) {
                Ok(()) => {}
                Err(StorageError::ConflictError | StorageError::EntryNotFound(_)) => {
                    debug!(
                        target: "supervisor::chain_monitor",
                        chain_id = self.chain_id,
                        %key,
                        %head,
                        "Head is not part of the recorded chain"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}
