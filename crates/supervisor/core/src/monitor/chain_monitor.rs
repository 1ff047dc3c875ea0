use super::{MonitorError, task::IngestTask};
use crate::{config::MonitorConfig, connector::ChainClient};
use alloy_primitives::ChainId;
use std::sync::Arc;
use supervisor_storage::{ChainStorage, StorageError};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug)]
struct RunningTask {
    cancel_token: CancellationToken,
    handle: JoinHandle<Result<(), MonitorError>>,
}

/// Follows one chain and is the only writer of its log database.
///
/// The monitor is constructed idle; [`ChainMonitor::start`] spawns the ingestion task and
/// [`ChainMonitor::stop`] cancels it and waits until it has exited.
#[derive(Debug)]
pub struct ChainMonitor<C, DB> {
    chain_id: ChainId,
    client: Arc<C>,
    db: Arc<DB>,
    start_block: u64,
    config: MonitorConfig,
    running: Mutex<Option<RunningTask>>,
}

impl<C, DB> ChainMonitor<C, DB>
where
    C: ChainClient + 'static,
    DB: ChainStorage,
{
    /// Creates a monitor that resumes ingestion after `start_block`.
    ///
    /// If the database is still empty when the monitor starts, `start_block` itself is
    /// ingested first and becomes the anchor. No I/O happens here.
    pub fn new(
        chain_id: ChainId,
        client: C,
        db: Arc<DB>,
        start_block: u64,
        config: MonitorConfig,
    ) -> Self {
        Self {
            chain_id,
            client: Arc::new(client),
            db,
            start_block,
            config,
            running: Mutex::new(None),
        }
    }

    /// Returns the chain followed by this monitor.
    pub const fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Returns the block ingestion resumes after.
    pub const fn start_block(&self) -> u64 {
        self.start_block
    }

    /// Returns `true` while the ingestion task is alive.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.as_ref().is_some_and(|task| !task.handle.is_finished())
    }

    /// Spawns the ingestion task.
    ///
    /// Fails with [`MonitorError::AlreadyStarted`] if a task was started and not stopped since,
    /// including one that already ended with an error. Fails with [`MonitorError::Storage`]
    /// if the database cannot be read.
    pub async fn start(&self) -> Result<(), MonitorError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(MonitorError::AlreadyStarted(self.chain_id));
        }

        match self.db.get_latest_block() {
            Ok(latest) => info!(
                target: "supervisor::chain_monitor",
                chain_id = self.chain_id,
                resume_from = latest.number + 1,
                "Starting chain monitor"
            ),
            Err(StorageError::DatabaseNotInitialised) => info!(
                target: "supervisor::chain_monitor",
                chain_id = self.chain_id,
                start_block = self.start_block,
                "Starting chain monitor on empty database"
            ),
            Err(err) => {
                error!(
                    target: "supervisor::chain_monitor",
                    chain_id = self.chain_id,
                    %err,
                    "Log database not readable"
                );
                return Err(err.into());
            }
        }

        let cancel_token = CancellationToken::new();
        let task = IngestTask::new(
            self.chain_id,
            self.client.clone(),
            self.db.clone(),
            self.start_block,
            self.config,
            cancel_token.clone(),
        );
        let handle = tokio::spawn(task.run());

        *running = Some(RunningTask { cancel_token, handle });
        Ok(())
    }

    /// Cancels the ingestion task and waits for it to exit.
    ///
    /// Returns the error the task terminated with, if it failed before being stopped.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        let mut running = self.running.lock().await;
        let Some(task) = running.take() else {
            return Err(MonitorError::NotRunning(self.chain_id));
        };

        task.cancel_token.cancel();
        let result = task.handle.await.map_err(|err| {
            error!(
                target: "supervisor::chain_monitor",
                chain_id = self.chain_id,
                %err,
                "Ingestion task did not exit cleanly"
            );
            MonitorError::TaskPanicked(self.chain_id)
        })?;

        info!(target: "supervisor::chain_monitor", chain_id = self.chain_id, "Chain monitor stopped");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connector::ClientError,
        test_utils::{
            Chain, MockClient, build_chain, client_for, hash, shared_chain, wait_until,
        },
    };
    use alloy_eips::BlockNumberOrTag;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use supervisor_storage::{ChainDb, HeadRefStorageReader, LogStorageReader, SafetyHeadRefKey};
    use supervisor_types::BlockInfo;
    use tempfile::TempDir;

    fn open_db(dir: &TempDir) -> Arc<ChainDb> {
        Arc::new(ChainDb::new(10, dir.path()).unwrap().with_checkpoint_interval(4))
    }

    fn config() -> MonitorConfig {
        MonitorConfig::new(
            0,
            Duration::from_millis(5),
            Duration::from_millis(1),
            Duration::from_millis(10),
        )
    }

    fn latest_is(db: &ChainDb, block: BlockInfo) -> bool {
        db.get_latest_block().is_ok_and(|latest| latest == block)
    }

    #[tokio::test]
    async fn test_ingests_until_tip_and_tracks_heads() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let chain: Chain = shared_chain(build_chain(10, u64::MAX, 0));
        let tip = *chain.read().unwrap().last().unwrap();

        let monitor = ChainMonitor::new(10, client_for(10, chain.clone()), db.clone(), 0, config());
        monitor.start().await.unwrap();
        assert!(monitor.is_running().await);

        wait_until(|| latest_is(&db, tip)).await;
        wait_until(|| db.get_safety_head_ref(SafetyHeadRefKey::Finalized).is_ok()).await;
        monitor.stop().await.unwrap();

        let logs = db.get_logs(3).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].index, 0);
        assert_eq!(db.closest_block_info(u64::MAX).unwrap().number, 8);
        assert_eq!(db.get_safety_head_ref(SafetyHeadRefKey::Safe).unwrap().number, 7);
        assert_eq!(db.get_safety_head_ref(SafetyHeadRefKey::Finalized).unwrap().number, 5);
    }

    #[tokio::test]
    async fn test_start_twice_and_stop_twice() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let chain: Chain = shared_chain(build_chain(3, u64::MAX, 0));

        let monitor = ChainMonitor::new(10, client_for(10, chain), db, 0, config());
        assert!(matches!(monitor.stop().await, Err(MonitorError::NotRunning(10))));

        monitor.start().await.unwrap();
        assert!(matches!(monitor.start().await, Err(MonitorError::AlreadyStarted(10))));

        monitor.stop().await.unwrap();
        assert!(!monitor.is_running().await);
        assert!(matches!(monitor.stop().await, Err(MonitorError::NotRunning(10))));
    }

    #[tokio::test]
    async fn test_reorg_rewinds_to_common_ancestor() {
        supervisor_cli::init_test_tracing();
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let chain: Chain = shared_chain(build_chain(6, u64::MAX, 0));

        let monitor = ChainMonitor::new(10, client_for(10, chain.clone()), db.clone(), 0, config());
        monitor.start().await.unwrap();
        let old_tip = chain.read().unwrap()[5];
        wait_until(|| latest_is(&db, old_tip)).await;

        // blocks 3.. are replaced and the new branch is one block longer
        let fork = build_chain(7, 3, 1);
        let new_tip = fork[6];
        *chain.write().unwrap() = fork.clone();

        wait_until(|| latest_is(&db, new_tip)).await;
        monitor.stop().await.unwrap();

        for block in &fork {
            assert_eq!(db.get_block(block.number).unwrap(), *block);
        }
        assert_eq!(db.get_block(2).unwrap().hash, hash(2, 0));
    }

    #[tokio::test]
    async fn test_replaced_tip_without_successor_is_detected() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let chain: Chain = shared_chain(build_chain(5, u64::MAX, 0));

        let monitor = ChainMonitor::new(10, client_for(10, chain.clone()), db.clone(), 0, config());
        monitor.start().await.unwrap();
        let old_tip = chain.read().unwrap()[4];
        wait_until(|| latest_is(&db, old_tip)).await;

        let fork = build_chain(5, 4, 2);
        *chain.write().unwrap() = fork.clone();

        wait_until(|| latest_is(&db, fork[4])).await;
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_shorter_branch_is_detected() {
        supervisor_cli::init_test_tracing();
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let chain: Chain = shared_chain(build_chain(6, u64::MAX, 0));

        let monitor = ChainMonitor::new(10, client_for(10, chain.clone()), db.clone(), 0, config());
        monitor.start().await.unwrap();
        let old_tip = chain.read().unwrap()[5];
        wait_until(|| latest_is(&db, old_tip)).await;

        // blocks 2.. are replaced by a branch ending below the stored tip
        let fork = build_chain(4, 2, 4);
        *chain.write().unwrap() = fork.clone();

        wait_until(|| latest_is(&db, fork[3])).await;
        monitor.stop().await.unwrap();

        assert_eq!(db.get_block(1).unwrap().hash, hash(1, 0));
        assert_eq!(db.get_block(2).unwrap(), fork[2]);
        assert!(db.get_block(4).is_err());
    }

    #[tokio::test]
    async fn test_lagging_node_leaves_database_untouched() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let blocks = build_chain(6, u64::MAX, 0);
        let chain: Chain = shared_chain(blocks.clone());

        let monitor = ChainMonitor::new(10, client_for(10, chain.clone()), db.clone(), 0, config());
        monitor.start().await.unwrap();
        wait_until(|| latest_is(&db, blocks[5])).await;

        // same branch, the node just lost its last two blocks
        chain.write().unwrap().truncate(4);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(monitor.is_running().await);
        monitor.stop().await.unwrap();

        assert!(latest_is(&db, blocks[5]));
    }

    #[tokio::test]
    async fn test_chain_id_mismatch_terminates_monitor() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let chain: Chain = shared_chain(build_chain(3, u64::MAX, 0));

        let monitor = ChainMonitor::new(10, client_for(11, chain), db.clone(), 0, config());
        monitor.start().await.unwrap();

        let mut finished = false;
        for _ in 0..2_000 {
            if !monitor.is_running().await {
                finished = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(finished);

        let err = monitor.stop().await.unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Client(ClientError::ChainIdMismatch { expected: 10, got: 11 })
        ));
        assert!(db.get_latest_block().is_err());
    }

    #[tokio::test]
    async fn test_incompatible_history_terminates_monitor() {
        supervisor_cli::init_test_tracing();
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let chain: Chain = shared_chain(build_chain(3, u64::MAX, 0));

        let monitor = ChainMonitor::new(10, client_for(10, chain.clone()), db.clone(), 0, config());
        monitor.start().await.unwrap();
        let tip = chain.read().unwrap()[2];
        wait_until(|| latest_is(&db, tip)).await;

        *chain.write().unwrap() = build_chain(4, 0, 3);

        let mut finished = false;
        for _ in 0..2_000 {
            if !monitor.is_running().await {
                finished = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(finished);

        let err = monitor.stop().await.unwrap_err();
        assert!(matches!(err, MonitorError::IncompatibleHistory { chain_id: 10, anchor: 0 }));
        // nothing was rewound
        assert!(latest_is(&db, tip));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let blocks = build_chain(4, u64::MAX, 0);
        let tip = blocks[3];
        let failures = Arc::new(AtomicUsize::new(0));

        let mut client = MockClient::new();
        client.expect_chain_id().returning(|| Ok(10));
        let counter = failures.clone();
        client.expect_block_ref().returning(move |tag| {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                return Err(ClientError::Transport("connection reset".into()));
            }
            Ok(match tag {
                BlockNumberOrTag::Number(number) => blocks.get(number as usize).copied(),
                _ => None,
            })
        });
        client.expect_fetch_logs().returning(|_| Ok(vec![]));

        let monitor = ChainMonitor::new(10, client, db.clone(), 0, config());
        monitor.start().await.unwrap();

        wait_until(|| latest_is(&db, tip)).await;
        monitor.stop().await.unwrap();
        assert!(failures.load(Ordering::SeqCst) > 3);
    }

    #[tokio::test]
    async fn test_anchor_is_configured_start_block() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let chain: Chain = shared_chain(build_chain(8, u64::MAX, 0));
        let tip = chain.read().unwrap()[7];

        let monitor = ChainMonitor::new(10, client_for(10, chain), db.clone(), 5, config());
        assert_eq!(monitor.start_block(), 5);
        monitor.start().await.unwrap();
        wait_until(|| latest_is(&db, tip)).await;
        monitor.stop().await.unwrap();

        assert!(db.get_block(4).is_err());
        assert_eq!(db.closest_block_info(6).unwrap().number, 5);
    }

    #[tokio::test]
    async fn test_start_fails_on_closed_database() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        db.close().unwrap();

        let chain: Chain = shared_chain(build_chain(2, u64::MAX, 0));
        let monitor = ChainMonitor::new(10, client_for(10, chain), db, 0, config());

        let err = monitor.start().await.unwrap_err();
        assert!(matches!(err, MonitorError::Storage(StorageError::Closed)));
        assert!(!monitor.is_running().await);
    }
}
