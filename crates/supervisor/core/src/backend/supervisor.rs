use super::{
    SafetyQuery,
    query::{classify_block, classify_message},
};
use crate::{
    config::Config,
    connector::{ChainClient, ChainConnector},
    error::{ShutdownError, ShutdownStepError, SupervisorError},
    monitor::{ChainMonitor, MonitorError},
};
use alloy_primitives::{B256, ChainId};
use std::{collections::BTreeMap, sync::Arc};
use supervisor_storage::{ChainDb, LogStorageReader, StorageError, StorageRewinder};
use supervisor_types::{Identifier, SafetyLevel};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Lifecycle state of a [`SupervisorBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendState {
    /// Monitors are not running.
    #[default]
    Stopped,
    /// Monitors were started.
    Running,
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: BackendState,
    /// Set once the databases were closed by `stop` or `close`.
    released: bool,
}

/// A chain monitor together with the database it writes.
#[derive(Debug)]
struct ChainBundle<C> {
    monitor: ChainMonitor<C, ChainDb>,
    db: Arc<ChainDb>,
}

/// Owns one [`ChainMonitor`] and one [`ChainDb`] per followed chain.
#[derive(Debug)]
pub struct SupervisorBackend<C> {
    chains: BTreeMap<ChainId, ChainBundle<C>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<C> SupervisorBackend<C>
where
    C: ChainClient + 'static,
{
    /// Connects to every configured endpoint, in order, and prepares its database.
    ///
    /// Each database is rewound to the block before its latest checkpoint, and the chain's
    /// monitor resumes from there. Any failure aborts construction and closes the databases
    /// opened so far.
    pub async fn new<N>(config: &Config, connector: &N) -> Result<Self, SupervisorError>
    where
        N: ChainConnector<Client = C>,
    {
        if config.l2_rpcs.is_empty() {
            return Err(SupervisorError::NoChains);
        }

        let mut chains = BTreeMap::new();
        for endpoint in &config.l2_rpcs {
            match Self::open_chain(config, connector, endpoint, &chains).await {
                Ok((chain_id, bundle)) => {
                    chains.insert(chain_id, bundle);
                }
                Err(err) => {
                    error!(
                        target: "supervisor::backend",
                        endpoint,
                        %err,
                        "Failed to set up chain, aborting construction"
                    );
                    for (chain_id, chain) in &chains {
                        if let Err(err) = chain.db.close() {
                            warn!(target: "supervisor::backend", chain_id, %err, "Failed to close database");
                        }
                    }
                    return Err(err);
                }
            }
        }

        info!(target: "supervisor::backend", chains = chains.len(), "Supervisor backend constructed");
        Ok(Self { chains, lifecycle: Mutex::new(Lifecycle::default()) })
    }

    async fn open_chain<N>(
        config: &Config,
        connector: &N,
        endpoint: &str,
        opened: &BTreeMap<ChainId, ChainBundle<C>>,
    ) -> Result<(ChainId, ChainBundle<C>), SupervisorError>
    where
        N: ChainConnector<Client = C>,
    {
        let (client, chain_id) = connector.connect(endpoint).await.map_err(|source| {
            SupervisorError::Connect { endpoint: endpoint.to_string(), source }
        })?;
        if opened.contains_key(&chain_id) {
            return Err(SupervisorError::DuplicateChain(chain_id));
        }

        let path = config.chain_dir(chain_id);
        std::fs::create_dir_all(&path)
            .map_err(|source| SupervisorError::DataDir { path: path.clone(), source })?;

        let db = ChainDb::new(chain_id, &path)
            .map_err(|source| SupervisorError::Storage { chain_id, source })?
            .with_checkpoint_interval(config.storage.checkpoint_interval);
        let db = Arc::new(db);

        let start_block = match resume_block(&db, config.monitor.start_block) {
            Ok(block) => block,
            Err(source) => {
                if let Err(err) = db.close() {
                    warn!(target: "supervisor::backend", chain_id, %err, "Failed to close database");
                }
                return Err(SupervisorError::Storage { chain_id, source });
            }
        };

        info!(target: "supervisor::backend", chain_id, endpoint, start_block, "Chain prepared");
        let monitor = ChainMonitor::new(chain_id, client, db.clone(), start_block, config.monitor);
        Ok((chain_id, ChainBundle { monitor, db }))
    }

    /// Returns the ids of all followed chains in ascending order.
    pub fn chain_ids(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.chains.keys().copied()
    }

    /// Returns the log database of `chain_id`.
    pub fn database(&self, chain_id: ChainId) -> Option<&Arc<ChainDb>> {
        self.chains.get(&chain_id).map(|chain| &chain.db)
    }

    /// Returns the current lifecycle state.
    pub async fn state(&self) -> BackendState {
        self.lifecycle.lock().await.state
    }

    /// Starts every chain monitor.
    ///
    /// The first monitor that fails to start aborts the call. Monitors started before it keep
    /// running and the backend stays [`BackendState::Running`], so [`Self::stop`] tears them
    /// down.
    pub async fn start(&self) -> Result<(), SupervisorError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state == BackendState::Running {
            return Err(SupervisorError::AlreadyStarted);
        }
        if lifecycle.released {
            return Err(SupervisorError::Closed);
        }
        lifecycle.state = BackendState::Running;

        for (&chain_id, chain) in &self.chains {
            chain.monitor.start().await.map_err(|source| {
                error!(target: "supervisor::backend", chain_id, %source, "Failed to start chain monitor");
                SupervisorError::Monitor { chain_id, source }
            })?;
        }

        info!(target: "supervisor::backend", "Supervisor backend started");
        Ok(())
    }

    /// Stops every monitor, then closes every database.
    ///
    /// All steps are attempted; failures are returned together as
    /// [`SupervisorError::Shutdown`].
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != BackendState::Running {
            return Err(SupervisorError::AlreadyStopped);
        }

        let errors = self.release(&mut lifecycle).await;
        info!(target: "supervisor::backend", failures = errors.len(), "Supervisor backend stopped");
        into_result(errors)
    }

    /// Releases every resource not released yet. Safe without a prior [`Self::stop`] and safe
    /// to call repeatedly.
    pub async fn close(&self) -> Result<(), SupervisorError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.released && lifecycle.state == BackendState::Stopped {
            debug!(target: "supervisor::backend", "Supervisor backend already closed");
            return Ok(());
        }

        let errors = self.release(&mut lifecycle).await;
        info!(target: "supervisor::backend", failures = errors.len(), "Supervisor backend closed");
        into_result(errors)
    }

    async fn release(&self, lifecycle: &mut Lifecycle) -> Vec<ShutdownStepError> {
        let mut errors = Vec::new();

        if lifecycle.state == BackendState::Running {
            for (&chain_id, chain) in &self.chains {
                match chain.monitor.stop().await {
                    // never started, when an earlier monitor failed to start
                    Ok(()) | Err(MonitorError::NotRunning(_)) => {}
                    Err(source) => {
                        warn!(target: "supervisor::backend", chain_id, %source, "Chain monitor stopped with error");
                        errors.push(ShutdownStepError::Monitor { chain_id, source });
                    }
                }
            }
            lifecycle.state = BackendState::Stopped;
        }

        for (&chain_id, chain) in &self.chains {
            if let Err(source) = chain.db.close() {
                warn!(target: "supervisor::backend", chain_id, %source, "Failed to close database");
                errors.push(ShutdownStepError::Storage { chain_id, source });
            }
        }
        lifecycle.released = true;

        errors
    }
}

fn into_result(errors: Vec<ShutdownStepError>) -> Result<(), SupervisorError> {
    if errors.is_empty() { Ok(()) } else { Err(ShutdownError(errors).into()) }
}

/// Rewinds `db` to the block before its latest checkpoint and returns that block.
///
/// The anchor is never rewound past. An empty database resumes at `default`.
fn resume_block(db: &ChainDb, default: u64) -> Result<u64, StorageError> {
    let checkpoint = match db.closest_block_info(u64::MAX) {
        Ok(checkpoint) => checkpoint,
        Err(err) if err.is_not_found() => return Ok(default),
        Err(err) => return Err(err),
    };

    let target = match checkpoint.number.checked_sub(1).map(|number| db.get_block(number)) {
        Some(Ok(block)) => block.number,
        // the checkpoint is the anchor
        None | Some(Err(StorageError::EntryNotFound(_))) => checkpoint.number,
        Some(Err(err)) => return Err(err),
    };

    db.rewind(target)?;
    debug!(
        target: "supervisor::backend",
        chain_id = db.chain_id(),
        checkpoint = checkpoint.number,
        target,
        "Rewound to resumption block"
    );
    Ok(target)
}

impl<C> SafetyQuery for SupervisorBackend<C>
where
    C: ChainClient + 'static,
{
    fn check_message(&self, identifier: &Identifier, payload_hash: B256) -> SafetyLevel {
        let Some(chain) = self.chains.get(&identifier.chain_id) else {
            debug!(target: "supervisor::backend", %identifier, "Message from unknown chain");
            return SafetyLevel::MOST_CONSERVATIVE;
        };
        classify_message(chain.db.as_ref(), identifier, payload_hash)
    }

    fn check_block(&self, chain_id: ChainId, block_hash: B256, block_number: u64) -> SafetyLevel {
        let Some(chain) = self.chains.get(&chain_id) else {
            debug!(target: "supervisor::backend", chain_id, block_number, "Block from unknown chain");
            return SafetyLevel::MOST_CONSERVATIVE;
        };
        classify_block(chain.db.as_ref(), chain_id, block_hash, block_number)
    }
}
