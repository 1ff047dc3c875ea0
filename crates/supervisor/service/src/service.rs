//! Contains the main Supervisor service runner.

use anyhow::{Context, Result};
use std::sync::Arc;
use supervisor_core::{
    RpcChainClient, RpcConnector, SupervisorBackend, SupervisorError, config::Config,
    rpc::SupervisorRpc,
};
use supervisor_rpc::SupervisorApiServer;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::actors::{SupervisorActor, SupervisorRpcActor};

/// The main service structure of the supervisor. Builds the backend, starts its chain
/// monitors and serves the query API.
#[derive(Debug)]
pub struct Service {
    config: Arc<Config>,
    backend: Option<Arc<SupervisorBackend<RpcChainClient>>>,

    cancel_token: CancellationToken,
    join_set: JoinSet<Result<(), anyhow::Error>>,
}

impl Service {
    /// Creates a new Supervisor service instance.
    pub fn new(cfg: Config) -> Self {
        Self {
            config: Arc::new(cfg),
            backend: None,
            cancel_token: CancellationToken::new(),
            join_set: JoinSet::new(),
        }
    }

    /// Initialises the Supervisor service.
    pub async fn initialise(&mut self) -> Result<()> {
        self.init_backend().await?;
        self.init_rpc_server()?;
        Ok(())
    }

    async fn init_backend(&mut self) -> Result<()> {
        info!(
            target: "supervisor::service",
            chains = self.config.l2_rpcs.len(),
            datadir = %self.config.datadir.display(),
            "Initialising supervisor backend"
        );

        let backend = SupervisorBackend::new(&self.config, &RpcConnector)
            .await
            .context("failed to construct supervisor backend")?;
        let backend = Arc::new(backend);
        // keep the backend even if start fails, shutdown still has to release it
        self.backend = Some(backend.clone());

        backend.start().await.context("failed to start chain monitors")?;
        Ok(())
    }

    fn init_rpc_server(&mut self) -> Result<()> {
        let backend = self.backend.clone().context("backend is not initialised")?;
        let rpc_module = SupervisorRpc::new(backend).into_rpc();

        let rpc_addr = self.config.rpc_addr;
        let cancel_token = self.cancel_token.clone();
        self.join_set.spawn(async move {
            if let Err(err) =
                SupervisorRpcActor::new(rpc_addr, rpc_module, cancel_token).start().await
            {
                Err(anyhow::anyhow!(err))
            } else {
                Ok(())
            }
        });
        Ok(())
    }

    /// Initialises the service and waits for its tasks. Returns once a task fails or all
    /// tasks completed.
    pub async fn run(&mut self) -> Result<()> {
        self.initialise().await?;

        while let Some(res) = self.join_set.join_next().await {
            match res {
                Ok(Ok(_)) => {
                    info!(target: "supervisor::service", "Task completed successfully.");
                }
                Ok(Err(err)) => {
                    error!(target: "supervisor::service", %err, "A task encountered an error.");
                    self.cancel_token.cancel();
                    return Err(anyhow::anyhow!("A service task failed: {}", err));
                }
                Err(err) => {
                    error!(target: "supervisor::service", %err, "A task encountered an error.");
                    self.cancel_token.cancel();
                    return Err(anyhow::anyhow!("A service task failed: {}", err));
                }
            }
        }
        Ok(())
    }

    /// Cancels all tasks, stops the backend and releases its databases.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel_token.cancel();

        while let Some(res) = self.join_set.join_next().await {
            match res {
                Ok(Ok(_)) => {
                    info!(target: "supervisor::service", "Task completed successfully during shutdown.");
                }
                Ok(Err(err)) => {
                    error!(target: "supervisor::service", %err, "A task encountered an error during shutdown.");
                }
                Err(err) => {
                    error!(target: "supervisor::service", %err, "A task encountered an error during shutdown.");
                }
            }
        }

        let Some(backend) = self.backend.take() else {
            return Ok(());
        };

        let stopped = match backend.stop().await {
            Ok(()) | Err(SupervisorError::AlreadyStopped) => Ok(()),
            Err(err) => {
                warn!(target: "supervisor::service", %err, "Supervisor backend stopped with errors");
                Err(err)
            }
        };
        let closed = backend.close().await;

        info!(target: "supervisor::service", "Supervisor service shut down");
        teardown_result(stopped, closed)
    }
}

/// Merges the outcomes of stopping and closing the backend without dropping either failure.
fn teardown_result(
    stopped: Result<(), SupervisorError>,
    closed: Result<(), SupervisorError>,
) -> anyhow::Result<()> {
    match (stopped, closed) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(stop), Ok(())) => Err(stop).context("failed to stop supervisor backend"),
        (Ok(()), Err(close)) => Err(close).context("failed to close supervisor backend"),
        (Err(stop), Err(close)) => Err(stop).with_context(|| {
            format!("failed to stop supervisor backend; closing it also failed: {close}")
        }),
    }
}
