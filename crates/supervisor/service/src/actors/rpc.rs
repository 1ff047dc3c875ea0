use std::{io, net::SocketAddr};

use async_trait::async_trait;
use derive_more::Constructor;
use jsonrpsee::{RpcModule, server::ServerBuilder};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::SupervisorActor;

/// Serves an [`RpcModule`] until cancelled.
#[derive(Debug, Constructor)]
pub struct SupervisorRpcActor<D> {
    rpc_addr: SocketAddr,
    rpc_module: RpcModule<D>,
    cancel_token: CancellationToken,
}

#[async_trait]
impl<D> SupervisorActor for SupervisorRpcActor<D>
where
    D: Send + Sync + 'static,
{
    type Error = SupervisorRpcActorError;

    async fn start(mut self) -> Result<(), Self::Error> {
        let server = ServerBuilder::default().build(self.rpc_addr).await?;
        let local_addr = server.local_addr()?;
        let handle = server.start(self.rpc_module);
        info!(target: "supervisor::rpc_actor", addr = %local_addr, "RPC server listening");

        let stopped = handle.clone().stopped();
        let cancelled = self.cancel_token.cancelled();

        tokio::select! {
            _ = stopped => {
                error!(target: "supervisor::rpc_actor", "RPC server stopped unexpectedly");
                return Err(SupervisorRpcActorError::ServerStopped);
            }
            _ = cancelled => {
                info!(target: "supervisor::rpc_actor", "Cancellation requested, stopping RPC server");
                if let Err(err) = handle.stop() {
                    error!(target: "supervisor::rpc_actor", %err, "Failed to stop RPC server gracefully");
                    return Err(SupervisorRpcActorError::StopFailed);
                }
                handle.stopped().await;
                info!(target: "supervisor::rpc_actor", "RPC server stopped gracefully");
            }
        }

        Ok(())
    }
}

/// Errors of the [`SupervisorRpcActor`].
#[derive(Debug, Error)]
pub enum SupervisorRpcActorError {
    /// Failed to bind the RPC server.
    #[error(transparent)]
    BuildFailed(#[from] io::Error),

    /// The RPC server stopped without being asked to.
    #[error("rpc server stopped unexpectedly")]
    ServerStopped,

    /// The RPC server failed to stop gracefully.
    #[error("failed to stop the RPC server")]
    StopFailed,
}
