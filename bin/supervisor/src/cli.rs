//! Contains the supervisor CLI.

use crate::flags::SupervisorArgs;
use anyhow::Result;
use clap::Parser;
use supervisor_cli::{LogArgs, LogConfig};
use supervisor_service::Service;
use tracing::{error, info};

/// CLI of the interop supervisor.
#[derive(Parser, Debug)]
#[command(name = "op-supervisor", version, about = "Interop supervisor tracking cross-chain message safety")]
pub struct Cli {
    /// Global args
    #[command(flatten)]
    pub global: LogArgs,

    /// Supervisor args
    #[command(flatten)]
    pub supervisor: SupervisorArgs,
}

impl Cli {
    /// Runs the CLI.
    pub fn run(self) -> Result<()> {
        self.init_logs(&self.global)?;

        Self::run_until_ctrl_c(async move {
            let config = self.supervisor.init_config()?;
            let mut service = Service::new(config);

            tokio::select! {
                res = service.run() => {
                    if let Err(err) = res {
                        error!(target: "supervisor", %err, "Error running supervisor service");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!(target: "supervisor", "Ctrl+C received, initiating service shutdown...");
                }
            }

            service.shutdown().await?;
            info!(target: "supervisor", "Supervisor service shut down gracefully.");
            Ok(())
        })
    }

    /// Run until ctrl-c is pressed.
    pub fn run_until_ctrl_c<F>(fut: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        let rt = Self::tokio_runtime().map_err(|e| anyhow::anyhow!(e))?;
        rt.block_on(fut)
    }

    /// Creates a new default tokio multi-thread [`Runtime`](tokio::runtime::Runtime) with all
    /// features enabled
    pub fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }

    /// Initializes the tracing subscriber.
    pub fn init_logs(&self, args: &LogArgs) -> Result<()> {
        let filter = tracing_subscriber::EnvFilter::from_default_env();

        LogConfig::new(args.clone()).init_tracing_subscriber(Some(filter))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_log_and_supervisor_args() {
        let cli = Cli::parse_from([
            "op-supervisor",
            "-vvvv",
            "--datadir",
            "/data",
            "--l2-rpcs",
            "http://chain-a,http://chain-b",
        ]);

        assert_eq!(cli.global.level, 4);
        assert_eq!(cli.supervisor.l2_rpcs.len(), 2);
    }

    #[test]
    fn test_tokio_runtime_builds() {
        let rt = Cli::tokio_runtime().unwrap();
        assert_eq!(rt.block_on(async { 1 + 1 }), 2);
    }
}
