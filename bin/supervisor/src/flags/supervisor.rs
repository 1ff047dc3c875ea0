use anyhow::{Result, ensure};
use clap::Args;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};
use supervisor_core::config::{Config, MonitorConfig, StorageConfig};

/// Supervisor configuration arguments.
#[derive(Args, Debug)]
pub struct SupervisorArgs {
    /// Directory to store supervisor data. Each chain gets a subdirectory named by its chain id.
    #[arg(long, env = "DATADIR")]
    pub datadir: PathBuf,

    /// RPC endpoints of the L2 chains to follow, in order.
    #[arg(long = "l2-rpcs", env = "L2_RPCS", value_delimiter = ',', required = true)]
    pub l2_rpcs: Vec<String>,

    /// IP address for the Supervisor RPC server to listen on.
    #[arg(long = "rpc.addr", env = "RPC_ADDR", default_value = "0.0.0.0")]
    pub rpc_address: IpAddr,

    /// Port for the Supervisor RPC server to listen on.
    #[arg(long = "rpc.port", env = "RPC_PORT", default_value_t = 8545)]
    pub rpc_port: u16,

    /// Blocks between two checkpoints of a chain's log database.
    #[arg(long = "checkpoint-interval", env = "CHECKPOINT_INTERVAL", default_value_t = 16)]
    pub checkpoint_interval: u64,

    /// Milliseconds to wait before polling a chain that has no new block.
    #[arg(long = "poll-interval", env = "POLL_INTERVAL", default_value_t = 2_000)]
    pub poll_interval_ms: u64,

    /// Block ingested first when a chain's database is empty.
    #[arg(long = "start-block", env = "START_BLOCK", default_value_t = 0)]
    pub start_block: u64,
}

impl SupervisorArgs {
    /// Builds the service [`Config`] from the parsed arguments.
    pub fn init_config(&self) -> Result<Config> {
        ensure!(self.checkpoint_interval > 0, "checkpoint interval must be positive");
        ensure!(self.poll_interval_ms > 0, "poll interval must be positive");

        let monitor = MonitorConfig {
            start_block: self.start_block,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            ..MonitorConfig::default()
        };

        Ok(Config::new(
            self.datadir.clone(),
            self.l2_rpcs.clone(),
            SocketAddr::new(self.rpc_address, self.rpc_port),
            monitor,
            StorageConfig::new(self.checkpoint_interval),
        ))
    }
}
