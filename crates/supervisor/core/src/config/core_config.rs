use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use derive_more::Constructor;
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use supervisor_storage::DEFAULT_CHECKPOINT_INTERVAL;

/// Configuration for the Supervisor service.
#[derive(Debug, Clone, Constructor)]
pub struct Config {
    /// Directory where the per-chain databases are stored.
    pub datadir: PathBuf,

    /// RPC endpoints of the followed chains. One chain is instantiated per endpoint, in order.
    pub l2_rpcs: Vec<String>,

    /// The socket address for the RPC server to listen on.
    pub rpc_addr: SocketAddr,

    /// Ingestion settings shared by every chain monitor.
    pub monitor: MonitorConfig,

    /// Log database settings.
    pub storage: StorageConfig,
}

impl Config {
    /// Returns the database directory of `chain_id`.
    pub fn chain_dir(&self, chain_id: u64) -> PathBuf {
        self.datadir.join(chain_id.to_string())
    }
}

/// Settings of the chain monitor ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor)]
pub struct MonitorConfig {
    /// Block that becomes the anchor when a chain's database is empty.
    pub start_block: u64,

    /// Pause between polls once the monitor has caught up with the chain head.
    pub poll_interval: Duration,

    /// First delay before retrying a failed request.
    pub min_retry_delay: Duration,

    /// Upper bound of the retry delay.
    pub max_retry_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            start_block: 0,
            poll_interval: Duration::from_secs(2),
            min_retry_delay: Duration::from_millis(250),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

impl MonitorConfig {
    /// Returns a fresh, unbounded retry schedule.
    pub fn retry_backoff(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(self.min_retry_delay)
            .with_max_delay(self.max_retry_delay)
            .without_max_times()
            .build()
    }
}

/// Settings of the per-chain log databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor)]
pub struct StorageConfig {
    /// Blocks between two periodic checkpoints.
    pub checkpoint_interval: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_backoff_grows_and_is_capped() {
        let config = MonitorConfig::new(
            0,
            Duration::from_millis(10),
            Duration::from_millis(100),
            Duration::from_millis(400),
        );

        let delays: Vec<_> = config.retry_backoff().take(6).collect();

        assert_eq!(delays.len(), 6);
        assert_eq!(delays[0], Duration::from_millis(100));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(delays[5], Duration::from_millis(400));
    }

    #[test]
    fn test_chain_dir() {
        let config = Config::new(
            PathBuf::from("/data"),
            vec![],
            "127.0.0.1:8545".parse().unwrap(),
            MonitorConfig::default(),
            StorageConfig::default(),
        );
        assert_eq!(config.chain_dir(10), PathBuf::from("/data/10"));
    }
}
