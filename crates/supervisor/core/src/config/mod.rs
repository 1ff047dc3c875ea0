//! Configuration management for the supervisor.

mod core_config;
pub use core_config::{Config, MonitorConfig, StorageConfig};
